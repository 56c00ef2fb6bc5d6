// Resource wrappers - images and buffers with dedicated memory
//
// Each wrapper owns one native object plus the single allocation bound to
// it at offset 0. Both handles are released together, memory first.

use anyhow::{Context, Result};
use ash::vk;
use std::ffi::c_void;

/// Find a memory type index allowed by `type_bits` that has all `required` flags
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..memory_properties.memory_type_count).find(|&i| {
        let has_type = (type_bits & (1 << i)) != 0;
        let has_properties = memory_properties.memory_types[i as usize]
            .property_flags
            .contains(required);
        has_type && has_properties
    })
}

/// Like [`find_memory_type`], but settles for any allowed type when none has the preferred flags
pub fn select_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    preferred: vk::MemoryPropertyFlags,
) -> Option<u32> {
    find_memory_type(memory_properties, type_bits, preferred)
        .or_else(|| find_memory_type(memory_properties, type_bits, vk::MemoryPropertyFlags::empty()))
}

fn allocate_memory(
    device: &ash::Device,
    requirements: &vk::MemoryRequirements,
    memory_type_index: u32,
) -> Result<vk::DeviceMemory> {
    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    unsafe { device.allocate_memory(&alloc_info, None) }.context("Failed to allocate device memory")
}

/// Image plus its dedicated memory
pub struct ImageResource {
    device: ash::Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl ImageResource {
    /// Create the image, allocate memory for it and bind at offset 0.
    ///
    /// On any failure everything created so far is released again.
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        create_info: &vk::ImageCreateInfo,
        memory_flags: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let image = unsafe { device.create_image(create_info, None) }
            .context("Failed to create image")?;

        // Drop cleans up from here on
        let mut resource = Self {
            device: device.clone(),
            image,
            memory: vk::DeviceMemory::null(),
            size: 0,
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let type_index =
            select_memory_type(memory_properties, requirements.memory_type_bits, memory_flags)
                .context("No memory type can back this image")?;

        resource.memory = allocate_memory(device, &requirements, type_index)?;
        resource.size = requirements.size;

        unsafe { device.bind_image_memory(image, resource.memory, 0) }
            .context("Failed to bind image memory")?;

        Ok(resource)
    }

    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    /// Size of the backing allocation in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Map `size` bytes starting at `offset`. The memory must be host visible.
    pub fn map(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Result<*mut c_void> {
        map_memory(&self.device, self.memory, offset, size)
    }

    pub fn unmap(&self) {
        unsafe { self.device.unmap_memory(self.memory) };
    }

    /// Whether both handles have been released
    pub fn is_released(&self) -> bool {
        self.image == vk::Image::null() && self.memory == vk::DeviceMemory::null()
    }

    /// Free memory, then destroy the image. Safe to call more than once.
    pub fn destroy(&mut self) {
        unsafe {
            if self.memory != vk::DeviceMemory::null() {
                self.device.free_memory(self.memory, None);
                self.memory = vk::DeviceMemory::null();
            }
            if self.image != vk::Image::null() {
                self.device.destroy_image(self.image, None);
                self.image = vk::Image::null();
            }
        }
        self.size = 0;
    }
}

impl Drop for ImageResource {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Buffer plus its dedicated memory
pub struct BufferResource {
    device: ash::Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl BufferResource {
    /// Create the buffer, allocate memory with `memory_flags` and bind at offset 0
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        create_info: &vk::BufferCreateInfo,
        memory_flags: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let buffer = unsafe { device.create_buffer(create_info, None) }
            .context("Failed to create buffer")?;

        let mut resource = Self {
            device: device.clone(),
            buffer,
            memory: vk::DeviceMemory::null(),
            size: 0,
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let type_index =
            find_memory_type(memory_properties, requirements.memory_type_bits, memory_flags)
                .with_context(|| format!("No memory type with {:?} can back this buffer", memory_flags))?;

        resource.memory = allocate_memory(device, &requirements, type_index)?;
        resource.size = requirements.size;

        unsafe { device.bind_buffer_memory(buffer, resource.memory, 0) }
            .context("Failed to bind buffer memory")?;

        Ok(resource)
    }

    /// Host-visible, host-coherent buffer of `size` bytes
    pub fn host_visible(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        Self::new(
            device,
            memory_properties,
            &create_info,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Map `size` bytes starting at `offset`. The memory must be host visible.
    pub fn map(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Result<*mut c_void> {
        map_memory(&self.device, self.memory, offset, size)
    }

    pub fn unmap(&self) {
        unsafe { self.device.unmap_memory(self.memory) };
    }

    /// Copy `data` to the start of the buffer through a temporary mapping
    pub fn upload<T: bytemuck::Pod>(&self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let len = bytes.len() as vk::DeviceSize;
        if len > self.size {
            anyhow::bail!("Upload of {} bytes does not fit a {} byte buffer", len, self.size);
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let ptr = self.map(0, len)?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
        }
        self.unmap();
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.buffer == vk::Buffer::null() && self.memory == vk::DeviceMemory::null()
    }

    /// Free memory, then destroy the buffer. Safe to call more than once.
    pub fn destroy(&mut self) {
        unsafe {
            if self.memory != vk::DeviceMemory::null() {
                self.device.free_memory(self.memory, None);
                self.memory = vk::DeviceMemory::null();
            }
            if self.buffer != vk::Buffer::null() {
                self.device.destroy_buffer(self.buffer, None);
                self.buffer = vk::Buffer::null();
            }
        }
        self.size = 0;
    }
}

impl Drop for BufferResource {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn map_memory(
    device: &ash::Device,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
) -> Result<*mut c_void> {
    if memory == vk::DeviceMemory::null() {
        anyhow::bail!("Cannot map a released resource");
    }
    unsafe { device.map_memory(memory, offset, size, vk::MemoryMapFlags::empty()) }
        .context("Failed to map memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in props.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        props
    }

    #[test]
    fn first_allowed_type_with_flags_is_chosen() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&props, 0b111, host), Some(1));
        // Type 1 excluded by the mask
        assert_eq!(find_memory_type(&props, 0b101, host), Some(2));
    }

    #[test]
    fn empty_requirement_takes_lowest_allowed_bit() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        assert_eq!(find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::empty()), Some(1));
    }

    #[test]
    fn no_match_yields_none() {
        let props = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert_eq!(
            find_memory_type(&props, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
        // Bits beyond the reported type count are ignored
        assert_eq!(
            find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::empty()),
            None
        );
    }

    #[test]
    fn preferred_flags_fall_back_to_any_allowed_type() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        assert_eq!(
            select_memory_type(&props, 0b11, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(0)
        );
        assert_eq!(
            select_memory_type(&props, 0b11, vk::MemoryPropertyFlags::HOST_COHERENT),
            Some(1)
        );
    }
}
