// Render Buffer - image + view usable as a color or depth/stencil attachment
//
// Construction records the transition into the attachment layout on the
// supplied command buffer; the image is usable once that buffer executes.

use anyhow::{Context, Result};
use ash::vk;

use super::barrier::ImageTransition;
use super::device::DeviceManager;
use super::resource::ImageResource;

/// Creation parameters for a [`RenderBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBufferDesc {
    pub dimension: vk::ImageType,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub usage: vk::ImageUsageFlags,
}

impl RenderBufferDesc {
    /// Single-sampled 2D depth/stencil target
    pub fn depth_stencil(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            dimension: vk::ImageType::TYPE_2D,
            width,
            height,
            depth: 1,
            array_size: 1,
            mip_levels: 1,
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        }
    }

    /// Single-sampled 2D color target
    pub fn color(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            ..Self::depth_stencil(width, height, format)
        }
    }
}

/// What an attachment usage implies for aspect, layout and required format feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentTarget {
    pub aspect: vk::ImageAspectFlags,
    pub layout: vk::ImageLayout,
    pub feature: vk::FormatFeatureFlags,
}

pub fn has_stencil(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::S8_UINT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT
    )
}

pub fn has_depth(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D16_UNORM
            | vk::Format::X8_D24_UNORM_PACK32
            | vk::Format::D32_SFLOAT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT
    )
}

/// Derive the attachment target from the usage bits. Color wins if both are set.
pub fn attachment_target(
    usage: vk::ImageUsageFlags,
    format: vk::Format,
) -> Option<AttachmentTarget> {
    if usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT) {
        return Some(AttachmentTarget {
            aspect: vk::ImageAspectFlags::COLOR,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            feature: vk::FormatFeatureFlags::COLOR_ATTACHMENT,
        });
    }

    if usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT) {
        // A view may only name aspects the format actually has
        let mut aspect = vk::ImageAspectFlags::empty();
        if has_depth(format) {
            aspect |= vk::ImageAspectFlags::DEPTH;
        }
        if has_stencil(format) {
            aspect |= vk::ImageAspectFlags::STENCIL;
        }
        if aspect.is_empty() {
            return None;
        }
        return Some(AttachmentTarget {
            aspect,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            feature: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        });
    }

    None
}

/// Linear tiling when the format supports the attachment feature that way, optimal otherwise
pub fn select_tiling(
    properties: &vk::FormatProperties,
    feature: vk::FormatFeatureFlags,
) -> vk::ImageTiling {
    if properties.linear_tiling_features.contains(feature) {
        vk::ImageTiling::LINEAR
    } else {
        vk::ImageTiling::OPTIMAL
    }
}

/// View type matching the image dimension, arrayed when more than one layer
pub fn view_type_for(dimension: vk::ImageType, array_size: u32) -> vk::ImageViewType {
    let arrayed = array_size > 1;
    match dimension {
        vk::ImageType::TYPE_1D if arrayed => vk::ImageViewType::TYPE_1D_ARRAY,
        vk::ImageType::TYPE_1D => vk::ImageViewType::TYPE_1D,
        vk::ImageType::TYPE_3D => vk::ImageViewType::TYPE_3D,
        _ if arrayed => vk::ImageViewType::TYPE_2D_ARRAY,
        _ => vk::ImageViewType::TYPE_2D,
    }
}

pub struct RenderBuffer {
    device: ash::Device,
    resource: ImageResource,
    view: vk::ImageView,
    range: vk::ImageSubresourceRange,
    format: vk::Format,
    extent: vk::Extent3D,
    layout: vk::ImageLayout,
}

impl RenderBuffer {
    /// Create the image and view, and record the layout transition on `command_buffer`
    pub fn new(
        device_manager: &DeviceManager,
        command_buffer: vk::CommandBuffer,
        desc: &RenderBufferDesc,
    ) -> Result<Self> {
        if command_buffer == vk::CommandBuffer::null() {
            anyhow::bail!("Invalid argument: render buffer needs a recording command buffer");
        }

        let target = attachment_target(desc.usage, desc.format).with_context(|| {
            format!(
                "Invalid argument: usage {:?} with format {:?} is not an attachment",
                desc.usage, desc.format
            )
        })?;

        let format_properties = unsafe {
            device_manager
                .instance()
                .get_physical_device_format_properties(device_manager.physical_device(), desc.format)
        };
        let tiling = select_tiling(&format_properties, target.feature);
        if tiling == vk::ImageTiling::OPTIMAL
            && !format_properties.optimal_tiling_features.contains(target.feature)
        {
            anyhow::bail!("Format {:?} cannot be used as {:?}", desc.format, target.feature);
        }

        let extent = vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: desc.depth.max(1),
        };

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(desc.dimension)
            .format(desc.format)
            .extent(extent)
            .mip_levels(desc.mip_levels.max(1))
            .array_layers(desc.array_size.max(1))
            .samples(desc.samples)
            .tiling(tiling)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let device = device_manager.device();
        let resource = ImageResource::new(
            device,
            device_manager.memory_properties(),
            &image_info,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let range = vk::ImageSubresourceRange {
            aspect_mask: target.aspect,
            base_mip_level: 0,
            level_count: desc.mip_levels.max(1),
            base_array_layer: 0,
            layer_count: desc.array_size.max(1),
        };

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(resource.image())
            .view_type(view_type_for(desc.dimension, desc.array_size))
            .format(desc.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::R,
                g: vk::ComponentSwizzle::G,
                b: vk::ComponentSwizzle::B,
                a: vk::ComponentSwizzle::A,
            })
            .subresource_range(range);

        // `resource` drops (and releases the image) if this fails
        let view = unsafe { device.create_image_view(&view_info, None) }
            .context("Failed to create render buffer view")?;

        ImageTransition::from_undefined(target.layout).record(
            device,
            command_buffer,
            resource.image(),
            range,
        );

        log::debug!(
            "Render buffer {}x{} {:?} ({:?}, {:?})",
            desc.width,
            desc.height,
            desc.format,
            tiling,
            target.layout
        );

        Ok(Self {
            device: device.clone(),
            resource,
            view,
            range,
            format: desc.format,
            extent,
            layout: target.layout,
        })
    }

    pub fn image(&self) -> vk::Image {
        self.resource.image()
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn range(&self) -> vk::ImageSubresourceRange {
        self.range
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    /// Layout the image is in once the creating command buffer has executed
    pub fn layout(&self) -> vk::ImageLayout {
        self.layout
    }

    pub fn memory(&self) -> vk::DeviceMemory {
        self.resource.memory()
    }
}

impl Drop for RenderBuffer {
    fn drop(&mut self) {
        // View before the image it refers to
        unsafe { self.device.destroy_image_view(self.view, None) };
        self.resource.destroy();
    }
}
