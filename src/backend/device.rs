// Device Manager - Core GPU interface
//
// Responsibilities:
// - Instance creation (window surface extensions, optional validation)
// - Physical device enumeration with cached memory properties
// - Logical device on the last family offering graphics + compute
// - Graphics and compute queue wrappers

use anyhow::{Context, Result};
use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry};
use raw_window_handle::RawDisplayHandle;
use std::ffi::{CStr, CString};
use std::sync::Arc;

use super::queue::{Queue, QueueType};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// One enumerated GPU together with its memory heaps and types
#[derive(Clone, Copy)]
pub struct PhysicalDeviceInfo {
    pub gpu: vk::PhysicalDevice,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

/// Pick the queue family used for both graphics and compute work.
///
/// The last family advertising both capabilities wins.
pub fn select_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    let required = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE;
    families
        .iter()
        .enumerate()
        .filter(|(_, props)| props.queue_flags.contains(required))
        .map(|(i, _)| i as u32)
        .last()
}

/// Compare a reported layer name; an unterminated name never matches
fn layer_has_name(layer: &vk::LayerProperties, name: &CStr) -> bool {
    let bytes: &[u8] = bytemuck::cast_slice(layer.layer_name.as_slice());
    CStr::from_bytes_until_nul(bytes).is_ok_and(|reported| reported == name)
}

/// Queue index inside the chosen family for each queue type.
///
/// Compute shares queue 0 when the family only exposes a single queue.
pub fn queue_index_for(queue_type: QueueType, family_queue_count: u32) -> u32 {
    match queue_type {
        QueueType::Graphics => 0,
        QueueType::Compute if family_queue_count > 1 => 1,
        QueueType::Compute => 0,
    }
}

/// Vulkan device wrapper with automatic cleanup
pub struct DeviceManager {
    graphics_queue: Queue,
    compute_queue: Queue,
    device: ash::Device,
    physical_devices: Vec<PhysicalDeviceInfo>,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    instance: ash::Instance,
    entry: Entry,

    queue_family: u32,
    properties: vk::PhysicalDeviceProperties,
}

impl DeviceManager {
    /// Bring up instance, device and queues.
    ///
    /// # Arguments
    /// * `app_name` - Application name reported to the driver
    /// * `enable_validation` - Request the Khronos validation layer and a debug messenger
    /// * `display_handle` - Display the surface extensions are chosen for; `None` for headless use
    pub fn new(
        app_name: &str,
        enable_validation: bool,
        display_handle: Option<RawDisplayHandle>,
    ) -> Result<Arc<Self>> {
        log::info!("Creating Vulkan device: {}", app_name);

        let entry = unsafe { Entry::load() }
            .context("Failed to load Vulkan library. Is Vulkan installed?")?;

        let enable_validation = enable_validation && Self::validation_available(&entry);
        let instance = Self::create_instance(&entry, app_name, enable_validation, display_handle)?;

        let debug_utils = if enable_validation {
            match Self::setup_debug_messenger(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    log::warn!("Debug messenger unavailable: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        // From here on the instance must be destroyed on every error path
        let physical_devices = match Self::enumerate_gpus(&instance) {
            Ok(gpus) => gpus,
            Err(e) => {
                unsafe { Self::destroy_instance(&instance, debug_utils) };
                return Err(e);
            }
        };

        let primary = physical_devices[0].gpu;
        let properties = unsafe { instance.get_physical_device_properties(primary) };
        log::info!(
            "Selected GPU: {}",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy()
        );
        log::info!(
            "API Version: {}.{}.{}",
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version),
            vk::api_version_patch(properties.api_version)
        );

        let families = unsafe { instance.get_physical_device_queue_family_properties(primary) };
        let (queue_family, queue_count) = match select_queue_family(&families) {
            Some(index) => (index, families[index as usize].queue_count),
            None => {
                unsafe { Self::destroy_instance(&instance, debug_utils) };
                anyhow::bail!("No queue family supports both graphics and compute");
            }
        };

        let device = match Self::create_logical_device(
            &instance,
            primary,
            queue_family,
            queue_count,
            display_handle.is_some(),
        ) {
            Ok(device) => device,
            Err(e) => {
                unsafe { Self::destroy_instance(&instance, debug_utils) };
                return Err(e);
            }
        };

        let queues = Queue::new(
            &device,
            queue_family,
            queue_index_for(QueueType::Graphics, queue_count),
            QueueType::Graphics,
        )
        .and_then(|graphics| {
            let compute = Queue::new(
                &device,
                queue_family,
                queue_index_for(QueueType::Compute, queue_count),
                QueueType::Compute,
            )?;
            Ok((graphics, compute))
        });
        let (graphics_queue, compute_queue) = match queues {
            Ok(queues) => queues,
            Err(e) => {
                unsafe {
                    device.destroy_device(None);
                    Self::destroy_instance(&instance, debug_utils);
                }
                return Err(e);
            }
        };

        log::info!(
            "Queue family {} ({} queue(s)) serves graphics and compute",
            queue_family,
            queue_count
        );

        Ok(Arc::new(Self {
            graphics_queue,
            compute_queue,
            device,
            physical_devices,
            debug_utils,
            instance,
            entry,
            queue_family,
            properties,
        }))
    }

    fn validation_available(entry: &Entry) -> bool {
        let layers = entry.enumerate_instance_layer_properties().unwrap_or_default();
        let found = layers
            .iter()
            .any(|layer| layer_has_name(layer, VALIDATION_LAYER));
        if !found {
            log::warn!("Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }
        found
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        enable_validation: bool,
        display_handle: Option<RawDisplayHandle>,
    ) -> Result<ash::Instance> {
        let app_name_cstr = CString::new(app_name)?;
        let engine_name = CString::new("asvk")?;

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        // Surface extensions for whatever platform the window lives on
        let mut extensions = match display_handle {
            Some(display) => ash_window::enumerate_required_extensions(display)
                .context("Failed to query surface extensions")?
                .to_vec(),
            None => Vec::new(),
        };
        if enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .context("Failed to create Vulkan instance")?;

        Ok(instance)
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .context("Failed to create debug messenger")?;

        Ok((debug_utils, messenger))
    }

    fn enumerate_gpus(instance: &ash::Instance) -> Result<Vec<PhysicalDeviceInfo>> {
        let gpus = unsafe { instance.enumerate_physical_devices() }
            .context("Failed to enumerate physical devices")?;

        if gpus.is_empty() {
            anyhow::bail!("No Vulkan-capable GPU found");
        }

        Ok(gpus
            .into_iter()
            .map(|gpu| PhysicalDeviceInfo {
                gpu,
                memory_properties: unsafe {
                    instance.get_physical_device_memory_properties(gpu)
                },
            })
            .collect())
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        queue_count: u32,
        enable_swapchain: bool,
    ) -> Result<ash::Device> {
        let queue_priorities = vec![1.0f32; queue_count as usize];
        let queue_create_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family)
            .queue_priorities(&queue_priorities)
            .build();

        let mut extensions = Vec::new();
        if enable_swapchain {
            extensions.push(ash::extensions::khr::Swapchain::name().as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::default();
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        unsafe { instance.create_device(physical_device, &create_info, None) }
            .context("Failed to create logical device")
    }

    unsafe fn destroy_instance(
        instance: &ash::Instance,
        debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    ) {
        if let Some((debug_utils, messenger)) = debug_utils {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        instance.destroy_instance(None);
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.context("Failed to wait for device idle")
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// The GPU everything runs on (first enumerated)
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_devices[0].gpu
    }

    pub fn physical_devices(&self) -> &[PhysicalDeviceInfo] {
        &self.physical_devices
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.physical_devices[0].memory_properties
    }

    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn graphics_queue(&self) -> &Queue {
        &self.graphics_queue
    }

    pub fn compute_queue(&self) -> &Queue {
        &self.compute_queue
    }

    pub fn queue(&self, queue_type: QueueType) -> &Queue {
        match queue_type {
            QueueType::Graphics => &self.graphics_queue,
            QueueType::Compute => &self.compute_queue,
        }
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        if let Err(e) = self.wait_idle() {
            log::warn!("{:#}", e);
        }

        // Queues first: their fences belong to the device
        self.compute_queue.destroy();
        self.graphics_queue.destroy();

        unsafe {
            self.device.destroy_device(None);
            Self::destroy_instance(&self.instance, self.debug_utils.take());
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            log::info!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    // Never abort the call that triggered the message
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &[u8]) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, &src) in props.layer_name.iter_mut().zip(name) {
            *dst = src as std::ffi::c_char;
        }
        props
    }

    #[test]
    fn validation_layer_is_matched_by_name() {
        assert!(layer_has_name(&layer(b"VK_LAYER_KHRONOS_validation\0"), VALIDATION_LAYER));
        assert!(!layer_has_name(&layer(b"VK_LAYER_LUNARG_monitor\0"), VALIDATION_LAYER));
        assert!(!layer_has_name(&layer(b"VK_LAYER_KHRONOS_validation_extra\0"), VALIDATION_LAYER));

        let mut unterminated = vk::LayerProperties::default();
        unterminated.layer_name.fill(b'A' as std::ffi::c_char);
        assert!(!layer_has_name(&unterminated, VALIDATION_LAYER));
    }

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn last_matching_family_wins() {
        let families = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 16),
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1),
        ];
        assert_eq!(select_queue_family(&families), Some(2));
    }

    #[test]
    fn graphics_only_family_is_rejected() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::COMPUTE, 1),
        ];
        assert_eq!(select_queue_family(&families), None);
    }

    #[test]
    fn empty_family_list_yields_none() {
        assert_eq!(select_queue_family(&[]), None);
    }

    #[test]
    fn compute_uses_second_queue_when_available() {
        assert_eq!(queue_index_for(QueueType::Graphics, 4), 0);
        assert_eq!(queue_index_for(QueueType::Compute, 4), 1);
    }

    #[test]
    fn compute_shares_queue_zero_on_single_queue_family() {
        assert_eq!(queue_index_for(QueueType::Compute, 1), 0);
    }
}
