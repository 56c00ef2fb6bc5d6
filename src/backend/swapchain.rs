// Swapchain - Window presentation
//
// Owns the surface, the swapchain images and their views, and the one
// semaphore that links image acquisition to presentation. Creation records
// the first layout transition of every image and acquires the first image.

use anyhow::{Context, Result};
use ash::extensions::khr;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::sync::Arc;

use super::barrier::ImageTransition;
use super::device::DeviceManager;
use super::fatal_device_lost;

/// Creation parameters for a [`SwapChain`]
#[derive(Debug, Clone, Copy)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub buffer_count: u32,
    /// `None` lets the driver pick (IMMEDIATE, then MAILBOX, then FIFO)
    pub present_mode: Option<vk::PresentModeKHR>,
    pub display_handle: RawDisplayHandle,
    pub window_handle: RawWindowHandle,
}

/// Outcome of [`SwapChain::present`], including the re-acquire that follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    /// Presented, but the swapchain no longer matches the surface exactly
    Suboptimal,
    OutOfDate,
    SurfaceLost,
    OutOfHostMemory,
    OutOfDeviceMemory,
    Failed(vk::Result),
}

impl PresentStatus {
    fn from_error(error: vk::Result) -> Self {
        match error {
            vk::Result::ERROR_OUT_OF_DATE_KHR => PresentStatus::OutOfDate,
            vk::Result::ERROR_SURFACE_LOST_KHR => PresentStatus::SurfaceLost,
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => PresentStatus::OutOfHostMemory,
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => PresentStatus::OutOfDeviceMemory,
            other => PresentStatus::Failed(other),
        }
    }

    /// Whether the swapchain has to be recreated before the next present.
    ///
    /// `Failed` covers an acquire that timed out or was not ready: no image is
    /// held, so the current index must not be recorded into again.
    pub fn needs_rebuild(self) -> bool {
        matches!(
            self,
            PresentStatus::Suboptimal
                | PresentStatus::OutOfDate
                | PresentStatus::SurfaceLost
                | PresentStatus::Failed(_)
        )
    }
}

/// Status of a present whose follow-up acquire failed.
///
/// The chain holds no image afterwards, so the result always requests a rebuild.
fn acquire_failure_status(presented: PresentStatus, error: vk::Result) -> PresentStatus {
    if matches!(presented, PresentStatus::OutOfDate | PresentStatus::SurfaceLost) {
        return presented;
    }
    match PresentStatus::from_error(error) {
        status if status.needs_rebuild() => status,
        _ => PresentStatus::Failed(error),
    }
}

/// Exact format + color space match; there is no fallback
pub fn find_surface_format(
    available: &[vk::SurfaceFormatKHR],
    format: vk::Format,
    color_space: vk::ColorSpaceKHR,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .copied()
        .find(|f| f.format == format && f.color_space == color_space)
}

/// Explicit request if the surface supports it, else IMMEDIATE > MAILBOX > FIFO
pub fn select_present_mode(
    available: &[vk::PresentModeKHR],
    requested: Option<vk::PresentModeKHR>,
) -> vk::PresentModeKHR {
    if let Some(mode) = requested.filter(|mode| available.contains(mode)) {
        return mode;
    }
    if requested.is_some() {
        log::warn!("Requested present mode {:?} not supported", requested);
    }

    [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO) // FIFO is always supported
}

pub fn select_pre_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

/// `max_image_count == 0` means the surface has no upper limit
pub fn buffer_count_supported(caps: &vk::SurfaceCapabilitiesKHR, buffer_count: u32) -> bool {
    buffer_count >= caps.min_image_count
        && (caps.max_image_count == 0 || buffer_count <= caps.max_image_count)
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

pub struct SwapChain {
    swapchain_loader: khr::Swapchain,
    surface_loader: khr::Surface,
    swapchain: vk::SwapchainKHR,
    surface: vk::SurfaceKHR,
    semaphore: vk::Semaphore,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    range: vk::ImageSubresourceRange,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    buffer_index: u32,
    image_acquired: bool,
    device: Arc<DeviceManager>,
}

impl SwapChain {
    /// Build surface + swapchain for the window in `desc`.
    ///
    /// The UNDEFINED to PRESENT_SRC transitions are recorded on
    /// `command_buffer`, which must be recording and must be executed before
    /// the first present.
    pub fn new(
        device: Arc<DeviceManager>,
        command_buffer: vk::CommandBuffer,
        desc: &SwapChainDesc,
    ) -> Result<Self> {
        if command_buffer == vk::CommandBuffer::null() {
            anyhow::bail!("Invalid argument: swapchain needs a recording command buffer");
        }
        if desc.buffer_count == 0 {
            anyhow::bail!("Invalid argument: swapchain needs at least one buffer");
        }

        log::info!(
            "Creating swapchain: {}x{}, {} buffers",
            desc.width,
            desc.height,
            desc.buffer_count
        );

        let surface_loader = khr::Surface::new(device.entry(), device.instance());
        let swapchain_loader = khr::Swapchain::new(device.instance(), device.device());

        // Handles fill in as they are created; Drop releases whatever exists
        let mut chain = Self {
            swapchain_loader,
            surface_loader,
            swapchain: vk::SwapchainKHR::null(),
            surface: vk::SurfaceKHR::null(),
            semaphore: vk::Semaphore::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            format: vk::SurfaceFormatKHR::default(),
            extent: vk::Extent2D::default(),
            present_mode: vk::PresentModeKHR::FIFO,
            buffer_index: 0,
            image_acquired: false,
            device,
        };

        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        chain.semaphore = unsafe { chain.device.device().create_semaphore(&semaphore_info, None) }
            .context("Failed to create swapchain semaphore")?;

        chain.surface = unsafe {
            ash_window::create_surface(
                chain.device.entry(),
                chain.device.instance(),
                desc.display_handle,
                desc.window_handle,
                None,
            )
        }
        .context("Failed to create window surface")?;

        chain.create_swapchain(desc)?;
        chain.create_image_views()?;

        let device = chain.device.device();
        for &image in &chain.images {
            ImageTransition::from_undefined(vk::ImageLayout::PRESENT_SRC_KHR).record(
                device,
                command_buffer,
                image,
                chain.range,
            );
        }

        let (index, _) = unsafe {
            chain.swapchain_loader.acquire_next_image(
                chain.swapchain,
                u64::MAX,
                chain.semaphore,
                vk::Fence::null(),
            )
        }
        .context("Failed to acquire first swapchain image")?;
        chain.buffer_index = index;
        chain.image_acquired = true;

        log::info!(
            "Created swapchain with {} images ({:?}, {:?})",
            chain.images.len(),
            chain.format.format,
            chain.present_mode
        );

        Ok(chain)
    }

    fn create_swapchain(&mut self, desc: &SwapChainDesc) -> Result<()> {
        let gpu = self.device.physical_device();
        let family = self.device.graphics_queue().family_index();

        let supported = unsafe {
            self.surface_loader
                .get_physical_device_surface_support(gpu, family, self.surface)
        }
        .context("Failed to query surface support")?;
        if !supported {
            anyhow::bail!("Queue family {} cannot present to this surface", family);
        }

        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(gpu, self.surface)
        }
        .context("Failed to query surface formats")?;
        self.format = find_surface_format(&formats, desc.format, desc.color_space).with_context(
            || format!("Surface does not offer {:?} / {:?}", desc.format, desc.color_space),
        )?;

        let caps = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(gpu, self.surface)
        }
        .context("Failed to query surface capabilities")?;
        if !buffer_count_supported(&caps, desc.buffer_count) {
            anyhow::bail!(
                "Surface supports {}..{} images, {} requested",
                caps.min_image_count,
                caps.max_image_count,
                desc.buffer_count
            );
        }

        let present_modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(gpu, self.surface)
        }
        .context("Failed to query present modes")?;
        self.present_mode = select_present_mode(&present_modes, desc.present_mode);
        self.extent = choose_extent(&caps, desc.width, desc.height);

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.surface)
            .min_image_count(desc.buffer_count)
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(self.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(select_pre_transform(&caps))
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true);

        self.swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .context("Failed to create swapchain")?;

        self.images = unsafe { self.swapchain_loader.get_swapchain_images(self.swapchain) }
            .context("Failed to get swapchain images")?;
        if self.images.len() != desc.buffer_count as usize {
            anyhow::bail!(
                "Driver created {} swapchain images, {} requested",
                self.images.len(),
                desc.buffer_count
            );
        }

        Ok(())
    }

    fn create_image_views(&mut self) -> Result<()> {
        for &image in &self.images {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::R,
                    g: vk::ComponentSwizzle::G,
                    b: vk::ComponentSwizzle::B,
                    a: vk::ComponentSwizzle::A,
                })
                .subresource_range(self.range);

            let view = unsafe { self.device.device().create_image_view(&create_info, None) }
                .context("Failed to create swapchain image view")?;
            self.image_views.push(view);
        }
        Ok(())
    }

    /// Present the current image and acquire the next one.
    ///
    /// The presentation waits on the semaphore signaled by the previous
    /// acquire. A failed acquire is folded into the returned status so the
    /// caller rebuilds before presenting again.
    pub fn present(&mut self, timeout_ns: u64) -> PresentStatus {
        let wait_semaphores = [self.semaphore];
        let swapchains = [self.swapchain];
        let image_indices = [self.buffer_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let queue = self.device.graphics_queue().handle();
        let status = match unsafe { self.swapchain_loader.queue_present(queue, &present_info) } {
            Ok(false) => PresentStatus::Presented,
            Ok(true) => PresentStatus::Suboptimal,
            Err(vk::Result::ERROR_DEVICE_LOST) => fatal_device_lost("vkQueuePresentKHR"),
            Err(e) => {
                let status = PresentStatus::from_error(e);
                log::error!("Present failed: {:?}", status);
                status
            }
        };

        self.image_acquired = false;
        let acquired = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                self.semaphore,
                vk::Fence::null(),
            )
        };
        match acquired {
            Ok((index, suboptimal)) => {
                self.buffer_index = index;
                self.image_acquired = true;
                if suboptimal && status == PresentStatus::Presented {
                    return PresentStatus::Suboptimal;
                }
                status
            }
            Err(e) => {
                log::error!("Failed to acquire next swapchain image: {:?}", e);
                acquire_failure_status(status, e)
            }
        }
    }

    /// Index of the image currently acquired for rendering
    pub fn buffer_index(&self) -> u32 {
        self.buffer_index
    }

    /// False after a failed acquire; `buffer_index` is stale until the chain is rebuilt
    pub fn is_image_acquired(&self) -> bool {
        self.image_acquired
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, index: usize) -> Option<vk::Image> {
        self.images.get(index).copied()
    }

    pub fn image_view(&self, index: usize) -> Option<vk::ImageView> {
        self.image_views.get(index).copied()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn current_image(&self) -> vk::Image {
        self.images[self.buffer_index as usize]
    }

    pub fn current_view(&self) -> vk::ImageView {
        self.image_views[self.buffer_index as usize]
    }

    pub fn range(&self) -> vk::ImageSubresourceRange {
        self.range
    }

    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.format.color_space
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        let device = self.device.device();
        unsafe {
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }
            if self.semaphore != vk::Semaphore::null() {
                device.destroy_semaphore(self.semaphore, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn surface_format_requires_exact_pair() {
        let available = [
            surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(
            find_surface_format(
                &available,
                vk::Format::B8G8R8A8_UNORM,
                vk::ColorSpaceKHR::SRGB_NONLINEAR
            ),
            Some(available[1])
        );
        assert_eq!(
            find_surface_format(
                &available,
                vk::Format::R8G8B8A8_UNORM,
                vk::ColorSpaceKHR::SRGB_NONLINEAR
            ),
            None
        );
        assert_eq!(
            find_surface_format(
                &available,
                vk::Format::B8G8R8A8_UNORM,
                vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT
            ),
            None
        );
    }

    #[test]
    fn immediate_beats_mailbox_beats_fifo() {
        use vk::PresentModeKHR as M;
        assert_eq!(select_present_mode(&[M::FIFO, M::MAILBOX, M::IMMEDIATE], None), M::IMMEDIATE);
        assert_eq!(select_present_mode(&[M::FIFO, M::MAILBOX], None), M::MAILBOX);
        assert_eq!(select_present_mode(&[M::FIFO], None), M::FIFO);
        assert_eq!(select_present_mode(&[], None), M::FIFO);
    }

    #[test]
    fn explicit_present_mode_used_when_supported() {
        use vk::PresentModeKHR as M;
        assert_eq!(
            select_present_mode(&[M::FIFO, M::MAILBOX, M::IMMEDIATE], Some(M::FIFO)),
            M::FIFO
        );
        // Unsupported request falls back to the automatic order
        assert_eq!(select_present_mode(&[M::FIFO, M::MAILBOX], Some(M::IMMEDIATE)), M::MAILBOX);
    }

    #[test]
    fn identity_transform_preferred() {
        let caps = vk::SurfaceCapabilitiesKHR {
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY
                | vk::SurfaceTransformFlagsKHR::ROTATE_90,
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            ..Default::default()
        };
        assert_eq!(select_pre_transform(&caps), vk::SurfaceTransformFlagsKHR::IDENTITY);

        let rotated_only = vk::SurfaceCapabilitiesKHR {
            supported_transforms: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            ..Default::default()
        };
        assert_eq!(select_pre_transform(&rotated_only), vk::SurfaceTransformFlagsKHR::ROTATE_90);
    }

    #[test]
    fn zero_max_image_count_is_unlimited() {
        let unlimited = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert!(buffer_count_supported(&unlimited, 8));

        let capped = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert!(buffer_count_supported(&capped, 3));
        assert!(!buffer_count_supported(&capped, 4));
        assert!(!buffer_count_supported(&capped, 1));
    }

    #[test]
    fn extent_follows_surface_unless_undefined() {
        let fixed = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 800, height: 600 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&fixed, 960, 540), vk::Extent2D { width: 800, height: 600 });

        let free = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 512 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&free, 960, 540), vk::Extent2D { width: 960, height: 512 });
    }

    #[test]
    fn stale_statuses_request_rebuild() {
        assert!(PresentStatus::OutOfDate.needs_rebuild());
        assert!(PresentStatus::Suboptimal.needs_rebuild());
        assert!(PresentStatus::SurfaceLost.needs_rebuild());
        assert!(!PresentStatus::Presented.needs_rebuild());
        assert!(!PresentStatus::OutOfHostMemory.needs_rebuild());
        assert_eq!(
            PresentStatus::from_error(vk::Result::ERROR_OUT_OF_DATE_KHR),
            PresentStatus::OutOfDate
        );
    }

    #[test]
    fn failed_acquire_requests_rebuild() {
        assert!(PresentStatus::Failed(vk::Result::TIMEOUT).needs_rebuild());
        assert!(PresentStatus::Failed(vk::Result::NOT_READY).needs_rebuild());

        let timed_out = acquire_failure_status(PresentStatus::Presented, vk::Result::TIMEOUT);
        assert_eq!(timed_out, PresentStatus::Failed(vk::Result::TIMEOUT));
        assert!(timed_out.needs_rebuild());

        let not_ready = acquire_failure_status(PresentStatus::Suboptimal, vk::Result::NOT_READY);
        assert!(not_ready.needs_rebuild());

        // A present error that alone would not rebuild still does once the acquire failed
        let after_oom = acquire_failure_status(PresentStatus::OutOfHostMemory, vk::Result::TIMEOUT);
        assert!(after_oom.needs_rebuild());

        let after_out_of_date =
            acquire_failure_status(PresentStatus::OutOfDate, vk::Result::TIMEOUT);
        assert_eq!(after_out_of_date, PresentStatus::OutOfDate);

        let oom_acquire =
            acquire_failure_status(PresentStatus::Presented, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        assert_eq!(oom_acquire, PresentStatus::Failed(vk::Result::ERROR_OUT_OF_HOST_MEMORY));

        let lost = acquire_failure_status(PresentStatus::Presented, vk::Result::ERROR_SURFACE_LOST_KHR);
        assert_eq!(lost, PresentStatus::SurfaceLost);
    }
}
