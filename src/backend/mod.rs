// Backend module - Vulkan abstraction layer
//
// Thin wrappers around ash. Each wrapper owns its native handles and
// releases them on drop, in reverse creation order.

pub mod barrier;
pub mod command;
pub mod device;
pub mod queue;
pub mod render_buffer;
pub mod render_pass;
pub mod resource;
pub mod shader;
pub mod swapchain;

pub use barrier::ImageTransition;
pub use command::CommandList;
pub use device::DeviceManager;
pub use queue::{Queue, QueueType, WaitStatus};
pub use render_buffer::{RenderBuffer, RenderBufferDesc};
pub use resource::{BufferResource, ImageResource};
pub use swapchain::{PresentStatus, SwapChain, SwapChainDesc};

/// Terminate the process after the GPU reported `VK_ERROR_DEVICE_LOST`.
///
/// Nothing owned by the device is usable afterwards, so there is no
/// meaningful way to unwind.
pub fn fatal_device_lost(operation: &str) -> ! {
    log::error!(
        "Fatal error: {} returned VK_ERROR_DEVICE_LOST, the application cannot continue",
        operation
    );
    std::process::abort()
}
