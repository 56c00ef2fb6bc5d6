// Queue - Command submission and completion
//
// One device queue paired with one fence. A submission signals the fence,
// `wait` blocks on it and re-arms it for the next submission.

use anyhow::{Context, Result};
use ash::prelude::VkResult;
use ash::vk;
use std::sync::atomic::{AtomicBool, Ordering};

use super::fatal_device_lost;

/// Which of the two device queues a wrapper belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
}

/// Outcome of [`Queue::wait`]
///
/// Device loss never shows up here: it terminates the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The fence signaled and has been reset for reuse
    Signaled,
    /// The timeout elapsed first; the fence is left untouched
    TimedOut,
    OutOfHostMemory,
    OutOfDeviceMemory,
    /// Any other driver error, passed through
    Failed(vk::Result),
}

impl WaitStatus {
    pub fn is_signaled(self) -> bool {
        self == WaitStatus::Signaled
    }
}

/// Result of a fence wait before the device-lost check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceOutcome {
    Status(WaitStatus),
    DeviceLost,
}

fn classify_fence_wait(result: VkResult<()>) -> FenceOutcome {
    match result {
        Ok(()) => FenceOutcome::Status(WaitStatus::Signaled),
        Err(vk::Result::TIMEOUT) => FenceOutcome::Status(WaitStatus::TimedOut),
        Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY) => {
            FenceOutcome::Status(WaitStatus::OutOfHostMemory)
        }
        Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY) => {
            FenceOutcome::Status(WaitStatus::OutOfDeviceMemory)
        }
        Err(vk::Result::ERROR_DEVICE_LOST) => FenceOutcome::DeviceLost,
        Err(other) => FenceOutcome::Status(WaitStatus::Failed(other)),
    }
}

pub struct Queue {
    device: ash::Device,
    queue: vk::Queue,
    fence: vk::Fence,
    family_index: u32,
    queue_index: u32,
    queue_type: QueueType,
    // Set by execute, cleared once the fence has been observed and reset
    in_flight: AtomicBool,
}

impl Queue {
    /// Fetch the device queue `queue_index` of `family_index` and create its fence
    pub fn new(
        device: &ash::Device,
        family_index: u32,
        queue_index: u32,
        queue_type: QueueType,
    ) -> Result<Self> {
        let queue = unsafe { device.get_device_queue(family_index, queue_index) };

        let fence_info = vk::FenceCreateInfo::builder();
        let fence = unsafe { device.create_fence(&fence_info, None) }
            .context("Failed to create queue fence")?;

        log::debug!(
            "{:?} queue ready (family {}, index {})",
            queue_type,
            family_index,
            queue_index
        );

        Ok(Self {
            device: device.clone(),
            queue,
            fence,
            family_index,
            queue_index,
            queue_type,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Submit recorded command buffers. The queue's fence is signaled on completion.
    ///
    /// The previous submission must have been waited on first.
    pub fn execute(&self, command_buffers: &[vk::CommandBuffer]) -> Result<()> {
        if self.fence == vk::Fence::null() {
            anyhow::bail!("{:?} queue has been destroyed", self.queue_type);
        }
        if self.in_flight.load(Ordering::Acquire) {
            anyhow::bail!(
                "{:?} queue still has a submission that was never waited on",
                self.queue_type
            );
        }

        // No wait semaphores; the swapchain waits on its own semaphore at present time
        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(command_buffers)
            .build();

        let result = unsafe {
            self.device
                .queue_submit(self.queue, std::slice::from_ref(&submit_info), self.fence)
        };
        match result {
            Ok(()) => {
                self.in_flight.store(true, Ordering::Release);
                Ok(())
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => fatal_device_lost("vkQueueSubmit"),
            Err(e) => Err(e).context("Failed to submit command buffers"),
        }
    }

    /// Block until the last submission completes or `timeout_ns` elapses
    pub fn wait(&self, timeout_ns: u64) -> WaitStatus {
        let result = unsafe {
            self.device
                .wait_for_fences(std::slice::from_ref(&self.fence), true, timeout_ns)
        };

        let status = match classify_fence_wait(result) {
            FenceOutcome::DeviceLost => fatal_device_lost("vkWaitForFences"),
            FenceOutcome::Status(status) => status,
        };

        match status {
            WaitStatus::Signaled => {
                if let Err(e) = unsafe {
                    self.device
                        .reset_fences(std::slice::from_ref(&self.fence))
                } {
                    log::error!("Failed to reset {:?} queue fence: {:?}", self.queue_type, e);
                    return WaitStatus::Failed(e);
                }
                self.in_flight.store(false, Ordering::Release);
            }
            WaitStatus::TimedOut => {
                log::info!("{:?} queue wait timed out after {} ns", self.queue_type, timeout_ns);
            }
            WaitStatus::OutOfHostMemory | WaitStatus::OutOfDeviceMemory => {
                log::error!("{:?} queue wait failed: {:?}", self.queue_type, status);
            }
            WaitStatus::Failed(e) => {
                log::error!("{:?} queue wait failed: {:?}", self.queue_type, e);
            }
        }

        status
    }

    /// Whether a submission is still waiting to be observed by [`Queue::wait`]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.queue_wait_idle(self.queue) }
            .context("Failed to wait for queue idle")
    }

    pub fn handle(&self) -> vk::Queue {
        self.queue
    }

    pub fn fence(&self) -> vk::Fence {
        self.fence
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    pub fn queue_index(&self) -> u32 {
        self.queue_index
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Release the fence. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.fence != vk::Fence::null() {
            unsafe { self.device.destroy_fence(self.fence, None) };
            self.fence = vk::Fence::null();
        }
        self.queue = vk::Queue::null();
        self.in_flight.store(false, Ordering::Release);
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaled_fence_maps_to_signaled() {
        assert_eq!(
            classify_fence_wait(Ok(())),
            FenceOutcome::Status(WaitStatus::Signaled)
        );
    }

    #[test]
    fn timeout_is_not_an_error() {
        assert_eq!(
            classify_fence_wait(Err(vk::Result::TIMEOUT)),
            FenceOutcome::Status(WaitStatus::TimedOut)
        );
        assert!(!WaitStatus::TimedOut.is_signaled());
    }

    #[test]
    fn memory_errors_are_reported() {
        assert_eq!(
            classify_fence_wait(Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY)),
            FenceOutcome::Status(WaitStatus::OutOfHostMemory)
        );
        assert_eq!(
            classify_fence_wait(Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)),
            FenceOutcome::Status(WaitStatus::OutOfDeviceMemory)
        );
    }

    #[test]
    fn device_lost_is_singled_out() {
        assert_eq!(
            classify_fence_wait(Err(vk::Result::ERROR_DEVICE_LOST)),
            FenceOutcome::DeviceLost
        );
    }

    #[test]
    fn unknown_errors_pass_through() {
        assert_eq!(
            classify_fence_wait(Err(vk::Result::ERROR_UNKNOWN)),
            FenceOutcome::Status(WaitStatus::Failed(vk::Result::ERROR_UNKNOWN))
        );
    }
}
