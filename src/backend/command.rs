// Command List - ring of command buffers from one pool
//
// `reset` begins recording into the current buffer, `close` ends it and
// rotates to the next one, so consecutive frames never re-record a buffer
// that was just submitted.

use anyhow::{Context, Result};
use ash::vk;

use super::device::DeviceManager;
use super::queue::QueueType;

/// Cursor over a fixed number of slots that wraps back to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingIndex {
    current: usize,
    len: usize,
}

impl RingIndex {
    /// `None` for an empty ring
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self { current: 0, len })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn slot_count(&self) -> usize {
        self.len
    }

    /// Step to the next slot and return it
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.len;
        self.current
    }
}

pub struct CommandList {
    device: ash::Device,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
    ring: RingIndex,
    queue_type: QueueType,
    recording: bool,
}

impl CommandList {
    /// Create a pool on the device's queue family and allocate `count` buffers from it
    pub fn new(
        device_manager: &DeviceManager,
        queue_type: QueueType,
        flags: vk::CommandPoolCreateFlags,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Self> {
        let ring = RingIndex::new(count as usize)
            .context("Invalid argument: command buffer count must be at least 1")?;

        let device = device_manager.device();
        let family_index = device_manager.queue(queue_type).family_index();

        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(flags)
            .queue_family_index(family_index);
        let pool = unsafe { device.create_command_pool(&pool_info, None) }
            .context("Failed to create command pool")?;

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(level)
            .command_buffer_count(count);
        let buffers = match unsafe { device.allocate_command_buffers(&alloc_info) } {
            Ok(buffers) => buffers,
            Err(e) => {
                unsafe { device.destroy_command_pool(pool, None) };
                return Err(e).context("Failed to allocate command buffers");
            }
        };

        log::debug!("Allocated {} {:?} command buffer(s)", count, queue_type);

        Ok(Self {
            device: device.clone(),
            pool,
            buffers,
            ring,
            queue_type,
            recording: false,
        })
    }

    /// Begin recording into the current buffer
    pub fn reset(&mut self) -> Result<vk::CommandBuffer> {
        if self.recording {
            anyhow::bail!("Command buffer {} is already recording", self.ring.current());
        }

        let command_buffer = self.current_command_buffer();
        let begin_info = vk::CommandBufferBeginInfo::builder();
        unsafe { self.device.begin_command_buffer(command_buffer, &begin_info) }
            .context("Failed to begin command buffer")?;

        self.recording = true;
        Ok(command_buffer)
    }

    /// Finish recording and rotate to the next buffer
    pub fn close(&mut self) -> Result<()> {
        if !self.recording {
            anyhow::bail!("Command buffer {} is not recording", self.ring.current());
        }

        let command_buffer = self.current_command_buffer();
        self.recording = false;
        unsafe { self.device.end_command_buffer(command_buffer) }
            .context("Failed to end command buffer")?;

        self.ring.advance();
        Ok(())
    }

    /// Buffer that the next `reset` records into
    pub fn current_command_buffer(&self) -> vk::CommandBuffer {
        self.buffers[self.ring.current()]
    }

    pub fn command_buffer(&self, index: usize) -> Option<vk::CommandBuffer> {
        self.buffers.get(index).copied()
    }

    pub fn buffer_index(&self) -> usize {
        self.ring.current()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn pool(&self) -> vk::CommandPool {
        self.pool
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            if !self.buffers.is_empty() {
                self.device.free_command_buffers(self.pool, &self.buffers);
            }
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_is_rejected() {
        assert!(RingIndex::new(0).is_none());
    }

    #[test]
    fn ring_wraps_after_len_steps() {
        let mut ring = RingIndex::new(3).unwrap();
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.advance(), 1);
        assert_eq!(ring.advance(), 2);
        assert_eq!(ring.advance(), 0);
    }

    #[test]
    fn single_slot_ring_stays_put() {
        let mut ring = RingIndex::new(1).unwrap();
        for _ in 0..5 {
            assert_eq!(ring.advance(), 0);
        }
    }

    #[test]
    fn k_closes_land_on_k_mod_n() {
        for n in 1..=4 {
            let mut ring = RingIndex::new(n).unwrap();
            for k in 1..=3 * n + 1 {
                ring.advance();
                assert_eq!(ring.current(), k % n, "ring of {} after {} steps", n, k);
            }
        }
    }
}
