// Image layout transitions
//
// Pipeline barriers recorded into a command buffer. The access masks and
// stages used for a given target layout live here so every wrapper that
// moves an image between layouts agrees on them.

use ash::vk;

/// Access mask the destination scope needs for an image entering `layout`
pub fn access_mask_for_layout(layout: vk::ImageLayout) -> vk::AccessFlags {
    match layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => vk::AccessFlags::TRANSFER_READ,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => {
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => {
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::INPUT_ATTACHMENT_READ
        }
        _ => vk::AccessFlags::empty(),
    }
}

/// First pipeline stage that touches an image in `layout`
pub fn stage_for_layout(layout: vk::ImageLayout) -> vk::PipelineStageFlags {
    match layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL | vk::ImageLayout::TRANSFER_SRC_OPTIMAL => {
            vk::PipelineStageFlags::TRANSFER
        }
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => {
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        }
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => {
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => vk::PipelineStageFlags::FRAGMENT_SHADER,
        _ => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    }
}

/// A single image memory barrier, minus the image itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
}

impl ImageTransition {
    /// Presented swapchain image about to be rendered into
    pub const PRESENT_TO_COLOR_ATTACHMENT: Self = Self {
        src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
        dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access: vk::AccessFlags::MEMORY_READ,
        dst_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        old_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    /// Rendered swapchain image handed back to the presentation engine
    pub const COLOR_ATTACHMENT_TO_PRESENT: Self = Self {
        src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        src_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        dst_access: vk::AccessFlags::MEMORY_READ,
        old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
    };

    /// Freshly created image (contents discarded) moved into `new_layout`
    pub fn from_undefined(new_layout: vk::ImageLayout) -> Self {
        Self {
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: stage_for_layout(new_layout),
            src_access: vk::AccessFlags::empty(),
            dst_access: access_mask_for_layout(new_layout),
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout,
        }
    }

    /// Record the barrier for `image` into `command_buffer`
    pub fn record(
        &self,
        device: &ash::Device,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        range: vk::ImageSubresourceRange,
    ) {
        let barrier = vk::ImageMemoryBarrier::builder()
            .src_access_mask(self.src_access)
            .dst_access_mask(self.dst_access)
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(range)
            .build();

        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                self.src_stage,
                self.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(&barrier),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_target_waits_on_depth_writes() {
        let t = ImageTransition::from_undefined(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(t.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(t.src_access, vk::AccessFlags::empty());
        assert_eq!(t.dst_access, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS);
    }

    #[test]
    fn shader_read_covers_input_attachments() {
        let access = access_mask_for_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert!(access.contains(vk::AccessFlags::SHADER_READ));
        assert!(access.contains(vk::AccessFlags::INPUT_ATTACHMENT_READ));
    }

    #[test]
    fn present_layout_needs_no_access() {
        assert_eq!(
            access_mask_for_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AccessFlags::empty()
        );
        assert_eq!(
            stage_for_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        );
    }

    #[test]
    fn frame_transitions_are_mirror_images() {
        let into = ImageTransition::PRESENT_TO_COLOR_ATTACHMENT;
        let back = ImageTransition::COLOR_ATTACHMENT_TO_PRESENT;
        assert_eq!(into.old_layout, back.new_layout);
        assert_eq!(into.new_layout, back.old_layout);
        assert_eq!(into.dst_access, back.src_access);
        assert_eq!(into.src_access, back.dst_access);
    }
}
