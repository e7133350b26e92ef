/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Engine handles carry raw Vulkan handles (`vk::Handle::as_raw`), so the
/// device keeps no object tables of its own.

use ash::vk;
use ash::vk::Handle;
use cadence_engine::cadence::{Error, Result};
use cadence_engine::cadence::device::{
    CommandBufferHandle, CommandPoolHandle, Extent2D, GateHandle, GraphicsDevice, ImageHandle,
    PixelFormat, RenderPassHandle, RenderTargetHandle, SignalHandle, Submission, ViewHandle,
};
use cadence_engine::cadence::RecordTarget;
use cadence_engine::engine_debug;
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{extent_to_vk, format_to_vk, vk_error};

/// Graphics queue side of a Vulkan context
#[derive(Clone)]
pub struct VulkanDevice {
    context: Arc<VulkanContext>,
}

impl VulkanDevice {
    pub fn new(context: Arc<VulkanContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    fn device(&self) -> &ash::Device {
        &self.context.device
    }

    /// Single-subpass color pass for presentable images
    ///
    /// Clears on load, stores, and leaves the image in `PRESENT_SRC_KHR`.
    pub fn create_present_render_pass(&self, format: PixelFormat) -> Result<RenderPassHandle> {
        let attachments = [vk::AttachmentDescription::default()
            .format(format_to_vk(format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

        let color_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];

        // The acquire semaphore is waited at COLOR_ATTACHMENT_OUTPUT; the
        // layout transition must happen after it
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { self.device().create_render_pass(&create_info, None) }
            .map_err(|e| vk_error("Failed to create render pass", e))?;
        engine_debug!("cadence::vulkan", "Created present render pass ({:?})", format);
        Ok(RenderPassHandle(render_pass.as_raw()))
    }

    pub fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe {
            self.device()
                .destroy_render_pass(vk::RenderPass::from_raw(render_pass.0), None);
        }
    }

    /// Record a render pass over `target` that only clears it to `color`
    pub fn record_clear_pass(&self, command_buffer: CommandBufferHandle, target: &RecordTarget, color: [f32; 4]) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        }];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk::RenderPass::from_raw(target.render_pass.0))
            .framebuffer(vk::Framebuffer::from_raw(target.render_target.0))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: extent_to_vk(target.extent),
            })
            .clear_values(&clear_values);

        let cb = vk::CommandBuffer::from_raw(command_buffer.0);
        unsafe {
            self.device()
                .cmd_begin_render_pass(cb, &begin_info, vk::SubpassContents::INLINE);
            self.device().cmd_end_render_pass(cb);
        }
    }
}

fn fence(gate: GateHandle) -> vk::Fence {
    vk::Fence::from_raw(gate.0)
}

impl GraphicsDevice for VulkanDevice {
    // ===== GATES =====

    fn create_gate(&self, signaled: bool) -> Result<GateHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.device().create_fence(&create_info, None) }
            .map_err(|e| vk_error("Failed to create fence", e))?;
        Ok(GateHandle(fence.as_raw()))
    }

    fn destroy_gate(&self, gate: GateHandle) {
        unsafe { self.device().destroy_fence(fence(gate), None) }
    }

    fn gate_status(&self, gate: GateHandle) -> Result<bool> {
        unsafe {
            self.device()
                .get_fence_status(fence(gate))
                .map_err(|e| vk_error("Failed to query fence status", e))
        }
    }

    fn wait_gates(&self, gates: &[GateHandle]) -> Result<()> {
        if gates.is_empty() {
            return Ok(());
        }
        let fences: Vec<vk::Fence> = gates.iter().map(|&g| fence(g)).collect();
        unsafe {
            self.device()
                .wait_for_fences(&fences, true, u64::MAX)
                .map_err(|e| vk_error("Failed to wait for fences", e))
        }
    }

    fn reset_gates(&self, gates: &[GateHandle]) -> Result<()> {
        if gates.is_empty() {
            return Ok(());
        }
        let fences: Vec<vk::Fence> = gates.iter().map(|&g| fence(g)).collect();
        unsafe {
            self.device()
                .reset_fences(&fences)
                .map_err(|e| vk_error("Failed to reset fences", e))
        }
    }

    // ===== SIGNALS =====

    fn create_signal(&self) -> Result<SignalHandle> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.device().create_semaphore(&create_info, None) }
            .map_err(|e| vk_error("Failed to create semaphore", e))?;
        Ok(SignalHandle(semaphore.as_raw()))
    }

    fn destroy_signal(&self, signal: SignalHandle) {
        unsafe {
            self.device()
                .destroy_semaphore(vk::Semaphore::from_raw(signal.0), None)
        }
    }

    // ===== COMMAND BUFFERS =====

    fn create_command_pool(&self) -> Result<CommandPoolHandle> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.context.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { self.device().create_command_pool(&create_info, None) }
            .map_err(|e| vk_error("Failed to create command pool", e))?;
        Ok(CommandPoolHandle(pool.as_raw()))
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        unsafe {
            self.device()
                .destroy_command_pool(vk::CommandPool::from_raw(pool.0), None)
        }
    }

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolHandle,
        count: usize,
    ) -> Result<Vec<CommandBufferHandle>> {
        let count = u32::try_from(count).map_err(|_| {
            Error::Configuration(format!("cannot allocate {} command buffers", count))
        })?;
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(vk::CommandPool::from_raw(pool.0))
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        let buffers = unsafe { self.device().allocate_command_buffers(&allocate_info) }
            .map_err(|e| vk_error("Failed to allocate command buffers", e))?;
        Ok(buffers
            .into_iter()
            .map(|cb| CommandBufferHandle(cb.as_raw()))
            .collect())
    }

    fn begin_commands(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cb = vk::CommandBuffer::from_raw(command_buffer.0);
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device()
                .reset_command_buffer(cb, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_error("Failed to reset command buffer", e))?;
            self.device()
                .begin_command_buffer(cb, &begin_info)
                .map_err(|e| vk_error("Failed to begin command buffer", e))
        }
    }

    fn end_commands(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe {
            self.device()
                .end_command_buffer(vk::CommandBuffer::from_raw(command_buffer.0))
                .map_err(|e| vk_error("Failed to end command buffer", e))
        }
    }

    // ===== PRESENTABLE IMAGE RESOURCES =====

    fn create_image_view(&self, image: ImageHandle, format: PixelFormat) -> Result<ViewHandle> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(vk::Image::from_raw(image.0))
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.device().create_image_view(&create_info, None) }
            .map_err(|e| vk_error("Failed to create image view", e))?;
        Ok(ViewHandle(view.as_raw()))
    }

    fn destroy_image_view(&self, view: ViewHandle) {
        unsafe {
            self.device()
                .destroy_image_view(vk::ImageView::from_raw(view.0), None)
        }
    }

    fn create_render_target(
        &self,
        render_pass: RenderPassHandle,
        view: ViewHandle,
        extent: Extent2D,
    ) -> Result<RenderTargetHandle> {
        let attachments = [vk::ImageView::from_raw(view.0)];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk::RenderPass::from_raw(render_pass.0))
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe { self.device().create_framebuffer(&create_info, None) }
            .map_err(|e| vk_error("Failed to create framebuffer", e))?;
        Ok(RenderTargetHandle(framebuffer.as_raw()))
    }

    fn destroy_render_target(&self, target: RenderTargetHandle) {
        unsafe {
            self.device()
                .destroy_framebuffer(vk::Framebuffer::from_raw(target.0), None)
        }
    }

    // ===== QUEUE =====

    fn submit(&self, submission: &Submission) -> Result<()> {
        let wait_semaphores = [vk::Semaphore::from_raw(submission.wait.0)];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [vk::CommandBuffer::from_raw(submission.command_buffer.0)];
        let signal_semaphores = [vk::Semaphore::from_raw(submission.signal.0)];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let _queues = self.context.lock_queues();
        unsafe {
            self.device()
                .queue_submit(self.context.graphics_queue, &[submit_info], fence(submission.gate))
                .map_err(|e| vk_error("Failed to submit commands to GPU queue", e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        self.context.wait_idle()
    }
}
