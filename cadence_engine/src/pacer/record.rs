/// Recording hook - where the application emits its draw commands

use crate::device::{
    CommandBufferHandle, Extent2D, ImageHandle, PixelFormat, RenderPassHandle, RenderTargetHandle,
    ViewHandle,
};

/// Everything a recorder needs to draw into the acquired image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTarget {
    /// Presentable image index returned by acquire
    pub image_index: u32,
    /// Frame slot (ring position) the frame runs in
    pub slot: usize,
    pub render_target: RenderTargetHandle,
    pub image: ImageHandle,
    pub view: ViewHandle,
    pub extent: Extent2D,
    pub format: PixelFormat,
    pub render_pass: RenderPassHandle,
    /// Chain generation the target belongs to
    pub generation: u64,
}

/// Emits drawing commands into a command buffer that is already recording
///
/// Must not block, must not submit, and must finish before returning. The
/// pacer ends the command buffer afterwards.
///
/// Implemented for any `FnMut(&RecordTarget, CommandBufferHandle)`.
pub trait RecordCallback {
    fn record(&mut self, target: &RecordTarget, command_buffer: CommandBufferHandle);
}

impl<F> RecordCallback for F
where
    F: FnMut(&RecordTarget, CommandBufferHandle),
{
    fn record(&mut self, target: &RecordTarget, command_buffer: CommandBufferHandle) {
        self(target, command_buffer)
    }
}
