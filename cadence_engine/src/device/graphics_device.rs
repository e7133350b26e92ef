/// GraphicsDevice trait - the graphics queue side of the frame pacer
///
/// A backend exposes exactly one graphics-capable submission queue. All
/// methods take `&self`: backends keep their own interior state and the
/// pacer is the single control thread issuing calls.

use crate::error::Result;
use crate::device::{
    CommandBufferHandle, CommandPoolHandle, Extent2D, GateHandle, ImageHandle, PixelFormat,
    RenderPassHandle, RenderTargetHandle, SignalHandle, ViewHandle,
};

/// One graphics queue submission
///
/// Waits on `wait` before color-attachment output, then signals `signal`
/// on the GPU and `gate` for the host once the command buffer retires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub command_buffer: CommandBufferHandle,
    pub wait: SignalHandle,
    pub signal: SignalHandle,
    pub gate: GateHandle,
}

/// Graphics device abstraction
///
/// Implemented by backend-specific devices (e.g., VulkanDevice).
pub trait GraphicsDevice: Send + Sync {
    // ===== GATES (host-waitable) =====

    /// Create a gate, optionally already signaled
    fn create_gate(&self, signaled: bool) -> Result<GateHandle>;

    fn destroy_gate(&self, gate: GateHandle);

    /// Non-blocking status query (true = signaled)
    fn gate_status(&self, gate: GateHandle) -> Result<bool>;

    /// Block until every gate is signaled (no timeout)
    fn wait_gates(&self, gates: &[GateHandle]) -> Result<()>;

    /// Return gates to the unsignaled state
    fn reset_gates(&self, gates: &[GateHandle]) -> Result<()>;

    // ===== SIGNALS (GPU-to-GPU) =====

    fn create_signal(&self) -> Result<SignalHandle>;

    fn destroy_signal(&self, signal: SignalHandle);

    // ===== COMMAND BUFFERS =====

    /// Create a pool whose buffers can be reset individually
    fn create_command_pool(&self) -> Result<CommandPoolHandle>;

    /// Destroy a pool and every buffer allocated from it
    fn destroy_command_pool(&self, pool: CommandPoolHandle);

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolHandle,
        count: usize,
    ) -> Result<Vec<CommandBufferHandle>>;

    /// Reset the buffer and begin one-time-submit recording
    ///
    /// The caller guarantees the buffer's previous submission has retired.
    fn begin_commands(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn end_commands(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    // ===== PRESENTABLE IMAGE RESOURCES =====

    /// Create a 2D color view of a presentable image
    fn create_image_view(&self, image: ImageHandle, format: PixelFormat) -> Result<ViewHandle>;

    fn destroy_image_view(&self, view: ViewHandle);

    /// Create a render target binding `view` to `render_pass`
    fn create_render_target(
        &self,
        render_pass: RenderPassHandle,
        view: ViewHandle,
        extent: Extent2D,
    ) -> Result<RenderTargetHandle>;

    fn destroy_render_target(&self, target: RenderTargetHandle);

    // ===== QUEUE =====

    /// Submit one command buffer on the graphics queue
    fn submit(&self, submission: &Submission) -> Result<()>;

    /// Block until the device has retired all submitted work
    fn wait_idle(&self) -> Result<()>;
}
