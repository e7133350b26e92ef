/// PresentationSurface trait - the window surface and its present queue

use crate::error::Result;
use crate::device::{
    Extent2D, ImageHandle, PresentMode, SignalHandle, SurfaceCapabilities, SurfaceFormat,
    SwapchainHandle,
};

/// Descriptor for creating a swapchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub image_count: u32,
    pub format: SurfaceFormat,
    pub extent: Extent2D,
    pub present_mode: PresentMode,
}

/// Result of asking the presentation engine for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; `suboptimal` means it is usable but the chain
    /// no longer matches the surface exactly
    Acquired { image_index: u32, suboptimal: bool },
    /// The chain can no longer present to this surface
    OutOfDate,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// Presentation surface abstraction
///
/// Implemented by backend-specific surfaces (e.g., VulkanSurface). The
/// present queue may be the same queue as the device's graphics queue.
pub trait PresentationSurface: Send + Sync {
    /// Query what the surface supports right now
    ///
    /// # Errors
    ///
    /// `Error::SurfaceLost` if the surface was destroyed externally.
    fn capabilities(&self) -> Result<SurfaceCapabilities>;

    /// Size of the drawable area in pixels (zero when minimized)
    fn drawable_extent(&self) -> Extent2D;

    /// Create a swapchain, retiring `old` if given
    ///
    /// `old` stays valid until the caller destroys it.
    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: Option<SwapchainHandle>,
    ) -> Result<SwapchainHandle>;

    /// Images owned by the swapchain, in presentation-engine index order
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>>;

    fn destroy_swapchain(&self, swapchain: SwapchainHandle);

    /// Acquire the next presentable image (no timeout)
    ///
    /// `signal` is signaled on the GPU once the image is really available.
    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SignalHandle,
    ) -> Result<AcquireOutcome>;

    /// Queue `image_index` for presentation once `wait` is signaled
    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SignalHandle,
    ) -> Result<PresentOutcome>;
}
