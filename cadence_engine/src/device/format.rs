/// Surface description types - formats, present modes, extents, capabilities

/// Pixel format of presentable images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PixelFormat {
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    A2B10G10R10_UNORM,
}

impl PixelFormat {
    /// Returns true if the hardware applies sRGB encoding on write
    pub fn is_srgb(&self) -> bool {
        matches!(self, PixelFormat::B8G8R8A8_SRGB | PixelFormat::R8G8B8A8_SRGB)
    }
}

/// Color space the presentation engine interprets images in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
}

/// Format + color space pair supported by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: PixelFormat,
    pub color_space: ColorSpace,
}

impl SurfaceFormat {
    pub const fn new(format: PixelFormat, color_space: ColorSpace) -> Self {
        Self { format, color_space }
    }
}

/// Presentation mode of the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, may tear
    Immediate,
    /// Triple-buffered vsync, latest image wins
    Mailbox,
    /// Vsync queue (always supported)
    Fifo,
    /// Vsync, tears when a frame is late
    FifoRelaxed,
}

/// 2D extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-area extent (e.g., minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp each dimension to `[min, max]`
    pub fn clamp(&self, min: Extent2D, max: Extent2D) -> Extent2D {
        Extent2D {
            width: self.width.max(min.width).min(max.width),
            height: self.height.max(min.height).min(max.height),
        }
    }
}

/// What a surface supports right now
///
/// Re-queried on every chain build: the values change with the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// Minimum number of presentable images
    pub min_image_count: u32,
    /// Maximum number of presentable images (0 = unbounded)
    pub max_image_count: u32,
    /// Extent imposed by the surface, if any
    pub current_extent: Option<Extent2D>,
    pub min_extent: Extent2D,
    pub max_extent: Extent2D,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
