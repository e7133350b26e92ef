/// PresentableChain - the swapchain and everything derived from its images
///
/// A chain is built wholesale and destroyed wholesale. Each rebuild yields a
/// new generation; the previous one is handed back to `build` so the new
/// swapchain can retire it, and is released once the attempt is over.

use crate::config::Config;
use crate::device::{
    Extent2D, GraphicsDevice, ImageHandle, PresentMode, PresentationSurface, RenderPassHandle,
    RenderTargetHandle, SurfaceCapabilities, SurfaceFormat, SwapchainDesc, SwapchainHandle,
    ViewHandle,
};
use crate::error::{Error, Result};
use crate::{engine_debug, engine_warn};

/// Presentable images with one view and one render target per image
///
/// `images`, `views` and `targets` always have the same length; extent and
/// format are uniform across a generation.
#[derive(Debug)]
pub struct PresentableChain {
    swapchain: SwapchainHandle,
    images: Vec<ImageHandle>,
    views: Vec<ViewHandle>,
    targets: Vec<RenderTargetHandle>,
    extent: Extent2D,
    format: SurfaceFormat,
    present_mode: PresentMode,
    generation: u64,
}

impl PresentableChain {
    /// Build a chain for the surface's current state
    ///
    /// # Arguments
    ///
    /// * `render_pass` - Pass the render targets must be compatible with
    /// * `previous` - Chain being replaced; retired by the new swapchain and
    ///   destroyed after the attempt, whether it succeeds or not. The caller
    ///   must have drained the device.
    ///
    /// # Errors
    ///
    /// * `SurfaceLost` - the surface is gone
    /// * `Configuration` - no usable format, present mode or extent
    /// * Any creation error from the device or surface; partially built
    ///   objects are released first
    pub fn build<D, S>(
        device: &D,
        surface: &S,
        config: &Config,
        render_pass: RenderPassHandle,
        previous: Option<PresentableChain>,
    ) -> Result<Self>
    where
        D: GraphicsDevice + ?Sized,
        S: PresentationSurface + ?Sized,
    {
        let generation = previous.as_ref().map_or(1, |chain| chain.generation + 1);
        let old_swapchain = previous.as_ref().map(|chain| chain.swapchain);

        let result = Self::create(device, surface, config, render_pass, old_swapchain, generation);

        if let Some(previous) = previous {
            previous.destroy(device, surface);
        }

        let chain = result?;
        engine_debug!(
            "cadence::PresentableChain",
            "Built generation {} ({} images, {}x{}, {:?}, {:?})",
            chain.generation,
            chain.images.len(),
            chain.extent.width,
            chain.extent.height,
            chain.format.format,
            chain.present_mode
        );
        Ok(chain)
    }

    fn create<D, S>(
        device: &D,
        surface: &S,
        config: &Config,
        render_pass: RenderPassHandle,
        old_swapchain: Option<SwapchainHandle>,
        generation: u64,
    ) -> Result<Self>
    where
        D: GraphicsDevice + ?Sized,
        S: PresentationSurface + ?Sized,
    {
        let caps = surface.capabilities()?;
        let format = Self::select_format(&caps, config)?;
        let present_mode = Self::select_present_mode(&caps, config)?;
        let image_count = Self::select_image_count(&caps, config);
        let extent = Self::select_extent(&caps, surface.drawable_extent())?;

        let desc = SwapchainDesc { image_count, format, extent, present_mode };
        let swapchain = surface.create_swapchain(&desc, old_swapchain)?;

        let mut chain = PresentableChain {
            swapchain,
            images: Vec::new(),
            views: Vec::new(),
            targets: Vec::new(),
            extent,
            format,
            present_mode,
            generation,
        };

        match chain.populate(device, surface, render_pass) {
            Ok(()) => Ok(chain),
            Err(e) => {
                chain.destroy(device, surface);
                Err(e)
            }
        }
    }

    /// Create one view and one render target per swapchain image
    fn populate<D, S>(&mut self, device: &D, surface: &S, render_pass: RenderPassHandle) -> Result<()>
    where
        D: GraphicsDevice + ?Sized,
        S: PresentationSurface + ?Sized,
    {
        let images = surface.swapchain_images(self.swapchain)?;
        self.views.reserve(images.len());
        self.targets.reserve(images.len());

        for &image in &images {
            let view = device.create_image_view(image, self.format.format)?;
            self.views.push(view);
            let target = device.create_render_target(render_pass, view, self.extent)?;
            self.targets.push(target);
        }

        self.images = images;
        Ok(())
    }

    /// Release render targets, then views, then the swapchain
    ///
    /// The caller must have drained the device.
    pub fn destroy<D, S>(self, device: &D, surface: &S)
    where
        D: GraphicsDevice + ?Sized,
        S: PresentationSurface + ?Sized,
    {
        for target in self.targets {
            device.destroy_render_target(target);
        }
        for view in self.views {
            device.destroy_image_view(view);
        }
        if !self.swapchain.is_null() {
            surface.destroy_swapchain(self.swapchain);
        }
    }

    // ===== CAPABILITY SELECTION =====

    /// First preferred format the surface supports, else the surface's first format
    pub fn select_format(caps: &SurfaceCapabilities, config: &Config) -> Result<SurfaceFormat> {
        let Some(&fallback) = caps.formats.first() else {
            return Err(Error::Configuration(
                "surface reports no supported formats".to_string(),
            ));
        };

        if let Some(&format) = config
            .preferred_formats
            .iter()
            .find(|format| caps.formats.contains(*format))
        {
            return Ok(format);
        }

        engine_warn!(
            "cadence::PresentableChain",
            "No preferred surface format supported, falling back to {:?} / {:?}",
            fallback.format,
            fallback.color_space
        );
        Ok(fallback)
    }

    /// First preferred present mode the surface supports, else Fifo
    pub fn select_present_mode(caps: &SurfaceCapabilities, config: &Config) -> Result<PresentMode> {
        config
            .preferred_present_modes
            .iter()
            .copied()
            .find(|mode| caps.present_modes.contains(mode))
            .or_else(|| caps.present_modes.contains(&PresentMode::Fifo).then_some(PresentMode::Fifo))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no usable present mode (surface supports {:?})",
                    caps.present_modes
                ))
            })
    }

    /// Desired count raised to the surface minimum, clamped to its maximum
    pub fn select_image_count(caps: &SurfaceCapabilities, config: &Config) -> u32 {
        let count = config.desired_image_count.max(caps.min_image_count);
        if caps.max_image_count > 0 {
            count.min(caps.max_image_count)
        } else {
            count
        }
    }

    /// Surface-imposed extent, else the drawable extent clamped to the surface limits
    pub fn select_extent(caps: &SurfaceCapabilities, drawable: Extent2D) -> Result<Extent2D> {
        let extent = match caps.current_extent {
            Some(extent) => extent,
            None => drawable.clamp(caps.min_extent, caps.max_extent),
        };
        if extent.is_empty() {
            return Err(Error::Configuration(format!(
                "zero-area swapchain extent {}x{}",
                extent.width, extent.height
            )));
        }
        Ok(extent)
    }

    // ===== ACCESSORS =====

    pub fn swapchain(&self) -> SwapchainHandle {
        self.swapchain
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    pub fn views(&self) -> &[ViewHandle] {
        &self.views
    }

    pub fn render_targets(&self) -> &[RenderTargetHandle] {
        &self.targets
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    /// 1 for the initial build, +1 per rebuild
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[path = "presentable_chain_tests.rs"]
mod tests;
