/// Frame pacer configuration

use crate::error::{Error, Result};
use crate::device::{ColorSpace, PixelFormat, PresentMode, SurfaceFormat};

/// Frame pacer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of frames that may be in flight at once (ring depth N)
    pub frames_in_flight: usize,
    /// Requested presentable image count (raised to the surface minimum)
    pub desired_image_count: u32,
    /// Surface formats in order of preference
    pub preferred_formats: Vec<SurfaceFormat>,
    /// Present modes in order of preference (Fifo is the fallback)
    pub preferred_present_modes: Vec<PresentMode>,
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            desired_image_count: 2,
            preferred_formats: vec![SurfaceFormat::new(
                PixelFormat::B8G8R8A8_UNORM,
                ColorSpace::SrgbNonlinear,
            )],
            preferred_present_modes: vec![PresentMode::Fifo],
            enable_validation: cfg!(debug_assertions),
            app_name: "Cadence Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

impl Config {
    /// Reject values the pacer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::Configuration(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.desired_image_count == 0 {
            return Err(Error::Configuration(
                "desired_image_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
