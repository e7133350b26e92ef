/// Conversions between engine types and Vulkan types

use ash::vk;
use cadence_engine::cadence::Error;
use cadence_engine::cadence::device::{ColorSpace, Extent2D, PixelFormat, PresentMode};
use cadence_engine::engine_error;

pub(crate) fn format_to_vk(format: PixelFormat) -> vk::Format {
    match format {
        PixelFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        PixelFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        PixelFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        PixelFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        PixelFormat::A2B10G10R10_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
    }
}

/// None for formats the engine does not present to
pub(crate) fn format_from_vk(format: vk::Format) -> Option<PixelFormat> {
    match format {
        vk::Format::B8G8R8A8_UNORM => Some(PixelFormat::B8G8R8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(PixelFormat::B8G8R8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(PixelFormat::R8G8B8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(PixelFormat::R8G8B8A8_SRGB),
        vk::Format::A2B10G10R10_UNORM_PACK32 => Some(PixelFormat::A2B10G10R10_UNORM),
        _ => None,
    }
}

pub(crate) fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

pub(crate) fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> Option<ColorSpace> {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => Some(ColorSpace::SrgbNonlinear),
        _ => None,
    }
}

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

pub(crate) fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

pub(crate) fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

pub(crate) fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

/// `current_extent` of (u32::MAX, u32::MAX) means the swapchain decides
pub(crate) fn current_extent_from_vk(extent: vk::Extent2D) -> Option<Extent2D> {
    if extent.width == u32::MAX && extent.height == u32::MAX {
        None
    } else {
        Some(extent_from_vk(extent))
    }
}

/// Classify a Vulkan failure into the engine error taxonomy
pub(crate) fn classify_vk_error(what: &str, result: vk::Result) -> Error {
    let message = format!("{}: {:?}", what, result);
    match result {
        vk::Result::ERROR_SURFACE_LOST_KHR => Error::SurfaceLost(message),
        vk::Result::ERROR_OUT_OF_HOST_MEMORY
        | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
        | vk::Result::ERROR_TOO_MANY_OBJECTS => Error::ResourceExhaustion(message),
        _ => Error::BackendError(message),
    }
}

/// `classify_vk_error`, logged at error level
pub(crate) fn vk_error(what: &str, result: vk::Result) -> Error {
    engine_error!("cadence::vulkan", "{}: {:?}", what, result);
    classify_vk_error(what, result)
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
