/// VulkanSurface - Vulkan implementation of the PresentationSurface trait
///
/// Wraps the context's window surface and the swapchain extension. Swapchain
/// handles are raw `vk::SwapchainKHR` values.

use ash::vk;
use ash::vk::Handle;
use cadence_engine::cadence::Result;
use cadence_engine::cadence::device::{
    AcquireOutcome, Extent2D, ImageHandle, PresentOutcome, PresentationSurface, SignalHandle,
    SurfaceCapabilities, SurfaceFormat, SwapchainDesc, SwapchainHandle,
};
use cadence_engine::engine_debug;
use std::sync::Arc;
use winit::window::Window;

use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{
    color_space_from_vk, color_space_to_vk, current_extent_from_vk, extent_from_vk, extent_to_vk,
    format_from_vk, format_to_vk, present_mode_from_vk, present_mode_to_vk, vk_error,
};

/// Presentation side of a Vulkan context, bound to one window
pub struct VulkanSurface {
    context: Arc<VulkanContext>,
    window: Arc<Window>,
}

impl VulkanSurface {
    /// `window` must be the window the context's surface was created for
    pub fn new(context: Arc<VulkanContext>, window: Arc<Window>) -> Self {
        Self { context, window }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn raw_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_capabilities(
                    self.context.physical_device,
                    self.context.surface,
                )
                .map_err(|e| vk_error("Failed to get surface capabilities", e))
        }
    }
}

fn composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::INHERIT,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|&flag| supported.contains(flag))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

impl PresentationSurface for VulkanSurface {
    fn capabilities(&self) -> Result<SurfaceCapabilities> {
        let caps = self.raw_capabilities()?;
        let (formats, modes) = unsafe {
            let loader = &self.context.surface_loader;
            let formats = loader
                .get_physical_device_surface_formats(self.context.physical_device, self.context.surface)
                .map_err(|e| vk_error("Failed to query surface formats", e))?;
            let modes = loader
                .get_physical_device_surface_present_modes(
                    self.context.physical_device,
                    self.context.surface,
                )
                .map_err(|e| vk_error("Failed to query present modes", e))?;
            (formats, modes)
        };

        Ok(SurfaceCapabilities {
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            current_extent: current_extent_from_vk(caps.current_extent),
            min_extent: extent_from_vk(caps.min_image_extent),
            max_extent: extent_from_vk(caps.max_image_extent),
            formats: formats
                .iter()
                .filter_map(|f| {
                    Some(SurfaceFormat::new(
                        format_from_vk(f.format)?,
                        color_space_from_vk(f.color_space)?,
                    ))
                })
                .collect(),
            present_modes: modes.into_iter().filter_map(present_mode_from_vk).collect(),
        })
    }

    fn drawable_extent(&self) -> Extent2D {
        if self.window.is_minimized() == Some(true) {
            return Extent2D::default();
        }
        let size = self.window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: Option<SwapchainHandle>,
    ) -> Result<SwapchainHandle> {
        let caps = self.raw_capabilities()?;
        let families = [
            self.context.graphics_queue_family,
            self.context.present_queue_family,
        ];
        let old_swapchain = old
            .map(|handle| vk::SwapchainKHR::from_raw(handle.0))
            .unwrap_or_else(vk::SwapchainKHR::null);

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.context.surface)
            .min_image_count(desc.image_count)
            .image_format(format_to_vk(desc.format.format))
            .image_color_space(color_space_to_vk(desc.format.color_space))
            .image_extent(extent_to_vk(desc.extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(caps.current_transform)
            .composite_alpha(composite_alpha(caps.supported_composite_alpha))
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain);
        create_info = if families[0] == families[1] {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        };

        let swapchain = unsafe {
            self.context
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| vk_error("Failed to create swapchain", e))?
        };
        engine_debug!(
            "cadence::vulkan",
            "Created swapchain: {} images {}x{} ({:?}, {:?})",
            desc.image_count,
            desc.extent.width,
            desc.extent.height,
            desc.format.format,
            desc.present_mode
        );
        Ok(SwapchainHandle(swapchain.as_raw()))
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let images = unsafe {
            self.context
                .swapchain_loader
                .get_swapchain_images(vk::SwapchainKHR::from_raw(swapchain.0))
                .map_err(|e| vk_error("Failed to get swapchain images", e))?
        };
        Ok(images.into_iter().map(|image| ImageHandle(image.as_raw())).collect())
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        unsafe {
            self.context
                .swapchain_loader
                .destroy_swapchain(vk::SwapchainKHR::from_raw(swapchain.0), None);
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SignalHandle,
    ) -> Result<AcquireOutcome> {
        let acquired = unsafe {
            self.context.swapchain_loader.acquire_next_image(
                vk::SwapchainKHR::from_raw(swapchain.0),
                u64::MAX,
                vk::Semaphore::from_raw(signal.0),
                vk::Fence::null(),
            )
        };
        match acquired {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(vk_error("Failed to acquire next swapchain image", e)),
        }
    }

    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SignalHandle,
    ) -> Result<PresentOutcome> {
        let swapchains = [vk::SwapchainKHR::from_raw(swapchain.0)];
        let image_indices = [image_index];
        let wait_semaphores = [vk::Semaphore::from_raw(wait.0)];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = {
            let _queues = self.context.lock_queues();
            unsafe {
                self.context
                    .swapchain_loader
                    .queue_present(self.context.present_queue, &present_info)
            }
        };
        match presented {
            Ok(false) => Ok(PresentOutcome::Optimal),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(vk_error("Failed to present swapchain image", e)),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_surface_tests.rs"]
mod tests;
