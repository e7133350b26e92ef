/*!
# Cadence - Vulkan Backend

Vulkan implementation of the Cadence device and presentation traits.

`VulkanContext` owns the instance, device, queues and window surface.
`VulkanDevice` implements `GraphicsDevice` (fences as gates, semaphores as
signals) and `VulkanSurface` implements `PresentationSurface` on top of
`VK_KHR_swapchain`. Both share the context through an `Arc`, so the context
outlives every object created from it.

Validation layer support is compiled in only with the `vulkan-validation`
feature.
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_format;
mod vulkan_surface;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

pub use vulkan_context::VulkanContext;
pub use vulkan_device::VulkanDevice;
pub use vulkan_surface::VulkanSurface;

#[cfg(feature = "vulkan-validation")]
pub use vulkan_debug::{print_validation_stats_report, validation_stats, ValidationStats};
