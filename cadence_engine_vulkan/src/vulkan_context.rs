/// VulkanContext - instance, window surface, logical device and queues
///
/// Shared (via `Arc`) by `VulkanDevice` and `VulkanSurface`. The last owner
/// to drop destroys the device, the surface and the instance, so every
/// object created through either side must be released before that.

use ash::vk;
use cadence_engine::cadence::{Config, Error, Result};
use cadence_engine::{engine_debug, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CString};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::vulkan_format::vk_error;

pub struct VulkanContext {
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    /// Present queue (may be the graphics queue)
    pub(crate) present_queue: vk::Queue,
    pub(crate) present_queue_family: u32,
    /// Serializes queue submission and presentation
    queue_lock: Mutex<()>,

    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

/// Queue families chosen for one physical device
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

impl VulkanContext {
    /// Create the instance, a surface for `window` and a device that can
    /// render and present to it
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if any bootstrap step fails. Everything
    /// created before the failure is destroyed.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("cadence::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let validation = Self::validation_enabled(config);
            let instance = Self::create_instance(&entry, window, config, validation)?;

            let (debug_utils_loader, debug_messenger) = if validation {
                match Self::create_debug_messenger(&entry, &instance) {
                    Ok((loader, messenger)) => (Some(loader), Some(messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                (None, None)
            };

            let destroy_instance = |instance: &ash::Instance| {
                if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                    loader.destroy_debug_utils_messenger(messenger, None);
                }
                instance.destroy_instance(None);
            };

            let surface = match Self::create_surface(&entry, &instance, window) {
                Ok(surface) => surface,
                Err(e) => {
                    destroy_instance(&instance);
                    return Err(e);
                }
            };
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let picked = Self::pick_physical_device(&instance, &surface_loader, surface).and_then(
                |(physical_device, families)| {
                    Self::create_device(&instance, physical_device, &families)
                        .map(|device| (physical_device, families, device))
                },
            );
            let (physical_device, families, device) = match picked {
                Ok(picked) => picked,
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    destroy_instance(&instance);
                    return Err(e);
                }
            };

            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let present_queue = device.get_device_queue(families.present, 0);
            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let properties = instance.get_physical_device_properties(physical_device);
            let name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown".to_string());
            engine_info!(
                "cadence::vulkan",
                "Vulkan device '{}' (graphics family {}, present family {}, validation {})",
                name,
                families.graphics,
                families.present,
                if validation { "on" } else { "off" }
            );

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family: families.graphics,
                present_queue,
                present_queue_family: families.present,
                queue_lock: Mutex::new(()),
                surface,
                surface_loader,
                swapchain_loader,
                debug_utils_loader,
                debug_messenger,
            })
        }
    }

    #[cfg(feature = "vulkan-validation")]
    fn validation_enabled(config: &Config) -> bool {
        config.enable_validation
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn validation_enabled(config: &Config) -> bool {
        if config.enable_validation {
            engine_warn!(
                "cadence::vulkan",
                "Validation requested but the vulkan-validation feature is disabled"
            );
        }
        false
    }

    unsafe fn create_instance<W: HasDisplayHandle>(
        entry: &ash::Entry,
        window: &W,
        config: &Config,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
            Error::InitializationFailed(format!("Invalid application name: {}", e))
        })?;
        let (major, minor, patch) = config.app_version;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(c"Cadence")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let display_handle = window.display_handle().map_err(|e| {
            engine_error!("cadence::vulkan", "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let mut extension_names: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("cadence::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

        let layer_names: Vec<*const c_char> = if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            Vec::new()
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        entry.create_instance(&create_info, None).map_err(|e| {
            engine_error!("cadence::vulkan", "Failed to create Vulkan instance: {:?}", e);
            Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
        })
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let messenger = loader
            .create_debug_utils_messenger(&crate::vulkan_debug::messenger_create_info(), None)
            .map_err(|e| {
                engine_error!("cadence::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;
        Ok((loader, messenger))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        Err(Error::InitializationFailed(
            "debug messenger requires the vulkan-validation feature".to_string(),
        ))
    }

    unsafe fn create_surface<W: HasDisplayHandle + HasWindowHandle>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
    ) -> Result<vk::SurfaceKHR> {
        let display_handle = window.display_handle().map_err(|e| {
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!("cadence::vulkan", "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;
        ash_window::create_surface(
            entry,
            instance,
            display_handle.as_raw(),
            window_handle.as_raw(),
            None,
        )
        .map_err(|e| {
            engine_error!("cadence::vulkan", "Failed to create surface: {:?}", e);
            Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })
    }

    /// First device with a graphics queue and a queue that can present to
    /// `surface`, discrete GPUs first
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let mut physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("cadence::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;
        physical_devices.sort_by_key(|&pd| {
            let kind = instance.get_physical_device_properties(pd).device_type;
            kind != vk::PhysicalDeviceType::DISCRETE_GPU
        });

        for physical_device in physical_devices {
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let graphics = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32);
            let supports_present = |i: u32| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            };
            let Some(graphics) = graphics else {
                continue;
            };
            // Prefer presenting from the graphics family
            let present = if supports_present(graphics) {
                Some(graphics)
            } else {
                (0..queue_families.len() as u32).find(|&i| supports_present(i))
            };
            if let Some(present) = present {
                return Ok((physical_device, QueueFamilies { graphics, present }));
            }
            engine_debug!("cadence::vulkan", "Skipping device without present support");
        }

        engine_error!("cadence::vulkan", "No Vulkan device can render and present to this surface");
        Err(Error::InitializationFailed(
            "No Vulkan device can render and present to this surface".to_string(),
        ))
    }

    unsafe fn create_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: &QueueFamilies,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(families.graphics)
            .queue_priorities(&queue_priorities)];
        if families.present != families.graphics {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(families.present)
                    .queue_priorities(&queue_priorities),
            );
        }

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names);

        instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| {
                engine_error!("cadence::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })
    }

    /// Hold while touching a queue
    pub(crate) fn lock_queues(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> Result<()> {
        let _queues = self.lock_queues();
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| vk_error("Failed to wait for device idle", e))
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            if let (Some(loader), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
