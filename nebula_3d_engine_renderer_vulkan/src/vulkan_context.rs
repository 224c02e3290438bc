/// DeviceContext - Vulkan instance, physical/logical device, queue, command pool, allocator
///
/// Bring-up runs in two phases. `construct` creates everything that does not
/// need a window (instance, debug messenger, physical device choice, MSAA
/// limits); the window-dependent phase creates a surface, picks the surface
/// format and a queue family that can both draw and present to it, then
/// creates the logical device, the command pool and the memory allocator.
///
/// Teardown runs in strict reverse order: allocator, command pool, device,
/// debug messenger, instance.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use nebula_3d_engine::nebula3d::{Error, Result};
use nebula_3d_engine::nebula3d::render::{
    choose_msaa, find_depth_format, max_usable_sample_count, select_physical_device,
    select_surface_format, Config, DeviceType, SampleCount, SurfaceFormat, SurfaceFormatChoice, TextureFormat,
    WindowSource,
};
use nebula_3d_engine::{engine_debug, engine_error, engine_info, engine_warn};
use std::ffi::CString;
use std::mem::ManuallyDrop;

use crate::vulkan_format::{texture_format_to_vk, vk_to_device_type, vk_to_surface_format};

const SOURCE: &str = "nebula3d::vulkan::DeviceContext";

/// Validation support is compiled in for debug builds or with the feature
const VALIDATION_AVAILABLE: bool = cfg!(any(debug_assertions, feature = "vulkan-validation"));

fn init_failed(what: &str, e: impl std::fmt::Debug) -> Error {
    init_error(format!("{}: {:?}", what, e))
}

fn init_error(message: String) -> Error {
    engine_error!(SOURCE, "{}", message);
    Error::InitializationFailed(message)
}

/// Window-independent part of the context
struct InstanceContext {
    entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    features: vk::PhysicalDeviceFeatures,
    max_sample_count: SampleCount,
    sample_count: SampleCount,
}

/// Results of the window-dependent queries
struct WindowArguments {
    surface_format: SurfaceFormat,
    queue_family_index: u32,
}

/// Owner of the Vulkan instance and logical device
pub struct DeviceContext {
    entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    features: vk::PhysicalDeviceFeatures,
    max_sample_count: SampleCount,
    sample_count: SampleCount,
    surface_format: SurfaceFormat,
    /// Surface created during bring-up, handed out by the first `create_surface`
    bring_up_surface: Option<vk::SurfaceKHR>,
    queue_family_index: u32,
    queue: vk::Queue,
    device: ash::Device,
    command_pool: vk::CommandPool,
    allocator: ManuallyDrop<Allocator>,
    wide_lines: bool,
}

impl DeviceContext {
    /// Bring up Vulkan for `window`
    ///
    /// Any failure here is an environment problem (no GPU, driver too old,
    /// missing extension) and is reported as `Error::InitializationFailed`.
    pub fn new(window: &dyn WindowSource, config: &Config) -> Result<Self> {
        unsafe {
            let base = Self::construct(window, config)?;
            let surface_loader = ash::khr::surface::Instance::new(&base.entry, &base.instance);
            let surface = create_window_surface(&base.entry, &base.instance, window)?;
            let window_args = Self::initialize_window_arguments(&base, &surface_loader, surface)?;
            let (device, wide_lines) = Self::create_device(&base, window_args.queue_family_index)?;
            let queue = device.get_device_queue(window_args.queue_family_index, 0);
            let command_pool = Self::create_command_pool(&device, window_args.queue_family_index)?;
            let allocator = Self::create_allocator(&base, &device)?;
            let swapchain_loader = ash::khr::swapchain::Device::new(&base.instance, &device);

            engine_info!(SOURCE, "Device context ready ({}x MSAA, surface format {:?})",
                base.sample_count.count(), window_args.surface_format.format);

            Ok(Self {
                entry: base.entry,
                instance: base.instance,
                debug_utils: base.debug_utils,
                surface_loader,
                swapchain_loader,
                physical_device: base.physical_device,
                properties: base.properties,
                features: base.features,
                max_sample_count: base.max_sample_count,
                sample_count: base.sample_count,
                surface_format: window_args.surface_format,
                bring_up_surface: Some(surface),
                queue_family_index: window_args.queue_family_index,
                queue,
                device,
                command_pool,
                allocator: ManuallyDrop::new(allocator),
                wide_lines,
            })
        }
    }

    /// Instance, debug messenger and physical device selection
    unsafe fn construct(window: &dyn WindowSource, config: &Config) -> Result<InstanceContext> {
        let entry = ash::Entry::load()
            .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

        let app_name = CString::new(config.app_name.as_str())
            .map_err(|e| init_failed("Invalid application name", e))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Nebula3D")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let display_handle = window.display_handle()
            .map_err(|e| init_failed("Failed to get display handle", e))?;
        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| init_failed("Failed to get required surface extensions", e))?
            .to_vec();

        let validation = config.enable_validation && VALIDATION_AVAILABLE;
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }
        let layer_names = if validation {
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = entry.create_instance(&create_info, None)
            .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;

        let debug_utils = if validation {
            Some(Self::create_debug_messenger(&entry, &instance, config)?)
        } else {
            None
        };

        let physical_devices = instance.enumerate_physical_devices()
            .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;
        let device_types: Vec<_> = physical_devices
            .iter()
            .map(|&pd| vk_to_device_type(instance.get_physical_device_properties(pd).device_type))
            .collect();
        let index = select_physical_device(&device_types)
            .ok_or_else(|| init_error("No Vulkan-capable GPU found".to_string()))?;
        let physical_device = physical_devices[index];

        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        let device_name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unnamed>".to_string());
        if device_types[index] != DeviceType::DiscreteGpu {
            engine_warn!(SOURCE, "No discrete GPU found, falling back to device 0");
        }
        engine_info!(SOURCE, "Selected GPU {} ({:?}) out of {}",
            device_name, device_types[index], device_types.len());

        let max_sample_count = max_usable_sample_count(
            properties.limits.framebuffer_color_sample_counts.as_raw(),
            properties.limits.framebuffer_depth_sample_counts.as_raw(),
        );
        let sample_count = choose_msaa(config.preferred_sample_count, max_sample_count);
        engine_debug!(SOURCE, "Max usable sample count {}x, using {}x",
            max_sample_count.count(), sample_count.count());

        Ok(InstanceContext {
            entry,
            instance,
            debug_utils,
            physical_device,
            properties,
            features,
            max_sample_count,
            sample_count,
        })
    }

    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        let debug_config = crate::debug::Config {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.debug_message_filter,
            break_on_error: config.break_on_validation_error,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
            benign_message_ids: config.benign_message_ids.clone(),
        };
        let severity_flags = debug_config.severity_flags();
        crate::debug::init_debug_config(debug_config);

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity_flags)
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils.create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| init_failed("Failed to create debug messenger", e))?;

        Ok((debug_utils, messenger))
    }

    /// Surface format and graphics+present queue family for `surface`
    unsafe fn initialize_window_arguments(
        base: &InstanceContext,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<WindowArguments> {
        let formats: Vec<SurfaceFormat> = surface_loader
            .get_physical_device_surface_formats(base.physical_device, surface)
            .map_err(|e| init_failed("Failed to query surface formats", e))?
            .iter()
            .map(vk_to_surface_format)
            .collect();

        let surface_format = match select_surface_format(&formats) {
            Some(SurfaceFormatChoice::Preferred(format)) => format,
            Some(SurfaceFormatChoice::Fallback(format)) => {
                engine_warn!(SOURCE,
                    "No preferred surface format available, falling back to {:?}", format.format);
                format
            }
            None => {
                return Err(init_error("Surface exposes no formats".to_string()));
            }
        };

        let queue_families = base.instance
            .get_physical_device_queue_family_properties(base.physical_device);
        let mut queue_family_index = None;
        for (index, family) in queue_families.iter().enumerate() {
            let index = index as u32;
            if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                continue;
            }
            let present = surface_loader
                .get_physical_device_surface_support(base.physical_device, index, surface)
                .map_err(|e| init_failed("Failed to query present support", e))?;
            if present {
                queue_family_index = Some(index);
                break;
            }
        }
        let queue_family_index = queue_family_index.ok_or_else(|| {
            init_error("No queue family supports both graphics and present".to_string())
        })?;

        engine_debug!(SOURCE, "Using queue family {}", queue_family_index);

        Ok(WindowArguments {
            surface_format,
            queue_family_index,
        })
    }

    /// Logical device with swapchain + synchronization2, wide lines when supported
    unsafe fn create_device(base: &InstanceContext, queue_family_index: u32) -> Result<(ash::Device, bool)> {
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)];

        let available_extensions = base.instance
            .enumerate_device_extension_properties(base.physical_device)
            .map_err(|e| init_failed("Failed to enumerate device extensions", e))?;
        let has_extension = |name: &std::ffi::CStr| {
            available_extensions
                .iter()
                .any(|ext| ext.extension_name_as_c_str().map(|n| n == name).unwrap_or(false))
        };

        if !has_extension(ash::khr::swapchain::NAME) {
            return Err(init_error("VK_KHR_swapchain is not supported".to_string()));
        }
        let mut device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
        let synchronization2 = has_extension(ash::khr::synchronization2::NAME);
        if synchronization2 {
            device_extension_names.push(ash::khr::synchronization2::NAME.as_ptr());
        }

        let wide_lines = base.features.wide_lines == vk::TRUE;
        if !wide_lines {
            engine_warn!(SOURCE, "Wide lines not supported, line widths above 1.0 will be clamped");
        }
        let device_features = vk::PhysicalDeviceFeatures::default()
            .wide_lines(wide_lines)
            .sampler_anisotropy(base.features.sampler_anisotropy == vk::TRUE);

        let mut sync2_features = vk::PhysicalDeviceSynchronization2Features::default()
            .synchronization2(true);
        let mut device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);
        if synchronization2 {
            device_create_info = device_create_info.push_next(&mut sync2_features);
        }

        let device = base.instance
            .create_device(base.physical_device, &device_create_info, None)
            .map_err(|e| init_failed("Failed to create logical device", e))?;

        Ok((device, wide_lines))
    }

    unsafe fn create_command_pool(device: &ash::Device, queue_family_index: u32) -> Result<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        device.create_command_pool(&create_info, None)
            .map_err(|e| init_failed("Failed to create command pool", e))
    }

    fn create_allocator(base: &InstanceContext, device: &ash::Device) -> Result<Allocator> {
        Allocator::new(&AllocatorCreateDesc {
            instance: base.instance.clone(),
            device: device.clone(),
            physical_device: base.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| init_failed("Failed to create GPU allocator", e))
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub fn features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.features
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Highest sample count the device supports for color and depth together
    pub fn max_sample_count(&self) -> SampleCount {
        self.max_sample_count
    }

    /// MSAA sample count chosen from the configuration and the device limits
    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn surface_format(&self) -> SurfaceFormat {
        self.surface_format
    }

    pub fn supports_wide_lines(&self) -> bool {
        self.wide_lines
    }

    pub(crate) fn allocator(&mut self) -> &mut Allocator {
        &mut self.allocator
    }

    pub(crate) fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    pub(crate) fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Bring-up surface, once; later calls create a fresh surface for `window`
    pub(crate) fn create_surface(&mut self, window: &dyn WindowSource) -> Result<vk::SurfaceKHR> {
        match self.bring_up_surface.take() {
            Some(surface) => Ok(surface),
            None => unsafe { create_window_surface(&self.entry, &self.instance, window) },
        }
    }

    /// First depth candidate usable as an optimal-tiling depth/stencil attachment
    pub fn find_supported_depth_format(&self) -> Option<TextureFormat> {
        find_depth_format(|format| {
            let properties = unsafe {
                self.instance.get_physical_device_format_properties(
                    self.physical_device,
                    texture_format_to_vk(format),
                )
            };
            properties
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
    }
}

unsafe fn create_window_surface(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &dyn WindowSource,
) -> Result<vk::SurfaceKHR> {
    let display_handle = window.display_handle()
        .map_err(|e| init_failed("Failed to get display handle", e))?;
    let window_handle = window.window_handle()
        .map_err(|e| init_failed("Failed to get window handle", e))?;
    ash_window::create_surface(
        entry,
        instance,
        display_handle.as_raw(),
        window_handle.as_raw(),
        None,
    )
    .map_err(|e| init_failed("Failed to create surface", e))
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Allocator frees its memory blocks through the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_command_pool(self.command_pool, None);

            if let Some(surface) = self.bring_up_surface.take() {
                self.surface_loader.destroy_surface(surface, None);
            }

            self.device.destroy_device(None);

            // No callbacks may reach the config while the messenger goes away
            crate::debug::cleanup_debug_config();
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
