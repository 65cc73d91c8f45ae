// Ash driver - the production `Driver`
//
// Owns the loaded Vulkan library, the instance/device objects and every
// extension loader. Handles created through it are destroyed by the
// renderer's teardown path; only the instance and device are reclaimed here
// as a last resort.

use super::driver::{
    DeviceDesc, DeviceIdentity, Driver, InstanceDesc, NativeHandles, SharingPlan, SwapchainDesc,
};
use ash::extensions::{ext::DebugUtils, khr};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{c_char, CStr, CString};

pub struct AshDriver {
    // Order matters: loaders before the objects they were created from
    swapchain_loader: Option<khr::Swapchain>,
    device: Option<ash::Device>,
    surface_loader: Option<khr::Surface>,
    debug_utils: Option<DebugUtils>,
    instance: Option<ash::Instance>,
    entry: Entry,
}

impl AshDriver {
    /// Load the Vulkan library. No instance exists until `create_instance`.
    pub fn load() -> Result<Self, ash::LoadingError> {
        let entry = unsafe { Entry::load() }?;

        Ok(Self {
            swapchain_loader: None,
            device: None,
            surface_loader: None,
            debug_utils: None,
            instance: None,
            entry,
        })
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_loader(&self) -> VkResult<&khr::Surface> {
        self.surface_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> VkResult<&ash::Device> {
        self.device
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn swapchain_loader(&self) -> VkResult<&khr::Swapchain> {
        self.swapchain_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

fn cstring(value: &str) -> VkResult<CString> {
    CString::new(value).map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)
}

fn cstrings(values: &[String]) -> VkResult<Vec<CString>> {
    values.iter().map(|v| cstring(v)).collect()
}

fn name_to_string(raw: &[c_char]) -> String {
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

impl Driver for AshDriver {
    fn instance_layers(&self) -> VkResult<Vec<String>> {
        let layers = self.entry.enumerate_instance_layer_properties()?;
        Ok(layers.iter().map(|l| name_to_string(&l.layer_name)).collect())
    }

    fn instance_extensions(&self) -> VkResult<Vec<String>> {
        let extensions = self.entry.enumerate_instance_extension_properties(None)?;
        Ok(extensions
            .iter()
            .map(|e| name_to_string(&e.extension_name))
            .collect())
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<()> {
        let app_name = cstring(&desc.app_name)?;
        let engine_name = cstring(&desc.engine_name)?;

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(desc.api_version);

        let extensions = cstrings(&desc.extensions)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layers = cstrings(&desc.layers)?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let mut debug_info = desc.debug_messenger;
        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .flags(desc.flags);
        if let Some(info) = debug_info.as_mut() {
            create_info = create_info.push_next(info);
        }

        let instance = unsafe { self.entry.create_instance(&create_info, None) }?;

        self.debug_utils = Some(DebugUtils::new(&self.entry, &instance));
        self.surface_loader = Some(khr::Surface::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(())
    }

    fn destroy_instance(&mut self) {
        self.surface_loader = None;
        self.debug_utils = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }

    fn create_debug_messenger(
        &mut self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let debug_utils = self
            .debug_utils
            .as_ref()
            .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        unsafe { debug_utils.create_debug_utils_messenger(info, None) }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(debug_utils) = &self.debug_utils {
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn create_surface(&mut self, handles: &NativeHandles) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance()?;

        match (handles.display, handles.window) {
            (RawDisplayHandle::Windows(_), RawWindowHandle::Win32(window)) => {
                let hinstance = window.hinstance.map(|h| h.get()).unwrap_or(0);
                let create_info = vk::Win32SurfaceCreateInfoKHR::builder()
                    .hinstance(hinstance as vk::HINSTANCE)
                    .hwnd(window.hwnd.get() as vk::HWND);
                let loader = khr::Win32Surface::new(&self.entry, instance);
                unsafe { loader.create_win32_surface(&create_info, None) }
            }
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window)) => {
                let dpy = display
                    .display
                    .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
                let create_info = vk::XlibSurfaceCreateInfoKHR::builder()
                    .dpy(dpy.as_ptr().cast())
                    .window(window.window);
                let loader = khr::XlibSurface::new(&self.entry, instance);
                unsafe { loader.create_xlib_surface(&create_info, None) }
            }
            (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(window)) => {
                let connection = display
                    .connection
                    .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
                let create_info = vk::XcbSurfaceCreateInfoKHR::builder()
                    .connection(connection.as_ptr().cast())
                    .window(window.window.get());
                let loader = khr::XcbSurface::new(&self.entry, instance);
                unsafe { loader.create_xcb_surface(&create_info, None) }
            }
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(window)) => {
                let create_info = vk::WaylandSurfaceCreateInfoKHR::builder()
                    .display(display.display.as_ptr().cast())
                    .surface(window.surface.as_ptr().cast());
                let loader = khr::WaylandSurface::new(&self.entry, instance);
                unsafe { loader.create_wayland_surface(&create_info, None) }
            }
            _ => Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT),
        }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Some(loader) = &self.surface_loader {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn device_identity(&self, device: vk::PhysicalDevice) -> VkResult<DeviceIdentity> {
        let props = unsafe { self.instance()?.get_physical_device_properties(device) };
        Ok(DeviceIdentity {
            name: name_to_string(&props.device_name),
            class: props.device_type,
        })
    }

    fn device_features(&self, device: vk::PhysicalDevice) -> VkResult<vk::PhysicalDeviceFeatures> {
        Ok(unsafe { self.instance()?.get_physical_device_features(device) })
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        let extensions = unsafe { self.instance()?.enumerate_device_extension_properties(device) }?;
        Ok(extensions
            .iter()
            .map(|e| name_to_string(&e.extension_name))
            .collect())
    }

    fn queue_families(
        &self,
        device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(unsafe {
            self.instance()?
                .get_physical_device_queue_family_properties(device)
        })
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_support(device, family, surface)
        }
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_capabilities(device, surface)
        }
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_formats(device, surface)
        }
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_present_modes(device, surface)
        }
    }

    fn create_device(&mut self, device: vk::PhysicalDevice, desc: &DeviceDesc) -> VkResult<()> {
        let instance = self.instance()?;

        let priorities = [desc.queue_priority];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = desc
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extensions = cstrings(&desc.extensions)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layers = cstrings(&desc.layers)?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        // Device layers are deprecated but still mirrored for older loaders
        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .enabled_features(&desc.features);

        let logical = unsafe { instance.create_device(device, &create_info, None) }?;

        self.swapchain_loader = Some(khr::Swapchain::new(instance, &logical));
        self.device = Some(logical);
        Ok(())
    }

    fn device_queue(&self, family: u32, index: u32) -> VkResult<vk::Queue> {
        Ok(unsafe { self.device()?.get_device_queue(family, index) })
    }

    fn destroy_device(&mut self) {
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            if let Err(e) = unsafe { device.device_wait_idle() } {
                log::warn!("Device wait idle failed before destruction: {}", e);
            }
            unsafe { device.destroy_device(None) };
        }
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let loader = self.swapchain_loader()?;

        let (sharing_mode, families): (vk::SharingMode, &[u32]) = match &desc.sharing {
            SharingPlan::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
            SharingPlan::Concurrent(families) => (vk::SharingMode::CONCURRENT, families.as_slice()),
        };

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(desc.surface)
            .min_image_count(desc.image_count)
            .image_format(desc.format.format)
            .image_color_space(desc.format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(desc.image_usage)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(families)
            .pre_transform(desc.pre_transform)
            .composite_alpha(desc.composite_alpha)
            .present_mode(desc.present_mode)
            .clipped(true);

        unsafe { loader.create_swapchain(&create_info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader()?.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Some(loader) = &self.swapchain_loader {
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(&mut self, info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        unsafe { self.device()?.create_image_view(info, None) }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Some(device) = &self.device {
            unsafe { device.destroy_image_view(view, None) };
        }
    }
}

impl Drop for AshDriver {
    fn drop(&mut self) {
        if self.device.is_some() || self.instance.is_some() {
            log::warn!("Vulkan driver dropped with live objects, destroying them now");
        }
        self.destroy_device();
        self.destroy_instance();
    }
}
