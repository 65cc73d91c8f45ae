// Recording driver and scripted window for tests

use super::driver::{
    DeviceDesc, DeviceIdentity, Driver, InstanceDesc, NativeHandles, SwapchainDesc,
};
use super::surface::{self, WINIT_TAG};
use super::validation::DEFAULT_VALIDATION_LAYER;
use crate::window::{Window, WindowError};
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use raw_window_handle::{
    HandleError, RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle,
};
use std::cell::Cell;

#[derive(Debug, Clone)]
pub struct MockFamily {
    pub flags: vk::QueueFlags,
    pub present: bool,
}

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: String,
    pub class: vk::PhysicalDeviceType,
    pub features: vk::PhysicalDeviceFeatures,
    pub extensions: Vec<String>,
    pub families: Vec<MockFamily>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Every query against this device fails with `ERROR_DEVICE_LOST`
    pub lost: bool,
}

impl MockDevice {
    /// Eligible discrete GPU with geometry shaders and one combined queue family
    pub fn discrete(name: &str) -> Self {
        Self {
            name: name.to_string(),
            class: vk::PhysicalDeviceType::DISCRETE_GPU,
            features: vk::PhysicalDeviceFeatures {
                geometry_shader: vk::TRUE,
                ..Default::default()
            },
            extensions: vec!["VK_KHR_swapchain".to_string()],
            families: vec![MockFamily {
                flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                present: true,
            }],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: vk::Extent2D { width: 1280, height: 720 },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            lost: false,
        }
    }

    pub fn integrated(name: &str) -> Self {
        Self {
            class: vk::PhysicalDeviceType::INTEGRATED_GPU,
            ..Self::discrete(name)
        }
    }
}

/// In-memory driver. Physical device handles are 1-based positions in `devices`.
#[derive(Default)]
pub struct MockDriver {
    pub layers: Vec<String>,
    pub devices: Vec<MockDevice>,

    pub fail_instance: Option<vk::Result>,
    pub fail_messenger: Option<vk::Result>,
    pub fail_surface: Option<vk::Result>,
    pub fail_enumeration: Option<vk::Result>,
    pub fail_device: Option<vk::Result>,
    pub fail_swapchain: Option<vk::Result>,
    pub fail_image_view_at: Option<usize>,

    /// Every create/destroy entry point except image views, in call order
    pub calls: Vec<&'static str>,
    pub instance_desc: Option<InstanceDesc>,
    pub device_desc: Option<DeviceDesc>,
    pub swapchain_desc: Option<SwapchainDesc>,
    /// Times physical devices were enumerated
    pub enumerations: Cell<usize>,

    pub instance_alive: bool,
    pub device_alive: bool,
    pub live_messengers: usize,
    pub live_surfaces: usize,
    pub live_swapchains: usize,
    pub live_image_views: usize,
    image_views_created: usize,
    next_handle: u64,
}

impl MockDriver {
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            layers: vec![DEFAULT_VALIDATION_LAYER.to_string()],
            devices,
            ..Default::default()
        }
    }

    pub fn with_default_device() -> Self {
        Self::with_devices(vec![MockDevice::discrete("Mock GPU")])
    }

    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        0x1000 + self.next_handle
    }

    fn device(&self, handle: vk::PhysicalDevice) -> VkResult<&MockDevice> {
        let index = handle.as_raw() as usize;
        index
            .checked_sub(1)
            .and_then(|i| self.devices.get(i))
            .filter(|device| !device.lost)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)
    }

    fn fail(result: Option<vk::Result>) -> VkResult<()> {
        match result {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Position of `name` in the call log
    pub fn position(&self, name: &str) -> Option<usize> {
        self.calls.iter().position(|c| *c == name)
    }
}

impl Driver for MockDriver {
    fn instance_layers(&self) -> VkResult<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn instance_extensions(&self) -> VkResult<Vec<String>> {
        Ok(vec![surface::KHR_SURFACE.to_string()])
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<()> {
        self.calls.push("create_instance");
        Self::fail(self.fail_instance)?;
        self.instance_desc = Some(desc.clone());
        self.instance_alive = true;
        Ok(())
    }

    fn destroy_instance(&mut self) {
        self.calls.push("destroy_instance");
        self.instance_alive = false;
    }

    fn create_debug_messenger(
        &mut self,
        _info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        self.calls.push("create_debug_messenger");
        Self::fail(self.fail_messenger)?;
        self.live_messengers += 1;
        Ok(vk::DebugUtilsMessengerEXT::from_raw(self.handle()))
    }

    fn destroy_debug_messenger(&mut self, _messenger: vk::DebugUtilsMessengerEXT) {
        self.calls.push("destroy_debug_messenger");
        self.live_messengers -= 1;
    }

    fn create_surface(&mut self, _handles: &NativeHandles) -> VkResult<vk::SurfaceKHR> {
        self.calls.push("create_surface");
        Self::fail(self.fail_surface)?;
        self.live_surfaces += 1;
        Ok(vk::SurfaceKHR::from_raw(self.handle()))
    }

    fn destroy_surface(&mut self, _surface: vk::SurfaceKHR) {
        self.calls.push("destroy_surface");
        self.live_surfaces -= 1;
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        self.enumerations.set(self.enumerations.get() + 1);
        Self::fail(self.fail_enumeration)?;
        Ok((1..=self.devices.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect())
    }

    fn device_identity(&self, device: vk::PhysicalDevice) -> VkResult<DeviceIdentity> {
        let device = self.device(device)?;
        Ok(DeviceIdentity {
            name: device.name.clone(),
            class: device.class,
        })
    }

    fn device_features(&self, device: vk::PhysicalDevice) -> VkResult<vk::PhysicalDeviceFeatures> {
        Ok(self.device(device)?.features)
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        Ok(self.device(device)?.extensions.clone())
    }

    fn queue_families(
        &self,
        device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self
            .device(device)?
            .families
            .iter()
            .map(|f| vk::QueueFamilyProperties {
                queue_flags: f.flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect())
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        Ok(self
            .device(device)?
            .families
            .get(family as usize)
            .is_some_and(|f| f.present))
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.device(device)?.capabilities)
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.device(device)?.formats.clone())
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.device(device)?.present_modes.clone())
    }

    fn create_device(&mut self, _device: vk::PhysicalDevice, desc: &DeviceDesc) -> VkResult<()> {
        self.calls.push("create_device");
        Self::fail(self.fail_device)?;
        self.device_desc = Some(desc.clone());
        self.device_alive = true;
        Ok(())
    }

    fn device_queue(&self, family: u32, _index: u32) -> VkResult<vk::Queue> {
        Ok(vk::Queue::from_raw(0x100 + family as u64))
    }

    fn destroy_device(&mut self) {
        self.calls.push("destroy_device");
        self.device_alive = false;
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        self.calls.push("create_swapchain");
        Self::fail(self.fail_swapchain)?;
        self.swapchain_desc = Some(*desc);
        self.live_swapchains += 1;
        Ok(vk::SwapchainKHR::from_raw(self.handle()))
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let count = self.swapchain_desc.map_or(0, |d| d.image_count) as u64;
        Ok((1..=count).map(|i| vk::Image::from_raw(0x2000 + i)).collect())
    }

    fn destroy_swapchain(&mut self, _swapchain: vk::SwapchainKHR) {
        self.calls.push("destroy_swapchain");
        self.live_swapchains -= 1;
    }

    fn create_image_view(&mut self, _info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        if self.fail_image_view_at == Some(self.image_views_created) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        self.image_views_created += 1;
        self.live_image_views += 1;
        Ok(vk::ImageView::from_raw(self.handle()))
    }

    fn destroy_image_view(&mut self, _view: vk::ImageView) {
        self.live_image_views -= 1;
    }
}

/// Window reporting a configurable API tag and fixed Xlib handles
pub struct MockWindow {
    pub tag: String,
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
    pub size: (u32, u32),
    /// `native_handles` reports the handles as unavailable
    pub handles_unavailable: bool,
}

impl MockWindow {
    pub fn with_tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }
}

impl Default for MockWindow {
    fn default() -> Self {
        Self {
            tag: WINIT_TAG.to_string(),
            display: RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
            window: RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
            size: (1280, 720),
            handles_unavailable: false,
        }
    }
}

impl Window for MockWindow {
    fn api_name(&self) -> &str {
        &self.tag
    }

    fn native_handles(&self) -> Result<NativeHandles, WindowError> {
        if self.handles_unavailable {
            return Err(HandleError::Unavailable.into());
        }
        Ok(NativeHandles {
            display: self.display,
            window: self.window,
        })
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn required_instance_extensions(&self) -> Vec<String> {
        surface::required_extensions(self.display)
    }

    fn process_events(&self) {}

    fn should_close(&self) -> bool {
        false
    }
}
