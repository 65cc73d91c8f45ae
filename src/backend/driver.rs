// Driver boundary
//
// Every call the bootstrap pipeline makes into Vulkan goes through this
// trait. Stages build plain descriptors and hand them over; the driver owns
// the instance/device objects and the extension loaders behind them.

use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Instance creation request assembled by the instance factory
#[derive(Debug, Clone)]
pub struct InstanceDesc {
    pub app_name: String,
    pub engine_name: String,
    pub api_version: u32,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    pub flags: vk::InstanceCreateFlags,
    /// Chained into instance creation so create/destroy is covered by diagnostics
    pub debug_messenger: Option<vk::DebugUtilsMessengerCreateInfoEXT>,
}

/// Native handles a surface is created from
#[derive(Debug, Clone, Copy)]
pub struct NativeHandles {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

/// Static identity of a physical device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub name: String,
    pub class: vk::PhysicalDeviceType,
}

/// Logical device creation request
#[derive(Debug, Clone)]
pub struct DeviceDesc {
    /// Unique queue family indices, one queue requested from each
    pub queue_families: Vec<u32>,
    pub queue_priority: f32,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    pub features: vk::PhysicalDeviceFeatures,
}

/// How swapchain images are shared between queue families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingPlan {
    Exclusive,
    Concurrent([u32; 2]),
}

/// Swapchain creation request
#[derive(Debug, Clone, Copy)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub image_usage: vk::ImageUsageFlags,
    pub sharing: SharingPlan,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
}

/// Blocking, synchronous access to the graphics driver
pub trait Driver {
    // Instance level
    fn instance_layers(&self) -> VkResult<Vec<String>>;
    fn instance_extensions(&self) -> VkResult<Vec<String>>;
    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<()>;
    fn destroy_instance(&mut self);

    fn create_debug_messenger(
        &mut self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;
    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);

    fn create_surface(&mut self, handles: &NativeHandles) -> VkResult<vk::SurfaceKHR>;
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);

    // Physical device queries
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_identity(&self, device: vk::PhysicalDevice) -> VkResult<DeviceIdentity>;
    fn device_features(&self, device: vk::PhysicalDevice) -> VkResult<vk::PhysicalDeviceFeatures>;
    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>>;
    fn queue_families(
        &self,
        device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>>;
    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    // Logical device level
    fn create_device(&mut self, device: vk::PhysicalDevice, desc: &DeviceDesc) -> VkResult<()>;
    fn device_queue(&self, family: u32, index: u32) -> VkResult<vk::Queue>;
    fn destroy_device(&mut self);

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    fn create_image_view(&mut self, info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&mut self, view: vk::ImageView);
}
