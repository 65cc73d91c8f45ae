// Renderer - bootstrap lifecycle
//
// Runs the acquisition pipeline strictly in order:
//   instance -> debug messenger -> surface -> physical device
//   -> logical device -> swapchain -> image views
// and tears it down in exactly the reverse order. A failed `initialize()`
// releases whatever it had already created before returning the error.

use crate::backend::device::{self, SelectedDevice};
use crate::backend::driver::Driver;
use crate::backend::error::{RendererError, Stage, StageContext};
use crate::backend::logical_device::{self, LogicalDevice};
use crate::backend::swapchain::{self, Swapchain};
use crate::backend::{image_view, instance, surface, validation};
use crate::config::BootstrapConfig;
use crate::window::Window;
use ash::vk;
use std::sync::Arc;

/// Operations the application drives a renderer through
pub trait Renderer {
    fn set_window(&mut self, window: Arc<dyn Window>);
    fn initialize(&mut self) -> Result<(), RendererError>;
    fn shutdown(&mut self);
    fn render_frame(&mut self) -> Result<(), RendererError>;
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError>;
    fn api_name(&self) -> &'static str;
}

/// Bootstrap progress, each state requiring the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Uninitialized,
    InstanceReady,
    DebugMessengerReady,
    SurfaceBound,
    PhysicalDeviceSelected,
    LogicalDeviceReady,
    SwapchainReady,
    ImageViewsReady,
    Running,
}

pub struct VulkanRenderer<D: Driver> {
    driver: D,
    config: BootstrapConfig,
    window: Option<Arc<dyn Window>>,
    state: LifecycleState,

    instance_created: bool,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: Option<vk::SurfaceKHR>,
    physical_device: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
    swapchain: Option<Swapchain>,
}

impl<D: Driver> VulkanRenderer<D> {
    pub fn new(driver: D, config: BootstrapConfig) -> Self {
        Self {
            driver,
            config,
            window: None,
            state: LifecycleState::Uninitialized,
            instance_created: false,
            debug_messenger: None,
            surface: None,
            physical_device: None,
            device: None,
            swapchain: None,
        }
    }

    fn run_pipeline(&mut self, window: &dyn Window) -> Result<(), RendererError> {
        let enable_validation = self.config.enable_validation;

        instance::create(&mut self.driver, &self.config, &window.required_instance_extensions())
            .stage(Stage::Instance)?;
        self.instance_created = true;
        self.state = LifecycleState::InstanceReady;

        self.debug_messenger =
            validation::register_debug_messenger(&mut self.driver, enable_validation)
                .stage(Stage::DebugMessenger)?;
        self.state = LifecycleState::DebugMessengerReady;

        let surface = surface::bind(&mut self.driver, window).stage(Stage::Surface)?;
        self.surface = Some(surface);
        self.state = LifecycleState::SurfaceBound;

        let selected = device::pick(&self.driver, surface, &self.config.device_extensions)
            .stage(Stage::PhysicalDevice)?;
        let physical_device = selected.handle;
        let families = selected.families;
        self.physical_device = Some(selected);
        self.state = LifecycleState::PhysicalDeviceSelected;

        let device = logical_device::build(
            &mut self.driver,
            physical_device,
            families,
            &self.config.device_extensions,
            &self.config.validation_layers,
            enable_validation,
        )
        .stage(Stage::LogicalDevice)?;
        self.device = Some(device);
        self.state = LifecycleState::LogicalDeviceReady;

        let swapchain = swapchain::build(
            &mut self.driver,
            physical_device,
            surface,
            families,
            window.framebuffer_size(),
            self.config.transparent,
        )
        .stage(Stage::Swapchain)?;
        let swapchain = self.swapchain.insert(swapchain);
        self.state = LifecycleState::SwapchainReady;

        image_view::build(
            &mut self.driver,
            &swapchain.images,
            swapchain.format.format,
            &mut swapchain.image_views,
        )
        .stage(Stage::ImageViews)?;
        self.state = LifecycleState::ImageViewsReady;

        log::info!(
            "Swapchain ready: {}x{} {:?}, {} image views",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.present_mode,
            swapchain.image_views.len()
        );

        Ok(())
    }

    /// Destroy whatever exists, newest first
    fn teardown(&mut self) {
        if let Some(swapchain) = self.swapchain.take() {
            for view in swapchain.image_views {
                self.driver.destroy_image_view(view);
            }
            self.driver.destroy_swapchain(swapchain.handle);
        }

        if self.device.take().is_some() {
            self.driver.destroy_device();
        }
        self.physical_device = None;

        if let Some(messenger) = self.debug_messenger.take() {
            self.driver.destroy_debug_messenger(messenger);
        }

        if let Some(surface) = self.surface.take() {
            self.driver.destroy_surface(surface);
        }

        if self.instance_created {
            self.driver.destroy_instance();
            self.instance_created = false;
        }

        self.state = LifecycleState::Uninitialized;
    }
}

#[cfg(test)]
impl<D: Driver> VulkanRenderer<D> {
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn physical_device(&self) -> Option<&SelectedDevice> {
        self.physical_device.as_ref()
    }

    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: Driver> Renderer for VulkanRenderer<D> {
    fn set_window(&mut self, window: Arc<dyn Window>) {
        self.window = Some(window);
    }

    fn initialize(&mut self) -> Result<(), RendererError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(RendererError::AlreadyInitialized);
        }
        let window = self.window.clone().ok_or(RendererError::WindowMissing)?;

        log::info!("Initializing Vulkan...");
        if let Err(e) = self.run_pipeline(window.as_ref()) {
            log::error!("{}", e);
            self.teardown();
            return Err(e);
        }

        self.state = LifecycleState::Running;
        log::info!("Vulkan initialized successfully!");
        Ok(())
    }

    fn shutdown(&mut self) {
        log::info!("Cleaning up Vulkan resources...");
        self.teardown();
        log::info!("Cleanup complete");
    }

    fn render_frame(&mut self) -> Result<(), RendererError> {
        Ok(())
    }

    // TODO: rebuild the swapchain and its views for the new framebuffer size
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        log::debug!("Resize to {}x{} requested; swapchain is kept as is", width, height);
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        "Vulkan"
    }
}

impl<D: Driver> Drop for VulkanRenderer<D> {
    fn drop(&mut self) {
        if self.state != LifecycleState::Uninitialized {
            self.shutdown();
        }
    }
}
