// =============================================================================
// VULKAN BOOTSTRAP RENDERER
// =============================================================================
//
// Opens a window and brings Vulkan up to the point where rendering could
// begin: instance, validation, surface, GPU selection, logical device,
// swapchain and its image views.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  App (winit event loop)                                         │
// │    ├── WinitWindow (tag, native handles, framebuffer size)      │
// │    └── VulkanRenderer<AshDriver>                                │
// │          └── instance → messenger → surface → GPU → device      │
// │                └── swapchain → image views                      │
// └─────────────────────────────────────────────────────────────────┘
//
// Any initialization failure is fatal: the loop exits and the process
// returns the error.
//
// =============================================================================

mod backend;
mod config;
mod renderer;
mod window;

use anyhow::{anyhow, Context, Result};
use backend::AshDriver;
use config::{Config, RendererBackend};
use log::LevelFilter;
use renderer::{Renderer, VulkanRenderer};
use std::sync::Arc;
use window::{Window, WinitWindow};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let (config, config_error) = Config::load();
    let log_level = config.log_level();

    init_logging(*log_level.as_ref().unwrap_or(&LevelFilter::Info));
    match config_error {
        Some(e) => log::warn!("{:#}. Using defaults.", e),
        None => log::info!("Loaded configuration from {}", Config::DEFAULT_PATH),
    }
    if let Err(e) = log_level {
        log::warn!("{:#}, defaulting to info", e);
    }
    log::debug!("Config: {:?}", config);

    log::info!("Starting Vulkan renderer");
    log::info!(
        "Window: {}x{}{}",
        config.window.width,
        config.window.height,
        if config.window.transparent { " (transparent)" } else { "" }
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn init_logging(level: LevelFilter) {
    use env_logger::Builder;

    // RUST_LOG still wins over the configured level
    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();
    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    window: Option<Arc<WinitWindow>>,
    renderer: Option<Box<dyn Renderer>>,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
            fatal: None,
        }
    }

    /// Construct the configured renderer and run its bootstrap
    fn init_renderer(&self, window: Arc<WinitWindow>) -> Result<Box<dyn Renderer>> {
        let mut renderer: Box<dyn Renderer> = match self.config.renderer.backend {
            RendererBackend::Vulkan => {
                let driver = AshDriver::load()
                    .context("Failed to load Vulkan library. Is Vulkan installed?")?;
                Box::new(VulkanRenderer::new(driver, self.config.bootstrap()))
            }
        };

        renderer.set_window(window);
        if let Err(e) = renderer.initialize() {
            if let Some(stage) = e.stage() {
                log::error!("Bootstrap stopped at the {:?} stage", stage);
            }
            if let Some(hint) = e.remediation() {
                log::error!("{}", hint);
            }
            return Err(e.into());
        }
        log::info!("Renderer ready ({})", renderer.api_name());
        Ok(renderer)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match WinitWindow::create(
            event_loop,
            self.config.window.width,
            self.config.window.height,
            &self.config.window.title,
            self.config.window.transparent,
        ) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, anyhow!(e));
                return;
            }
        };

        match self.init_renderer(window.clone()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                self.fail(event_loop, e.context("Failed to initialize renderer"));
                return;
            }
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                if let Some(ref window) = self.window {
                    window.request_close();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(ref mut renderer) = self.renderer {
                    if let Err(e) = renderer.resize(size.width, size.height) {
                        log::error!("Resize error: {}", e);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(ref mut renderer) = self.renderer {
                    if let Err(e) = renderer.render_frame() {
                        log::error!("Render error: {}", e);
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                let escape = event.physical_key == PhysicalKey::Code(KeyCode::Escape);
                if event.state.is_pressed() && escape {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            if window.should_close() {
                event_loop.exit();
                return;
            }
            window.process_events();
        }
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

impl Drop for App {
    fn drop(&mut self) {
        // Renderer first: its surface must go before the window
        if let Some(mut renderer) = self.renderer.take() {
            renderer.shutdown();
        }
        self.window = None;
    }
}
