// Window collaborator
//
// The renderer only sees the narrow `Window` interface: a capability tag,
// native handles for surface creation and the framebuffer size.

use crate::backend::driver::NativeHandles;
use crate::backend::surface::{self, KHR_SURFACE, WINIT_TAG};
use raw_window_handle::{HandleError, HasDisplayHandle, HasWindowHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use winit::event_loop::ActiveEventLoop;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("failed to create window: {0}")]
    Creation(#[from] winit::error::OsError),

    #[error("failed to get native window handle: {0}")]
    Handle(#[from] HandleError),
}

pub trait Window {
    /// Tag naming the windowing API behind this window
    fn api_name(&self) -> &str;
    fn native_handles(&self) -> Result<NativeHandles, WindowError>;
    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);
    /// Instance extensions needed to present to this window
    fn required_instance_extensions(&self) -> Vec<String>;
    fn process_events(&self);
    fn should_close(&self) -> bool;
}

/// winit-backed window
pub struct WinitWindow {
    inner: winit::window::Window,
    close_requested: AtomicBool,
}

impl WinitWindow {
    /// Must be called from `ApplicationHandler::resumed` (winit 0.30+)
    pub fn create(
        event_loop: &ActiveEventLoop,
        width: u32,
        height: u32,
        title: &str,
        transparent: bool,
    ) -> Result<Self, WindowError> {
        let attributes = winit::window::Window::default_attributes()
            .with_title(title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
            .with_resizable(false)
            .with_transparent(transparent);

        let inner = event_loop.create_window(attributes)?;
        log::info!("Created window '{}' ({}x{})", title, width, height);

        Ok(Self {
            inner,
            close_requested: AtomicBool::new(false),
        })
    }

    pub fn request_close(&self) {
        self.close_requested.store(true, Ordering::Relaxed);
    }
}

impl Window for WinitWindow {
    fn api_name(&self) -> &str {
        WINIT_TAG
    }

    fn native_handles(&self) -> Result<NativeHandles, WindowError> {
        Ok(NativeHandles {
            display: self.inner.display_handle()?.as_raw(),
            window: self.inner.window_handle()?.as_raw(),
        })
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    fn required_instance_extensions(&self) -> Vec<String> {
        match self.inner.display_handle() {
            Ok(display) => surface::required_extensions(display.as_raw()),
            Err(e) => {
                log::warn!("No display handle available ({}), requesting only {}", e, KHR_SURFACE);
                vec![KHR_SURFACE.to_string()]
            }
        }
    }

    fn process_events(&self) {
        self.inner.request_redraw();
    }

    fn should_close(&self) -> bool {
        self.close_requested.load(Ordering::Relaxed)
    }
}
