// Surface binding
//
// The window collaborator reports which windowing API produced it. Only
// recognised APIs get a surface; the native handle pair then picks the
// platform surface call.

use super::driver::{Driver, NativeHandles};
use super::error::BootstrapError;
use crate::window::Window;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

pub const KHR_SURFACE: &str = "VK_KHR_surface";
pub const KHR_WIN32_SURFACE: &str = "VK_KHR_win32_surface";
pub const KHR_XLIB_SURFACE: &str = "VK_KHR_xlib_surface";
pub const KHR_XCB_SURFACE: &str = "VK_KHR_xcb_surface";
pub const KHR_WAYLAND_SURFACE: &str = "VK_KHR_wayland_surface";

/// Windowing APIs the renderer knows how to bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowingApi {
    Winit,
}

/// Tag reported by `WinitWindow::api_name`
pub const WINIT_TAG: &str = "winit";

impl WindowingApi {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            WINIT_TAG => Some(WindowingApi::Winit),
            _ => None,
        }
    }
}

/// Platform surface kinds reachable from a raw handle pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePlatform {
    Win32,
    Xlib,
    Xcb,
    Wayland,
}

impl SurfacePlatform {
    pub fn from_handles(display: RawDisplayHandle, window: RawWindowHandle) -> Option<Self> {
        match (display, window) {
            (RawDisplayHandle::Windows(_), RawWindowHandle::Win32(_)) => Some(Self::Win32),
            (RawDisplayHandle::Xlib(_), RawWindowHandle::Xlib(_)) => Some(Self::Xlib),
            (RawDisplayHandle::Xcb(_), RawWindowHandle::Xcb(_)) => Some(Self::Xcb),
            (RawDisplayHandle::Wayland(_), RawWindowHandle::Wayland(_)) => Some(Self::Wayland),
            _ => None,
        }
    }

    pub fn from_display(display: RawDisplayHandle) -> Option<Self> {
        match display {
            RawDisplayHandle::Windows(_) => Some(Self::Win32),
            RawDisplayHandle::Xlib(_) => Some(Self::Xlib),
            RawDisplayHandle::Xcb(_) => Some(Self::Xcb),
            RawDisplayHandle::Wayland(_) => Some(Self::Wayland),
            _ => None,
        }
    }

    pub fn extension_name(self) -> &'static str {
        match self {
            Self::Win32 => KHR_WIN32_SURFACE,
            Self::Xlib => KHR_XLIB_SURFACE,
            Self::Xcb => KHR_XCB_SURFACE,
            Self::Wayland => KHR_WAYLAND_SURFACE,
        }
    }
}

/// Instance extensions needed to present to windows on this display
pub fn required_extensions(display: RawDisplayHandle) -> Vec<String> {
    let mut extensions = vec![KHR_SURFACE.to_string()];
    if let Some(platform) = SurfacePlatform::from_display(display) {
        extensions.push(platform.extension_name().to_string());
    }
    extensions
}

/// Create a presentation surface for the window
pub fn bind<D: Driver>(
    driver: &mut D,
    window: &dyn Window,
) -> Result<vk::SurfaceKHR, BootstrapError> {
    let tag = window.api_name();
    let api = WindowingApi::from_tag(tag)
        .ok_or_else(|| BootstrapError::UnsupportedWindowingApi(tag.to_string()))?;

    let handles = match api {
        WindowingApi::Winit => window
            .native_handles()
            .map_err(|e| BootstrapError::WindowHandleUnavailable(e.to_string()))?,
    };

    let platform = SurfacePlatform::from_handles(handles.display, handles.window)
        .ok_or_else(|| BootstrapError::UnsupportedWindowingApi(describe(&handles)))?;

    let surface = driver
        .create_surface(&handles)
        .map_err(BootstrapError::SurfaceCreationFailed)?;

    log::info!("Created {:?} surface", platform);
    Ok(surface)
}

fn describe(handles: &NativeHandles) -> String {
    format!("{:?}/{:?}", handles.display, handles.window)
}
