// Bootstrap errors
//
// One variant per way the acquisition pipeline can fail. Callers match on
// the kind to pick remediation text (driver update vs. missing SDK layer
// vs. unsupported GPU).

use ash::vk;
use std::fmt;
use thiserror::Error;

/// Failure kinds of the individual bootstrap stages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("validation layers requested, but not available: {missing:?}")]
    ValidationLayersUnavailable { missing: Vec<String> },

    #[error("failed to create the Vulkan instance ({0})")]
    InstanceCreationFailed(vk::Result),

    #[error("failed to create the Vulkan instance because the driver is incompatible")]
    IncompatibleDriver,

    #[error("failed to set up debug messenger ({0})")]
    DebugMessengerSetupFailed(vk::Result),

    #[error("window could not provide native handles: {0}")]
    WindowHandleUnavailable(String),

    #[error("failed to create window surface ({0})")]
    SurfaceCreationFailed(vk::Result),

    #[error("unsupported windowing API '{0}'")]
    UnsupportedWindowingApi(String),

    #[error("failed to enumerate physical devices ({0})")]
    DeviceEnumerationFailed(vk::Result),

    #[error("failed to find a GPU with Vulkan support")]
    NoCompatibleGpu,

    #[error("failed to find a suitable GPU")]
    NoSuitableGpu,

    #[error("failed to create logical device ({0})")]
    LogicalDeviceCreationFailed(vk::Result),

    #[error("failed to create swapchain ({0})")]
    SwapchainCreationFailed(vk::Result),

    #[error("failed to create image view for swapchain image {index} ({result})")]
    ImageViewCreationFailed { index: usize, result: vk::Result },
}

/// Pipeline stage, used to prefix errors surfaced by `initialize()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Instance,
    DebugMessenger,
    Surface,
    PhysicalDevice,
    LogicalDevice,
    Swapchain,
    ImageViews,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Instance => "Failed to create Vulkan instance",
            Stage::DebugMessenger => "Failed to set up debug messenger",
            Stage::Surface => "Failed to create window surface",
            Stage::PhysicalDevice => "Failed to pick physical device",
            Stage::LogicalDevice => "Failed to create logical device",
            Stage::Swapchain => "Failed to create swapchain",
            Stage::ImageViews => "Failed to create swapchain image views",
        };
        f.write_str(name)
    }
}

/// Errors returned by the renderer's public operations
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BootstrapError,
    },

    #[error("no window attached to the renderer")]
    WindowMissing,

    #[error("renderer is already initialized")]
    AlreadyInitialized,
}

impl RendererError {
    /// The stage error underneath, if any
    pub fn kind(&self) -> Option<&BootstrapError> {
        match self {
            RendererError::Stage { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            RendererError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// What the user can do about it, for the kinds that have an answer
    pub fn remediation(&self) -> Option<&'static str> {
        let hint = match self.kind()? {
            BootstrapError::IncompatibleDriver => {
                "Install or update a graphics driver with Vulkan support"
            }
            BootstrapError::ValidationLayersUnavailable { .. } => {
                "Install the Vulkan SDK, or set `validation_layers = false` under [debug]"
            }
            BootstrapError::NoCompatibleGpu => "No Vulkan-capable GPU was found on this machine",
            BootstrapError::NoSuitableGpu => {
                "No GPU offers geometry shaders, presentation and the required extensions"
            }
            BootstrapError::UnsupportedWindowingApi(_) => {
                "Run under Win32, X11 or Wayland with the winit window backend"
            }
            _ => return None,
        };
        Some(hint)
    }
}

/// Tag a stage result with the stage it came from
pub(crate) trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, RendererError>;
}

impl<T> StageContext<T> for Result<T, BootstrapError> {
    fn stage(self, stage: Stage) -> Result<T, RendererError> {
        self.map_err(|source| RendererError::Stage { stage, source })
    }
}
