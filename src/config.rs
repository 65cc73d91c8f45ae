// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.
// The renderer never reads this directly: it receives the immutable
// `BootstrapConfig` derived from it.

use crate::backend::logical_device::KHR_SWAPCHAIN;
use crate::backend::validation::DEFAULT_VALIDATION_LAYER;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Transparent framebuffer, needed for blurred window backgrounds
    pub transparent: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Renderer".to_string(),
            width: 1280,
            height: 720,
            transparent: false,
        }
    }
}

/// Which renderer implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RendererBackend {
    #[default]
    Vulkan,
}

/// Renderer settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub backend: RendererBackend,
    pub app_name: String,
    pub engine_name: String,
    pub device_extensions: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::Vulkan,
            app_name: "Vulkan Renderer".to_string(),
            engine_name: "Custom Engine".to_string(),
            device_extensions: vec![KHR_SWAPCHAIN.to_string()],
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Only honoured in debug builds
    pub validation_layers: bool,
    pub layers: Vec<String>,
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            layers: vec![DEFAULT_VALIDATION_LAYER.to_string()],
            log_level: "info".to_string(),
        }
    }
}

/// Settings the bootstrap pipeline runs with, fixed at startup
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub app_name: String,
    pub engine_name: String,
    pub enable_validation: bool,
    pub validation_layers: Vec<String>,
    pub device_extensions: Vec<String>,
    pub transparent: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Config::default().bootstrap()
    }
}

impl Config {
    pub const DEFAULT_PATH: &'static str = "config.toml";

    /// Load `config.toml`, falling back to defaults.
    ///
    /// Runs before the logger exists, so the reason for a fallback is
    /// handed back instead of logged.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        Self::load_or_default(Self::DEFAULT_PATH)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load_from_path(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            bail!("Config file not found at {:?}", path);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Log filter from `debug.log_level`
    pub fn log_level(&self) -> Result<log::LevelFilter> {
        self.debug
            .log_level
            .parse()
            .with_context(|| format!("Unknown log level '{}'", self.debug.log_level))
    }

    /// Freeze the settings the renderer needs
    pub fn bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig {
            app_name: self.renderer.app_name.clone(),
            engine_name: self.renderer.engine_name.clone(),
            enable_validation: cfg!(debug_assertions) && self.debug.validation_layers,
            validation_layers: self.debug.layers.clone(),
            device_extensions: self.renderer.device_extensions.clone(),
            transparent: self.window.transparent,
        }
    }
}
