// Instance creation
//
// Validation layers are checked before anything is created. The extension
// list is the window's presentation extensions plus portability enumeration,
// plus debug utils when validation is on.

use super::driver::{Driver, InstanceDesc};
use super::error::BootstrapError;
use super::validation;
use crate::config::BootstrapConfig;
use ash::vk;

pub const KHR_PORTABILITY_ENUMERATION: &str = "VK_KHR_portability_enumeration";
pub const EXT_DEBUG_UTILS: &str = "VK_EXT_debug_utils";

/// Ordered union of the window extensions and the renderer's own
pub fn required_extensions(window_extensions: &[String], enable_validation: bool) -> Vec<String> {
    let mut extensions: Vec<String> = Vec::with_capacity(window_extensions.len() + 2);
    let mut push = |name: &str| {
        if !extensions.iter().any(|e| e == name) {
            extensions.push(name.to_string());
        }
    };

    for ext in window_extensions {
        push(ext.as_str());
    }
    push(KHR_PORTABILITY_ENUMERATION);
    if enable_validation {
        push(EXT_DEBUG_UTILS);
    }

    extensions
}

pub fn describe(config: &BootstrapConfig, window_extensions: &[String]) -> InstanceDesc {
    let enable_validation = config.enable_validation;

    InstanceDesc {
        app_name: config.app_name.clone(),
        engine_name: config.engine_name.clone(),
        api_version: vk::API_VERSION_1_3,
        extensions: required_extensions(window_extensions, enable_validation),
        layers: if enable_validation {
            config.validation_layers.clone()
        } else {
            Vec::new()
        },
        flags: vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR,
        debug_messenger: enable_validation.then(validation::messenger_create_info),
    }
}

pub fn create<D: Driver>(
    driver: &mut D,
    config: &BootstrapConfig,
    window_extensions: &[String],
) -> Result<(), BootstrapError> {
    if config.enable_validation {
        validation::ensure_layers(driver, &config.validation_layers)?;
    }

    let desc = describe(config, window_extensions);

    driver.create_instance(&desc).map_err(|result| match result {
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => BootstrapError::IncompatibleDriver,
        other => BootstrapError::InstanceCreationFailed(other),
    })?;

    // Diagnostic only
    match driver.instance_extensions() {
        Ok(available) => {
            log::debug!("Available instance extensions:");
            for name in available {
                log::debug!("\t{}", name);
            }
        }
        Err(e) => log::debug!("Could not enumerate instance extensions: {}", e),
    }

    log::info!(
        "Created Vulkan instance for '{}' (validation {})",
        config.app_name,
        if config.enable_validation { "on" } else { "off" }
    );
    Ok(())
}
