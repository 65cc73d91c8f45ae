// Validation layers and the debug messenger
//
// Layer support is checked before any instance exists. The messenger
// receives every severity but only warnings and errors reach the log.

use super::driver::Driver;
use super::error::BootstrapError;
use ash::vk;
use std::ffi::CStr;

pub const DEFAULT_VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Exact, case-sensitive match of every requested layer against the installed set.
/// Stops at the first missing layer.
pub fn check_layer_support(requested: &[String], installed: &[String]) -> bool {
    first_missing_layer(requested, installed).is_none()
}

fn first_missing_layer<'a>(requested: &'a [String], installed: &[String]) -> Option<&'a String> {
    requested
        .iter()
        .find(|layer| !installed.iter().any(|available| available == *layer))
}

/// Query the installed layers and fail if any requested one is absent
pub fn ensure_layers<D: Driver>(driver: &D, requested: &[String]) -> Result<(), BootstrapError> {
    // An enumeration failure means nothing can be confirmed as installed
    let installed = driver.instance_layers().unwrap_or_else(|e| {
        log::warn!("Failed to enumerate instance layers: {}", e);
        Vec::new()
    });

    if check_layer_support(requested, &installed) {
        return Ok(());
    }

    Err(BootstrapError::ValidationLayersUnavailable {
        missing: first_missing_layer(requested, &installed)
            .cloned()
            .into_iter()
            .collect(),
    })
}

/// Messenger registration shared by instance creation and the standalone messenger
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
        .build()
}

/// Register the debug messenger. Returns `None` when validation is disabled.
pub fn register_debug_messenger<D: Driver>(
    driver: &mut D,
    enable_validation: bool,
) -> Result<Option<vk::DebugUtilsMessengerEXT>, BootstrapError> {
    if !enable_validation {
        return Ok(None);
    }

    let messenger = driver
        .create_debug_messenger(&messenger_create_info())
        .map_err(BootstrapError::DebugMessengerSetupFailed)?;

    log::info!("Debug messenger registered");
    Ok(Some(messenger))
}

/// Log level a validation message is surfaced at, `None` for dropped severities
pub fn surfaced_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Option<log::Level> {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Some(log::Level::Error)
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Some(log::Level::Warn)
    } else {
        None
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let Some(level) = surfaced_level(message_severity) else {
        return vk::FALSE;
    };
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }

    let message = CStr::from_ptr((*p_callback_data).p_message);
    log::log!(level, "validation layer: {}", message.to_string_lossy());

    vk::FALSE
}
