// Logical device + queue creation

use super::driver::{DeviceDesc, Driver};
use super::error::BootstrapError;
use super::queue::ResolvedFamilies;
use ash::vk;
use std::collections::BTreeSet;

pub const KHR_SWAPCHAIN: &str = "VK_KHR_swapchain";

/// Queues retrieved from the logical device. Both may be the same queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalDevice {
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub families: ResolvedFamilies,
}

/// Assemble the creation request: one queue per unique family at priority 1.0
pub fn describe(
    families: ResolvedFamilies,
    required_extensions: &[String],
    validation_layers: &[String],
    enable_validation: bool,
) -> DeviceDesc {
    let unique: BTreeSet<u32> = [families.graphics, families.present].into_iter().collect();

    // Device layers are ignored by current drivers; mirrored for older ones
    let layers = if enable_validation {
        validation_layers.to_vec()
    } else {
        Vec::new()
    };

    DeviceDesc {
        queue_families: unique.into_iter().collect(),
        queue_priority: 1.0,
        extensions: required_extensions.to_vec(),
        layers,
        features: vk::PhysicalDeviceFeatures {
            geometry_shader: vk::TRUE,
            ..Default::default()
        },
    }
}

pub fn build<D: Driver>(
    driver: &mut D,
    physical_device: vk::PhysicalDevice,
    families: ResolvedFamilies,
    required_extensions: &[String],
    validation_layers: &[String],
    enable_validation: bool,
) -> Result<LogicalDevice, BootstrapError> {
    let desc = describe(families, required_extensions, validation_layers, enable_validation);

    driver
        .create_device(physical_device, &desc)
        .map_err(BootstrapError::LogicalDeviceCreationFailed)?;

    let queues = driver.device_queue(families.graphics, 0).and_then(|graphics| {
        driver
            .device_queue(families.present, 0)
            .map(|present| (graphics, present))
    });
    let (graphics_queue, present_queue) = match queues {
        Ok(queues) => queues,
        Err(e) => {
            driver.destroy_device();
            return Err(BootstrapError::LogicalDeviceCreationFailed(e));
        }
    };

    log::info!(
        "Created logical device with {} queue famil{} (graphics: {}, present: {})",
        desc.queue_families.len(),
        if desc.queue_families.len() == 1 { "y" } else { "ies" },
        families.graphics,
        families.present
    );

    Ok(LogicalDevice {
        graphics_queue,
        present_queue,
        families,
    })
}
