// Queue family resolution
//
// Finds one family for graphics submission and one for presentation to the
// bound surface. They may be the same family.

use super::driver::Driver;
use ash::prelude::VkResult;
use ash::vk;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

/// Queue families of a device known to be complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl ResolvedFamilies {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    pub fn complete(&self) -> Option<ResolvedFamilies> {
        Some(ResolvedFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// Scan families in enumeration order, stopping once both roles are filled.
///
/// `supports_present` is only consulted while no present family is known.
pub fn resolve_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> VkResult<QueueFamilyIndices>
where
    F: FnMut(u32) -> VkResult<bool>,
{
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }

        if indices.present.is_none() && supports_present(index)? {
            indices.present = Some(index);
        }

        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

/// Resolve graphics and present families of `device` against `surface`
pub fn resolve<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> VkResult<QueueFamilyIndices> {
    let families = driver.queue_families(device)?;
    resolve_families(&families, |index| driver.surface_support(device, index, surface))
}
