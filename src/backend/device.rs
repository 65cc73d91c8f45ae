// Physical device selection
//
// Every enumerated GPU is scored from its optional features and device
// class. Only candidates passing the eligibility checks can be picked; the
// highest score wins and ties go to the first one enumerated.

use super::driver::Driver;
use super::error::BootstrapError;
use super::queue::{self, QueueFamilyIndices, ResolvedFamilies};
use super::swapchain::SwapChainSupportDetails;
use ash::prelude::VkResult;
use ash::vk;
use std::fmt;

/// Starting score before any multiplier
pub const BASE_SCORE: f64 = 30.0;

/// Multiplier for each optional feature the device exposes
pub fn feature_multiplier(features: &vk::PhysicalDeviceFeatures) -> f64 {
    let table = [
        (features.geometry_shader, 1.3),
        (features.tessellation_shader, 1.2),
        (features.multi_viewport, 1.1),
        (features.sampler_anisotropy, 1.2),
        (features.texture_compression_bc, 1.1),
        (features.fill_mode_non_solid, 1.05),
        (features.wide_lines, 1.05),
    ];

    table
        .iter()
        .filter(|(supported, _)| *supported == vk::TRUE)
        .map(|(_, multiplier)| multiplier)
        .product()
}

/// Unknown classes get 0, which rules them out
pub fn class_multiplier(class: vk::PhysicalDeviceType) -> f64 {
    match class {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1.0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 0.75,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 0.5,
        vk::PhysicalDeviceType::CPU => 0.25,
        _ => 0.0,
    }
}

pub fn score(features: &vk::PhysicalDeviceFeatures, class: vk::PhysicalDeviceType) -> f64 {
    BASE_SCORE * feature_multiplier(features) * class_multiplier(class)
}

/// Why a candidate cannot be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    MissingGeometryShader,
    IncompleteQueueFamilies(QueueFamilyIndices),
    MissingExtensions(Vec<String>),
    InadequateSwapchainSupport,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::MissingGeometryShader => write!(f, "no geometry shader support"),
            Ineligibility::IncompleteQueueFamilies(indices) => write!(
                f,
                "missing queue families (graphics: {:?}, present: {:?})",
                indices.graphics, indices.present
            ),
            Ineligibility::MissingExtensions(missing) => {
                write!(f, "missing device extensions {:?}", missing)
            }
            Ineligibility::InadequateSwapchainSupport => {
                write!(f, "no surface formats or present modes")
            }
        }
    }
}

/// Everything known about one enumerated physical device
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub class: vk::PhysicalDeviceType,
    pub features: vk::PhysicalDeviceFeatures,
    pub extensions: Vec<String>,
    pub queue_families: QueueFamilyIndices,
    pub swapchain_support: SwapChainSupportDetails,
}

impl DeviceCandidate {
    /// Query a candidate fresh from the driver
    pub fn probe<D: Driver>(
        driver: &D,
        handle: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Self> {
        let identity = driver.device_identity(handle)?;
        Ok(Self {
            handle,
            name: identity.name,
            class: identity.class,
            features: driver.device_features(handle)?,
            extensions: driver.device_extensions(handle)?,
            queue_families: queue::resolve(driver, handle, surface)?,
            swapchain_support: SwapChainSupportDetails::query(driver, handle, surface)?,
        })
    }

    pub fn score(&self) -> f64 {
        score(&self.features, self.class)
    }

    /// Check every eligibility rule, reporting the first one broken
    pub fn check(&self, required_extensions: &[String]) -> Result<ResolvedFamilies, Ineligibility> {
        if self.features.geometry_shader != vk::TRUE {
            return Err(Ineligibility::MissingGeometryShader);
        }

        let families = self
            .queue_families
            .complete()
            .ok_or(Ineligibility::IncompleteQueueFamilies(self.queue_families))?;

        let missing: Vec<String> = required_extensions
            .iter()
            .filter(|ext| !self.extensions.contains(ext))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Ineligibility::MissingExtensions(missing));
        }

        if !self.swapchain_support.is_adequate() {
            return Err(Ineligibility::InadequateSwapchainSupport);
        }

        Ok(families)
    }
}

/// The device chosen for the rest of the pipeline
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub score: f64,
    pub families: ResolvedFamilies,
}

/// Index of the best scoring eligible entry. Equal scores keep the earlier one.
pub fn best_candidate(scored: &[(f64, bool)]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (index, &(score, eligible)) in scored.iter().enumerate() {
        if !eligible || score <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }

    best.map(|(index, _)| index)
}

/// Enumerate, score and filter physical devices, then pick the best
pub fn pick<D: Driver>(
    driver: &D,
    surface: vk::SurfaceKHR,
    required_extensions: &[String],
) -> Result<SelectedDevice, BootstrapError> {
    let devices = driver
        .physical_devices()
        .map_err(BootstrapError::DeviceEnumerationFailed)?;

    if devices.is_empty() {
        return Err(BootstrapError::NoCompatibleGpu);
    }

    let mut scored = Vec::with_capacity(devices.len());
    let mut chosen = Vec::with_capacity(devices.len());

    for handle in devices {
        let candidate = match DeviceCandidate::probe(driver, handle, surface) {
            Ok(candidate) => candidate,
            Err(e) => {
                log::warn!("Skipping physical device {:?}: query failed ({})", handle, e);
                continue;
            }
        };

        let score = candidate.score();
        let eligibility = candidate.check(required_extensions);
        match &eligibility {
            Ok(_) => log::debug!(
                "GPU candidate '{}' ({:?}): score {:.2}",
                candidate.name,
                candidate.class,
                score
            ),
            Err(reason) => log::warn!(
                "GPU candidate '{}' ({:?}) not eligible: {} (score {:.2})",
                candidate.name,
                candidate.class,
                reason,
                score
            ),
        }

        scored.push((score, eligibility.is_ok()));
        chosen.push((candidate, eligibility.ok()));
    }

    let index = best_candidate(&scored).ok_or(BootstrapError::NoSuitableGpu)?;
    let (candidate, families) = chosen.swap_remove(index);
    let families = families.ok_or(BootstrapError::NoSuitableGpu)?;

    let selected = SelectedDevice {
        handle: candidate.handle,
        name: candidate.name,
        score: scored[index].0,
        families,
    };
    log::info!("Selected GPU: {} (score {:.2})", selected.name, selected.score);

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockDevice, MockDriver, MockFamily};
    use ash::vk::Handle;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn features(f: impl FnOnce(&mut vk::PhysicalDeviceFeatures)) -> vk::PhysicalDeviceFeatures {
        let mut features = vk::PhysicalDeviceFeatures::default();
        f(&mut features);
        features
    }

    fn required() -> Vec<String> {
        vec!["VK_KHR_swapchain".to_string()]
    }

    #[test]
    fn discrete_with_geometry_and_anisotropy() {
        let f = features(|f| {
            f.geometry_shader = vk::TRUE;
            f.sampler_anisotropy = vk::TRUE;
        });
        assert!(approx(score(&f, vk::PhysicalDeviceType::DISCRETE_GPU), 46.8));
    }

    #[test]
    fn multipliers_compound() {
        let all = features(|f| {
            f.geometry_shader = vk::TRUE;
            f.tessellation_shader = vk::TRUE;
            f.multi_viewport = vk::TRUE;
            f.sampler_anisotropy = vk::TRUE;
            f.texture_compression_bc = vk::TRUE;
            f.fill_mode_non_solid = vk::TRUE;
            f.wide_lines = vk::TRUE;
        });
        let expected = 30.0 * 1.3 * 1.2 * 1.1 * 1.2 * 1.1 * 1.05 * 1.05 * 0.75;

        assert!(approx(score(&all, vk::PhysicalDeviceType::INTEGRATED_GPU), expected));
        let bare = vk::PhysicalDeviceFeatures::default();
        assert!(approx(score(&bare, vk::PhysicalDeviceType::CPU), 7.5));
        assert!(approx(score(&bare, vk::PhysicalDeviceType::VIRTUAL_GPU), 15.0));
    }

    #[test]
    fn unknown_class_scores_zero() {
        let f = features(|f| f.geometry_shader = vk::TRUE);
        assert_eq!(score(&f, vk::PhysicalDeviceType::OTHER), 0.0);
    }

    #[test]
    fn geometry_shader_is_mandatory() {
        let mut device = MockDevice::discrete("no-gs");
        device.features.geometry_shader = vk::FALSE;
        device.features.sampler_anisotropy = vk::TRUE;
        device.features.tessellation_shader = vk::TRUE;
        let driver = MockDriver::with_devices(vec![device]);

        let handle = vk::PhysicalDevice::from_raw(1);
        let candidate =
            DeviceCandidate::probe(&driver, handle, vk::SurfaceKHR::from_raw(7)).unwrap();
        assert!(candidate.score() > 0.0);
        assert_eq!(candidate.check(&required()), Err(Ineligibility::MissingGeometryShader));
    }

    #[test]
    fn eligibility_rules_are_reported() {
        let mut no_ext = MockDevice::discrete("no-ext");
        no_ext.extensions.clear();
        let mut no_present = MockDevice::discrete("no-present");
        no_present.families[0].present = false;
        let mut no_modes = MockDevice::discrete("no-modes");
        no_modes.present_modes.clear();
        let driver = MockDriver::with_devices(vec![no_ext, no_present, no_modes]);
        let surface = vk::SurfaceKHR::from_raw(7);

        let check = |raw: u64| {
            DeviceCandidate::probe(&driver, vk::PhysicalDevice::from_raw(raw), surface)
                .unwrap()
                .check(&required())
        };
        assert_eq!(check(1), Err(Ineligibility::MissingExtensions(required())));
        assert!(matches!(check(2), Err(Ineligibility::IncompleteQueueFamilies(_))));
        assert_eq!(check(3), Err(Ineligibility::InadequateSwapchainSupport));
    }

    #[test]
    fn best_candidate_prefers_first_on_ties() {
        assert_eq!(best_candidate(&[(10.0, true), (10.0, true)]), Some(0));
        assert_eq!(best_candidate(&[(10.0, true), (12.0, true), (12.0, true)]), Some(1));
        assert_eq!(best_candidate(&[(50.0, false), (12.0, true)]), Some(1));
        assert_eq!(best_candidate(&[(0.0, true)]), None);
        assert_eq!(best_candidate(&[]), None);
    }

    #[test]
    fn pick_selects_highest_eligible_score() {
        let integrated = MockDevice::integrated("integrated");
        let mut discrete = MockDevice::discrete("discrete");
        discrete.features.sampler_anisotropy = vk::TRUE;
        let mut ineligible = MockDevice::discrete("fast-but-broken");
        ineligible.features.tessellation_shader = vk::TRUE;
        ineligible.extensions.clear();
        let driver = MockDriver::with_devices(vec![integrated, ineligible, discrete]);

        let selected = pick(&driver, vk::SurfaceKHR::from_raw(7), &required()).unwrap();
        assert_eq!(selected.name, "discrete");
        assert_eq!(selected.handle, vk::PhysicalDevice::from_raw(3));
        assert!(approx(selected.score, 46.8));
    }

    #[test]
    fn unknown_class_is_never_selected() {
        let mut other = MockDevice::discrete("mystery");
        other.class = vk::PhysicalDeviceType::OTHER;
        let driver = MockDriver::with_devices(vec![other]);

        assert_eq!(
            pick(&driver, vk::SurfaceKHR::from_raw(7), &required()).unwrap_err(),
            BootstrapError::NoSuitableGpu
        );
    }

    #[test]
    fn empty_enumeration_is_no_compatible_gpu() {
        let driver = MockDriver::with_devices(Vec::new());
        assert_eq!(
            pick(&driver, vk::SurfaceKHR::from_raw(7), &required()).unwrap_err(),
            BootstrapError::NoCompatibleGpu
        );
    }

    #[test]
    fn failed_enumeration_is_not_an_empty_list() {
        let mut driver = MockDriver::with_default_device();
        driver.fail_enumeration = Some(vk::Result::ERROR_INITIALIZATION_FAILED);

        let err = pick(&driver, vk::SurfaceKHR::from_raw(7), &required()).unwrap_err();
        assert_eq!(
            err,
            BootstrapError::DeviceEnumerationFailed(vk::Result::ERROR_INITIALIZATION_FAILED)
        );
        assert_ne!(err, BootstrapError::NoCompatibleGpu);
    }

    #[test]
    fn unreadable_candidate_is_skipped() {
        let mut lost = MockDevice::discrete("lost");
        lost.lost = true;
        let driver = MockDriver::with_devices(vec![lost, MockDevice::integrated("integrated")]);

        let selected = pick(&driver, vk::SurfaceKHR::from_raw(7), &required()).unwrap();
        assert_eq!(selected.name, "integrated");
        assert_eq!(selected.handle, vk::PhysicalDevice::from_raw(2));
    }

    #[test]
    fn split_families_are_carried_through() {
        let mut device = MockDevice::discrete("split");
        device.families[0].present = false;
        device.families.push(MockFamily {
            flags: vk::QueueFlags::TRANSFER,
            present: true,
        });
        let driver = MockDriver::with_devices(vec![device]);

        let selected = pick(&driver, vk::SurfaceKHR::from_raw(7), &required()).unwrap();
        assert_eq!(selected.families, ResolvedFamilies { graphics: 0, present: 1 });
    }
}
