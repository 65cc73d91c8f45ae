// Swapchain - Window presentation
//
// Negotiates format, present mode, extent and image count with the
// device/surface pair and creates the chain of presentable images.

use super::driver::{Driver, SharingPlan, SwapchainDesc};
use super::error::BootstrapError;
use super::queue::ResolvedFamilies;
use ash::prelude::VkResult;
use ash::vk;

/// Extent value meaning "the application picks the size"
const UNDEFINED_EXTENT: u32 = u32::MAX;

/// What a surface offers a particular physical device
#[derive(Debug, Clone, Default)]
pub struct SwapChainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapChainSupportDetails {
    pub fn query<D: Driver>(
        driver: &D,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Self> {
        Ok(Self {
            capabilities: driver.surface_capabilities(device, surface)?,
            formats: driver.surface_formats(device, surface)?,
            present_modes: driver.surface_present_modes(device, surface)?,
        })
    }

    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// A created swapchain and the state chosen for it.
/// Rebuilding the chain means recomputing all of it.
#[derive(Debug, Clone)]
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
}

/// Prefer 8-bit BGRA sRGB in the sRGB non-linear color space, else the first format offered
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

// MAILBOX: No vsync, no tearing, triple buffered
// FIFO: Vsync enabled, guaranteed available
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Componentwise clamp into `[min, max]`
pub fn clamp_extent(extent: vk::Extent2D, min: vk::Extent2D, max: vk::Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width.max(min.width).min(max.width),
        height: extent.height.max(min.height).min(max.height),
    }
}

/// Use the surface's current extent when it defines one, otherwise the framebuffer size clamped
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: (u32, u32)) -> vk::Extent2D {
    if caps.current_extent.width != UNDEFINED_EXTENT {
        return caps.current_extent;
    }

    let (width, height) = framebuffer;
    clamp_extent(
        vk::Extent2D { width, height },
        caps.min_image_extent,
        caps.max_image_extent,
    )
}

/// One more than the minimum, capped by the maximum (0 means unbounded)
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 && count > caps.max_image_count {
        caps.max_image_count
    } else {
        count
    }
}

/// Concurrent sharing only when graphics and present live in different families
pub fn choose_sharing(families: ResolvedFamilies) -> SharingPlan {
    if families.is_shared() {
        SharingPlan::Exclusive
    } else {
        SharingPlan::Concurrent([families.graphics, families.present])
    }
}

pub fn choose_composite_alpha(
    caps: &vk::SurfaceCapabilitiesKHR,
    transparent: bool,
) -> vk::CompositeAlphaFlagsKHR {
    let premultiplied = vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED;
    if transparent && caps.supported_composite_alpha.contains(premultiplied) {
        premultiplied
    } else {
        vk::CompositeAlphaFlagsKHR::OPAQUE
    }
}

/// Build the swapchain request from freshly queried surface support
pub fn plan(
    support: &SwapChainSupportDetails,
    surface: vk::SurfaceKHR,
    families: ResolvedFamilies,
    framebuffer: (u32, u32),
    transparent: bool,
) -> Result<SwapchainDesc, BootstrapError> {
    let caps = &support.capabilities;
    let format = choose_surface_format(&support.formats)
        .ok_or(BootstrapError::SwapchainCreationFailed(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))?;

    Ok(SwapchainDesc {
        surface,
        image_count: choose_image_count(caps),
        format,
        extent: choose_extent(caps, framebuffer),
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        sharing: choose_sharing(families),
        pre_transform: caps.current_transform,
        composite_alpha: choose_composite_alpha(caps, transparent),
        present_mode: choose_present_mode(&support.present_modes),
    })
}

/// Create the swapchain and fetch its images. Image views are made separately.
pub fn build<D: Driver>(
    driver: &mut D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    families: ResolvedFamilies,
    framebuffer: (u32, u32),
    transparent: bool,
) -> Result<Swapchain, BootstrapError> {
    let support = SwapChainSupportDetails::query(driver, physical_device, surface)
        .map_err(BootstrapError::SwapchainCreationFailed)?;
    let desc = plan(&support, surface, families, framebuffer, transparent)?;

    let handle = driver
        .create_swapchain(&desc)
        .map_err(BootstrapError::SwapchainCreationFailed)?;

    let images = match driver.swapchain_images(handle) {
        Ok(images) => images,
        Err(e) => {
            driver.destroy_swapchain(handle);
            return Err(BootstrapError::SwapchainCreationFailed(e));
        }
    };

    log::info!(
        "Created swapchain: {}x{}, {:?}/{:?}, {:?}, {} images",
        desc.extent.width,
        desc.extent.height,
        desc.format.format,
        desc.format.color_space,
        desc.present_mode,
        images.len()
    );

    Ok(Swapchain {
        handle,
        images,
        image_views: Vec::new(),
        format: desc.format,
        extent: desc.extent,
        present_mode: desc.present_mode,
    })
}
