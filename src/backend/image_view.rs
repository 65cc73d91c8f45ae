// Swapchain image views

use super::driver::Driver;
use super::error::BootstrapError;
use ash::vk;

/// 2D color view over a whole single-level, single-layer image
pub fn view_create_info(image: vk::Image, format: vk::Format) -> vk::ImageViewCreateInfo {
    vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .build()
}

/// Create one view per image into `views`.
///
/// Stops at the first failure; views created before it stay in `views`
/// for the teardown path.
pub fn build<D: Driver>(
    driver: &mut D,
    images: &[vk::Image],
    format: vk::Format,
    views: &mut Vec<vk::ImageView>,
) -> Result<(), BootstrapError> {
    for (index, &image) in images.iter().enumerate() {
        let view = driver
            .create_image_view(&view_create_info(image, format))
            .map_err(|result| BootstrapError::ImageViewCreationFailed { index, result })?;
        views.push(view);
    }

    log::info!("Created {} swapchain image views", views.len());
    Ok(())
}
