/// Swapchain - creation, image acquisition and presentation
///
/// The swapchain never destroys the one it replaces: the caller passes the
/// old handle for resource reuse and destroys it once the new one exists.

use ash::vk;
use nebula_3d_engine::nebula3d::Result;
use nebula_3d_engine::nebula3d::render::{ImageHandle, SwapchainDesc};
use nebula_3d_engine::{engine_debug, engine_err};

use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::{
    composite_alpha_to_vk, extent_to_vk, present_mode_to_vk, surface_format_to_vk,
};

const SOURCE: &str = "nebula3d::vulkan::Swapchain";

pub(crate) struct Swapchain {
    pub(crate) swapchain: vk::SwapchainKHR,
    /// Image handles, in swapchain index order
    pub(crate) images: Vec<ImageHandle>,
}

/// Native swapchain plus its images
pub(crate) fn create_swapchain(
    context: &DeviceContext,
    desc: &SwapchainDesc,
    surface: vk::SurfaceKHR,
    old_swapchain: vk::SwapchainKHR,
) -> Result<(vk::SwapchainKHR, Vec<vk::Image>)> {
    let surface_format = surface_format_to_vk(desc.format);

    unsafe {
        let capabilities = context.surface_loader()
            .get_physical_device_surface_capabilities(context.physical_device(), surface)
            .map_err(|e| engine_err!(SOURCE, "Failed to query surface capabilities: {:?}", e))?;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(desc.image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent_to_vk(desc.extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(composite_alpha_to_vk(desc.composite_alpha))
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = context.swapchain_loader()
            .create_swapchain(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create {}x{} swapchain: {:?}",
                desc.extent.width, desc.extent.height, e))?;

        let images = match context.swapchain_loader().get_swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                context.swapchain_loader().destroy_swapchain(swapchain, None);
                return Err(engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e));
            }
        };

        engine_debug!(SOURCE, "Swapchain created: {}x{}, {} images (requested {})",
            desc.extent.width, desc.extent.height, images.len(), desc.image_count);

        Ok((swapchain, images))
    }
}

/// Index of the next presentable image, waiting without timeout
///
/// An out-of-date swapchain is an error here: the screen recreates the
/// swapchain before acquiring whenever the surface size changed.
pub(crate) fn acquire_next_image(
    context: &DeviceContext,
    swapchain: vk::SwapchainKHR,
    signal: vk::Semaphore,
) -> Result<u32> {
    unsafe {
        let (image_index, suboptimal) = context.swapchain_loader()
            .acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
            .map_err(|e| {
                if e == vk::Result::ERROR_OUT_OF_DATE_KHR {
                    engine_err!(SOURCE, "Swapchain out of date during acquire")
                } else {
                    engine_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e)
                }
            })?;
        if suboptimal {
            engine_debug!(SOURCE, "Acquired image {} from a suboptimal swapchain", image_index);
        }
        Ok(image_index)
    }
}

/// Present, then block until the queue is idle
///
/// Suboptimal and out-of-date results are not errors at this point; the next
/// frame's size check rebuilds the swapchain.
pub(crate) fn present(
    context: &DeviceContext,
    swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: &[vk::Semaphore],
) -> Result<()> {
    let swapchains = [swapchain];
    let image_indices = [image_index];
    let present_info = vk::PresentInfoKHR::default()
        .wait_semaphores(wait)
        .swapchains(&swapchains)
        .image_indices(&image_indices);

    unsafe {
        match context.swapchain_loader().queue_present(context.queue(), &present_info) {
            Ok(_) | Err(vk::Result::SUBOPTIMAL_KHR) => {}
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during present");
            }
            Err(e) => {
                return Err(engine_err!(SOURCE, "Failed to present swapchain image: {:?}", e));
            }
        }

        context.device().queue_wait_idle(context.queue())
            .map_err(|e| engine_err!(SOURCE, "Failed to wait for queue idle after present: {:?}", e))
    }
}
