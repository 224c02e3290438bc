/// Texture - 2D Vulkan image, its view and its device-local allocation

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use nebula_3d_engine::nebula3d::{Error, Result};
use nebula_3d_engine::nebula3d::render::{TextureDesc, TextureInfo};
use nebula_3d_engine::{engine_bail, engine_err, engine_error, engine_warn};

use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::{
    aspect_to_vk, sample_count_to_vk, texture_format_to_vk, texture_usage_to_vk,
};

const SOURCE: &str = "nebula3d::vulkan::Texture";

pub(crate) struct Texture {
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Allocation,
    /// Tracked state (layout, bound descriptor set)
    pub(crate) info: TextureInfo,
}

impl Texture {
    /// Single mip, single layer image in `Undefined` layout
    pub(crate) fn new(context: &mut DeviceContext, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, "Cannot create a {}x{} texture", desc.width, desc.height);
        }

        let info = TextureInfo::new(desc);
        let format = texture_format_to_vk(desc.format);

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(sample_count_to_vk(desc.samples))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(texture_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = context.device().create_image(&image_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create {}x{} image: {:?}",
                    desc.width, desc.height, e))?;

            let requirements = context.device().get_image_memory_requirements(image);

            let allocation = match context.allocator().allocate(&AllocationCreateDesc {
                name: "texture",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    context.device().destroy_image(image, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for texture {}x{} (required: {:.2} MB): {:?}",
                        desc.width, desc.height, size_mb, e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = context.device().bind_image_memory(image, allocation.memory(), allocation.offset()) {
                context.allocator().free(allocation).ok();
                context.device().destroy_image(image, None);
                return Err(engine_err!(SOURCE, "Failed to bind image memory: {:?}", e));
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(subresource_range(&info));

            let view = match context.device().create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    context.allocator().free(allocation).ok();
                    context.device().destroy_image(image, None);
                    return Err(engine_err!(SOURCE, "Failed to create image view: {:?}", e));
                }
            };

            Ok(Self {
                image,
                view,
                allocation,
                info,
            })
        }
    }

    /// Descriptor set and sampler are owned elsewhere; the caller frees the set
    pub(crate) fn destroy(self, context: &mut DeviceContext) {
        unsafe {
            context.device().destroy_image_view(self.view, None);
        }
        if let Err(e) = context.allocator().free(self.allocation) {
            engine_warn!(SOURCE, "Failed to free texture allocation: {:?}", e);
        }
        unsafe {
            context.device().destroy_image(self.image, None);
        }
    }
}

/// Whole-image range for the texture's aspect
pub(crate) fn subresource_range(info: &TextureInfo) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: aspect_to_vk(info.aspect),
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}
