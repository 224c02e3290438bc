/// Sampler creation from a backend-agnostic description

use ash::vk;
use nebula_3d_engine::nebula3d::Result;
use nebula_3d_engine::nebula3d::render::SamplerDesc;
use nebula_3d_engine::{engine_debug, engine_err};

use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::{address_mode_to_vk, filter_to_vk};

const SOURCE: &str = "nebula3d::vulkan::Sampler";

/// Anisotropy level actually applied, `None` when unsupported or not requested
fn effective_anisotropy(requested: Option<f32>, supported: bool, limit: f32) -> Option<f32> {
    match requested {
        Some(level) if supported && level > 1.0 => Some(level.min(limit)),
        _ => None,
    }
}

pub(crate) fn create_sampler(context: &DeviceContext, desc: &SamplerDesc) -> Result<vk::Sampler> {
    let address_mode = address_mode_to_vk(desc.address_mode);
    let anisotropy = effective_anisotropy(
        desc.max_anisotropy,
        context.features().sampler_anisotropy == vk::TRUE,
        context.properties().limits.max_sampler_anisotropy,
    );
    if desc.max_anisotropy.is_some() && anisotropy.is_none() {
        engine_debug!(SOURCE, "Anisotropic filtering requested but not applied");
    }

    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(address_mode)
        .address_mode_v(address_mode)
        .address_mode_w(address_mode)
        .anisotropy_enable(anisotropy.is_some())
        .max_anisotropy(anisotropy.unwrap_or(1.0))
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .min_lod(0.0)
        .max_lod(0.0);

    unsafe {
        context.device().create_sampler(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create sampler: {:?}", e))
    }
}
