/// Texture descriptions

use crate::error::{Error, Result};
use crate::render_device::handles::{DescriptorSetHandle, SamplerHandle};
use crate::render_device::types::{
    ImageLayout, SampleCount, TextureAspect, TextureFormat, TextureUsage,
};

/// 2D texture creation parameters (single mip level, single array layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub samples: SampleCount,
}

impl TextureDesc {
    /// Sampled color texture that can receive uploads
    pub fn sampled(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
            samples: SampleCount::S1,
        }
    }

    /// Size in bytes of one full upload
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

/// Texture state kept by the device
///
/// `layout` is the layout the image was last transitioned to by a barrier
/// recorded through the device; later barriers use it as their old layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub samples: SampleCount,
    pub aspect: TextureAspect,
    pub layout: ImageLayout,
    /// Combined image sampler set, freed together with the texture
    pub descriptor_set: Option<DescriptorSetHandle>,
    /// Sampler referenced by `descriptor_set` (not owned by the texture)
    pub sampler: Option<SamplerHandle>,
}

impl TextureInfo {
    /// Fresh state for a just-created image
    pub fn new(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            samples: desc.samples,
            aspect: desc.format.aspect(),
            layout: ImageLayout::Undefined,
            descriptor_set: None,
            sampler: None,
        }
    }

    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }

    /// Whether `len` bytes can be copied into this texture from a buffer
    ///
    /// The copy needs a `TRANSFER_DST`, single-sample image with one aspect,
    /// and exactly `byte_size()` bytes.
    pub fn check_upload(&self, len: usize) -> Result<()> {
        let problem = if !self.usage.contains(TextureUsage::TRANSFER_DST) {
            "Texture was not created with TRANSFER_DST usage".to_string()
        } else if self.samples != SampleCount::S1 {
            format!("Cannot upload into a {}x multisampled texture", self.samples.count())
        } else if self.aspect == TextureAspect::DepthStencil {
            "Cannot upload depth and stencil in one copy".to_string()
        } else if len as u64 != self.byte_size() {
            format!("Texture upload of {} bytes, expected {}", len, self.byte_size())
        } else {
            return Ok(());
        };
        Err(Error::InvalidResource(problem))
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
