/// Descriptor set layouts and writes

use crate::render_device::handles::{BufferHandle, SamplerHandle, TextureHandle};
use crate::render_device::types::ShaderStageFlags;

/// Sets a render device's descriptor pool can hold
pub const DESCRIPTOR_POOL_MAX_SETS: u32 = 1024;

/// Descriptors of each type a render device's descriptor pool can hold
pub const DESCRIPTOR_POOL_DESCRIPTORS_PER_TYPE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
}

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub stages: ShaderStageFlags,
}

/// Resource written into a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorResource {
    UniformBuffer { buffer: BufferHandle, offset: u64, range: u64 },
    StorageBuffer { buffer: BufferHandle, offset: u64, range: u64 },
    CombinedImageSampler { texture: TextureHandle, sampler: SamplerHandle },
}

impl DescriptorResource {
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            DescriptorResource::UniformBuffer { .. } => DescriptorType::UniformBuffer,
            DescriptorResource::StorageBuffer { .. } => DescriptorType::StorageBuffer,
            DescriptorResource::CombinedImageSampler { .. } => DescriptorType::CombinedImageSampler,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub resource: DescriptorResource,
}
