/// Render device module - backend-agnostic GPU interface
///
/// Backends (e.g. Vulkan) implement `RenderDevice`; components above it
/// (Screen, SceneRenderer, EditorOverlay) only ever talk to the trait.

pub mod handles;
pub mod types;
pub mod config;
pub mod selection;
pub mod buffer;
pub mod texture;
pub mod sampler;
pub mod render_pass;
pub mod descriptor;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod render_device;

#[cfg(test)]
pub(crate) mod mock_render_device;

pub use handles::*;
pub use types::*;
pub use config::{
    Config, DebugSeverity, DebugOutput, DebugMessageFilter, ValidationStats,
    DEFAULT_BENIGN_MESSAGE_IDS, DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT,
};
pub use selection::{
    select_physical_device, max_usable_sample_count, select_surface_format, find_depth_format,
    SurfaceFormatChoice, PREFERRED_SURFACE_FORMATS,
};
pub use buffer::{BufferUsage, BufferInfo, checked_range};
pub use texture::{TextureDesc, TextureInfo};
pub use sampler::{SamplerDesc, Filter, AddressMode};
pub use render_pass::{RenderPassDesc, AttachmentDesc, LoadOp, StoreOp, FramebufferAttachment};
pub use descriptor::{
    DescriptorType, DescriptorBinding, DescriptorResource, DescriptorWrite,
    DESCRIPTOR_POOL_MAX_SETS, DESCRIPTOR_POOL_DESCRIPTORS_PER_TYPE,
};
pub use pipeline::{
    GraphicsPipelineDesc, ComputePipelineDesc, PipelineInfo, PipelineBindPoint,
    PrimitiveTopology, CullMode, FrontFace, PolygonMode, RasterizationState,
    BlendFactor, BlendOp, ColorBlendAttachment,
    VertexFormat, VertexAttribute, VertexLayout, PushConstantRange,
};
pub use shader::shader_path;
pub use swapchain::{
    SurfaceCapabilities, SwapchainDesc, clamp_image_count, resolve_extent,
    DESIRED_SWAPCHAIN_IMAGE_COUNT, EXTENT_UNDEFINED,
};
pub use render_device::{RenderDevice, SemaphoreWait, WindowSource};
