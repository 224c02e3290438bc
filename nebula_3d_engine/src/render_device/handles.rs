//! Resource handles
//!
//! Every GPU object owned by a render device is addressed by a versioned slot
//! key. Destroying a resource removes its slot, so a stale handle is detected
//! (and reported as `Error::InvalidResource`) instead of aliasing a reused
//! native object.

use slotmap::new_key_type;

new_key_type! {
    /// Buffer handle (vertex, index, uniform, storage, staging)
    pub struct BufferHandle;
    /// 2D texture handle (image + view + tracked layout)
    pub struct TextureHandle;
    /// Sampler handle
    pub struct SamplerHandle;
    /// Render pass handle
    pub struct RenderPassHandle;
    /// Framebuffer handle
    pub struct FramebufferHandle;
    /// Pipeline handle (graphics or compute)
    pub struct PipelineHandle;
    /// Descriptor set layout handle
    pub struct DescriptorSetLayoutHandle;
    /// Descriptor set handle (allocated from the device's descriptor pool)
    pub struct DescriptorSetHandle;
    /// Command buffer handle (allocated from the device's command pool)
    pub struct CommandBufferHandle;
    /// Semaphore handle
    pub struct SemaphoreHandle;
    /// Fence handle
    pub struct FenceHandle;
    /// Presentation surface handle
    pub struct SurfaceHandle;
    /// Swapchain handle
    pub struct SwapchainHandle;
    /// Swapchain image handle (owned by its swapchain)
    pub struct ImageHandle;
    /// Image view handle for swapchain images
    pub struct ImageViewHandle;
}
