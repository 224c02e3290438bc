/// Render pass and framebuffer descriptions

use crate::render_device::handles::{ImageViewHandle, TextureHandle};
use crate::render_device::types::{ImageLayout, SampleCount, TextureFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// One attachment of a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// Single-subpass render pass
///
/// Framebuffer attachment order is: color attachments, then depth (if any),
/// then resolve (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<AttachmentDesc>,
    pub depth_attachment: Option<AttachmentDesc>,
    /// Single-sample target the first color attachment resolves into
    pub resolve_attachment: Option<AttachmentDesc>,
}

impl RenderPassDesc {
    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len()
            + self.depth_attachment.is_some() as usize
            + self.resolve_attachment.is_some() as usize
    }

    /// Sample count a pipeline drawing in this pass must rasterize with
    ///
    /// Taken from the first color attachment, or the depth attachment of a
    /// depth-only pass. Resolve targets do not count.
    pub fn rasterization_samples(&self) -> SampleCount {
        self.color_attachments
            .first()
            .or(self.depth_attachment.as_ref())
            .map(|attachment| attachment.samples)
            .unwrap_or(SampleCount::S1)
    }
}

/// Image bound to a framebuffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferAttachment {
    Texture(TextureHandle),
    SwapchainView(ImageViewHandle),
}
