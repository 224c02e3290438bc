/// Render pass and framebuffer creation
///
/// Attachment order is fixed: color attachments, depth (optional), resolve
/// (optional). The first color attachment resolves into the resolve target;
/// any further color attachment is left unresolved.

use ash::vk;
use nebula_3d_engine::nebula3d::Result;
use nebula_3d_engine::nebula3d::render::{
    AttachmentDesc, Extent2D, FramebufferAttachment, ImageLayout, RenderPassDesc, RenderPassHandle,
};
use nebula_3d_engine::engine_err;

use crate::vulkan_format::{
    image_layout_to_vk, load_op_to_vk, sample_count_to_vk, store_op_to_vk, texture_format_to_vk,
};

const SOURCE: &str = "nebula3d::vulkan::RenderPass";

pub(crate) struct RenderPass {
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) desc: RenderPassDesc,
}

pub(crate) struct Framebuffer {
    pub(crate) framebuffer: vk::Framebuffer,
    pub(crate) render_pass: RenderPassHandle,
    /// Kept so the end of a pass can update tracked texture layouts
    pub(crate) attachments: Vec<FramebufferAttachment>,
}

fn attachment_description(attachment: &AttachmentDesc) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(texture_format_to_vk(attachment.format))
        .samples(sample_count_to_vk(attachment.samples))
        .load_op(load_op_to_vk(attachment.load_op))
        .store_op(store_op_to_vk(attachment.store_op))
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout))
}

/// Native descriptions in framebuffer order
pub(crate) fn attachment_descriptions(desc: &RenderPassDesc) -> Vec<vk::AttachmentDescription> {
    desc.color_attachments
        .iter()
        .chain(desc.depth_attachment.iter())
        .chain(desc.resolve_attachment.iter())
        .map(attachment_description)
        .collect()
}

/// Final layout of every attachment, in framebuffer order
pub(crate) fn final_layouts(desc: &RenderPassDesc) -> Vec<ImageLayout> {
    desc.color_attachments
        .iter()
        .chain(desc.depth_attachment.iter())
        .chain(desc.resolve_attachment.iter())
        .map(|a| a.final_layout)
        .collect()
}

/// External dependencies of the single subpass
///
/// The incoming one orders attachment writes after earlier work. When an
/// attachment ends in `ShaderReadOnly`, an outgoing one makes its writes
/// visible to later fragment shader reads (the scene image sampled by the
/// editor).
pub(crate) fn subpass_dependencies(desc: &RenderPassDesc) -> Vec<vk::SubpassDependency> {
    let has_depth = desc.depth_attachment.is_some();
    let (stage_mask, access_mask) = if has_depth {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
    };

    let mut dependencies = vec![vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stage_mask)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stage_mask)
        .dst_access_mask(access_mask)];

    let sampled_afterwards = final_layouts(desc)
        .iter()
        .any(|layout| *layout == ImageLayout::ShaderReadOnly);
    if sampled_afterwards {
        dependencies.push(vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags::SHADER_READ));
    }

    dependencies
}

pub(crate) fn create_render_pass(device: &ash::Device, desc: &RenderPassDesc) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(desc);
    let color_count = desc.color_attachments.len() as u32;

    let color_refs: Vec<vk::AttachmentReference> = (0..color_count)
        .map(|i| vk::AttachmentReference::default()
            .attachment(i)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
        .collect();

    let depth_ref = desc.depth_attachment.as_ref().map(|_| vk::AttachmentReference::default()
        .attachment(color_count)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL));

    // One resolve reference per color attachment, only the first is used
    let resolve_refs: Vec<vk::AttachmentReference> = match desc.resolve_attachment {
        Some(_) => {
            let resolve_index = color_count + depth_ref.is_some() as u32;
            (0..color_count)
                .map(|i| if i == 0 {
                    vk::AttachmentReference::default()
                        .attachment(resolve_index)
                        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                } else {
                    vk::AttachmentReference::default()
                        .attachment(vk::ATTACHMENT_UNUSED)
                        .layout(vk::ImageLayout::UNDEFINED)
                })
                .collect()
        }
        None => Vec::new(),
    };

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if let Some(ref depth_ref) = depth_ref {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }
    if !resolve_refs.is_empty() {
        subpass = subpass.resolve_attachments(&resolve_refs);
    }

    let dependencies = subpass_dependencies(desc);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe {
        device.create_render_pass(&render_pass_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create render pass: {:?}", e))
    }
}

pub(crate) fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: Extent2D,
) -> Result<vk::Framebuffer> {
    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(views)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    unsafe {
        device.create_framebuffer(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create {}x{} framebuffer: {:?}",
                extent.width, extent.height, e))
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
