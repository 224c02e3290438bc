/// EditorOverlay - drives the GUI frame and shows the scene renderer output
///
/// The GUI library itself is an opaque collaborator behind `ImmediateGui`.
/// The overlay owns the sampler used to expose the scene texture, keeps the
/// texture registered with the GUI (re-registering whenever the scene target
/// is rebuilt) and remembers the viewport panel size, which is the size the
/// scene renderer is asked for on the next frame.

use crate::error::Result;
use crate::render_device::{
    CommandBufferHandle, DescriptorSetHandle, Extent2D, RenderDevice, SamplerDesc, SamplerHandle,
    TextureHandle,
};
use crate::scene::SceneRenderer;
use crate::{engine_debug, engine_trace};

/// Title of the panel showing the rendered scene
pub const SCENE_VIEWPORT_TITLE: &str = "Scene";

/// Texture id handed out by the GUI library
pub type GuiTextureId = u64;

/// Immediate-mode GUI library seen from the engine
pub trait ImmediateGui {
    /// Start a GUI frame for a display of `display_size`
    fn begin_frame(&mut self, display_size: Extent2D);

    /// Make a combined-image-sampler descriptor set drawable as an image
    fn register_texture(&mut self, descriptor_set: DescriptorSetHandle) -> GuiTextureId;

    fn unregister_texture(&mut self, id: GuiTextureId);

    /// Draw a panel holding `texture` (if any) and return the panel's content size
    fn viewport_image(&mut self, title: &str, texture: Option<GuiTextureId>) -> (u32, u32);

    /// Finish the frame and record its draw data into `command_buffer`
    ///
    /// Called inside the screen render pass.
    fn end_frame(&mut self, device: &mut dyn RenderDevice, command_buffer: CommandBufferHandle) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RegisteredTexture {
    texture: TextureHandle,
    generation: u64,
    id: GuiTextureId,
}

pub struct EditorOverlay<G: ImmediateGui> {
    gui: G,
    sampler: SamplerHandle,
    registered: Option<RegisteredTexture>,
    viewport_size: Extent2D,
}

impl<G: ImmediateGui> EditorOverlay<G> {
    pub fn new(device: &mut dyn RenderDevice, gui: G) -> Result<Self> {
        let sampler = device.create_sampler(&SamplerDesc::linear_clamp())?;
        Ok(Self {
            gui,
            sampler,
            registered: None,
            viewport_size: Extent2D::default(),
        })
    }

    pub fn gui(&self) -> &G {
        &self.gui
    }

    pub fn gui_mut(&mut self) -> &mut G {
        &mut self.gui
    }

    /// Size of the scene viewport panel as of the last drawn frame
    pub fn viewport_size(&self) -> Extent2D {
        self.viewport_size
    }

    /// GUI id of the scene texture currently displayed
    pub fn scene_texture_id(&self) -> Option<GuiTextureId> {
        self.registered.map(|r| r.id)
    }

    /// Record the editor frame into the screen's command buffer
    pub fn draw(
        &mut self,
        device: &mut dyn RenderDevice,
        command_buffer: CommandBufferHandle,
        display_size: Extent2D,
        scene_renderer: &SceneRenderer,
    ) -> Result<()> {
        self.gui.begin_frame(display_size);
        self.sync_scene_texture(device, scene_renderer)?;

        let texture_id = self.scene_texture_id();
        let (width, height) = self.gui.viewport_image(SCENE_VIEWPORT_TITLE, texture_id);
        let size = Extent2D::new(width, height);
        if size != self.viewport_size {
            engine_trace!("nebula3d::Editor", "Viewport panel resized to {}x{}", width, height);
            self.viewport_size = size;
        }

        self.gui.end_frame(device, command_buffer)
    }

    /// Register the scene output with the GUI when it appeared or was rebuilt
    fn sync_scene_texture(&mut self, device: &mut dyn RenderDevice, scene_renderer: &SceneRenderer) -> Result<()> {
        let output = scene_renderer.output_texture();
        let generation = scene_renderer.generation();
        let current = self.registered.map(|r| (r.texture, r.generation));
        if current == output.map(|t| (t, generation)) {
            return Ok(());
        }

        if let Some(previous) = self.registered.take() {
            self.gui.unregister_texture(previous.id);
        }
        if let Some(texture) = output {
            let descriptor_set = device.create_texture_descriptor(texture, self.sampler)?;
            let id = self.gui.register_texture(descriptor_set);
            self.registered = Some(RegisteredTexture { texture, generation, id });
            engine_debug!("nebula3d::Editor", "Scene texture registered (generation {})", generation);
        }
        Ok(())
    }

    /// Unregister the scene texture and release the sampler; returns the GUI
    pub fn destroy(mut self, device: &mut dyn RenderDevice) -> Result<G> {
        if let Some(registered) = self.registered.take() {
            self.gui.unregister_texture(registered.id);
        }
        device.destroy_sampler(self.sampler)?;
        Ok(self.gui)
    }
}

#[cfg(test)]
#[path = "editor_overlay_tests.rs"]
mod tests;
