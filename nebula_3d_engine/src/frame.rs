/// Frame - the per-frame control flow tying the components together
///
/// 1. Screen begins (resize check, image acquire, screen pass begin)
/// 2. SceneRenderer draws into its off-screen target at the editor viewport size
/// 3. EditorOverlay records the GUI inside the screen pass
/// 4. Screen ends (submit, present)

use crate::editor::{EditorOverlay, ImmediateGui};
use crate::error::Result;
use crate::render_device::RenderDevice;
use crate::scene::{Scene, SceneRenderer};
use crate::screen::Screen;

#[derive(Debug, Default)]
pub struct Frame {
    index: u64,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn render<G: ImmediateGui>(
        &mut self,
        device: &mut dyn RenderDevice,
        screen: &mut Screen,
        scene_renderer: &mut SceneRenderer,
        editor: &mut EditorOverlay<G>,
        scene: &mut Scene,
    ) -> Result<()> {
        scene.sync_bodies();

        let screen_frame = screen.cmd_begin_screen_render(device)?;

        let viewport = editor.viewport_size();
        scene_renderer.render(device, scene, viewport.width, viewport.height)?;

        editor.draw(device, screen_frame.command_buffer, screen_frame.extent, scene_renderer)?;
        screen.cmd_end_screen_render(device)?;

        self.index += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
