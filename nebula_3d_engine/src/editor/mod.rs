/// Editor module - immediate-mode GUI overlay drawn inside the screen pass

pub mod editor_overlay;

pub use editor_overlay::{EditorOverlay, GuiTextureId, ImmediateGui, SCENE_VIEWPORT_TITLE};
