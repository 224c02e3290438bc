/// Screen module - presentation surface, swapchain and per-image resources

pub mod screen;

pub use screen::{transition, Screen, ScreenFrame, ScreenImage, ScreenState, ScreenTransition};
