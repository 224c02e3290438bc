/// Scene module - render objects, camera, lighting and the off-screen scene renderer

pub mod camera;
pub mod lighting;
pub mod mesh;
pub mod render_object;
pub mod scene;
pub mod scene_renderer;

pub use camera::Camera;
pub use lighting::DirectionalLight;
pub use mesh::{Mesh, MeshData, Vertex};
pub use render_object::{PhysicsBody, RenderObject, Transform};
pub use scene::Scene;
pub use scene_renderer::{ObjectPushConstants, SceneRenderer, SceneUniforms, SCENE_COLOR_FORMAT};
