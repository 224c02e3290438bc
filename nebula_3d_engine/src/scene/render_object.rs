/// Render objects - a mesh placed in the world, optionally driven by a physics body

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::error::Result;
use crate::render_device::RenderDevice;
use crate::scene::mesh::Mesh;

/// Pose source for objects simulated by an external physics library
pub trait PhysicsBody {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    /// Model matrix: scale, then rotate, then translate
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

pub struct RenderObject {
    pub name: String,
    pub transform: Transform,
    /// RGBA tint multiplied with the vertex color
    pub color: Vec4,
    mesh: Mesh,
    body: Option<Box<dyn PhysicsBody>>,
}

impl RenderObject {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            color: Vec4::ONE,
            mesh,
            body: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_body(mut self, body: Box<dyn PhysicsBody>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Copy the physics body pose into the transform (scale is kept)
    pub fn sync_from_body(&mut self) {
        if let Some(body) = &self.body {
            self.transform.translation = body.position();
            self.transform.rotation = body.rotation();
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn destroy(self, device: &mut dyn RenderDevice) -> Result<()> {
        self.mesh.destroy(device)
    }
}

impl std::fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderObject")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("color", &self.color)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "render_object_tests.rs"]
mod tests;
