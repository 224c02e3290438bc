/// Camera - position + yaw/pitch orientation + perspective parameters
///
/// Produces right-handed view matrices and Vulkan-style projections
/// (depth in [0, 1], Y pointing down in clip space).

use glam::{Mat4, Vec3};

/// Pitch is kept just short of straight up/down so the view basis never degenerates
const PITCH_LIMIT: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation around +Y, radians (0 looks down +X)
    pub yaw: f32,
    /// Rotation above the horizon, radians
    pub pitch: f32,
    /// Vertical field of view, radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 8.0),
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Turn by the given yaw/pitch deltas (radians); pitch is clamped
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move along the camera's own axes (x = right, y = world up, z = forward)
    pub fn translate_local(&mut self, delta: Vec3) {
        self.position += self.right() * delta.x + Vec3::Y * delta.y + self.forward() * delta.z;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    /// Perspective projection for the given aspect ratio
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let mut projection = Mat4::perspective_rh(self.fov_y, aspect_ratio, self.near, self.far);
        projection.y_axis.y *= -1.0;
        projection
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
