/// Lighting - a single directional light plus ambient term

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels (normalized on use)
    pub direction: Vec3,
    pub color: Vec3,
    /// Ambient intensity added to every lit surface
    pub ambient: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.3),
            color: Vec3::ONE,
            ambient: 0.15,
        }
    }
}

impl DirectionalLight {
    pub fn normalized_direction(&self) -> Vec3 {
        self.direction.normalize_or_zero()
    }
}
