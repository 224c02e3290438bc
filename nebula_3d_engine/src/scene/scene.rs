/// Scene - what the scene renderer draws in one frame

use crate::error::Result;
use crate::render_device::RenderDevice;
use crate::scene::camera::Camera;
use crate::scene::lighting::DirectionalLight;
use crate::scene::render_object::RenderObject;

#[derive(Debug)]
pub struct Scene {
    pub objects: Vec<RenderObject>,
    pub camera: Camera,
    pub light: DirectionalLight,
    pub show_axis: bool,
    pub show_sky: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            camera: Camera::default(),
            light: DirectionalLight::default(),
            show_axis: true,
            show_sky: true,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: RenderObject) {
        self.objects.push(object);
    }

    pub fn find_object(&self, name: &str) -> Option<&RenderObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Pull physics poses into every object's transform
    pub fn sync_bodies(&mut self) {
        for object in &mut self.objects {
            object.sync_from_body();
        }
    }

    pub fn destroy(self, device: &mut dyn RenderDevice) -> Result<()> {
        for object in self.objects {
            object.destroy(device)?;
        }
        Ok(())
    }
}
