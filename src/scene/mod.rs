//! Scene graph: camera, lights and the (single) loaded model

mod camera;
mod model;

pub use camera::{DEFAULT_FAR, DEFAULT_FOV_DEGREES, DEFAULT_NEAR, PerspectiveCamera};
pub use model::{Material, Model, Primitive, TextureImage, Vertex};

use glam::Vec3;

use crate::error::SceneError;

/// Uniform light applied to every surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

/// Parallel light shining from `position` towards `target`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    /// Direction the light travels in
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Y)
    }
}

/// Everything drawn each frame.
///
/// The scene owns its camera and lights outright and holds at most one
/// model root.
#[derive(Debug)]
pub struct Scene {
    pub camera: PerspectiveCamera,
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    model: Option<Model>,
}

impl Scene {
    /// Scene with the viewer's fixed lighting rig
    pub fn new(camera: PerspectiveCamera) -> Self {
        Self {
            camera,
            ambient: AmbientLight {
                color: Vec3::ONE,
                intensity: 1.2,
            },
            directional: DirectionalLight {
                color: Vec3::ONE,
                intensity: 2.5,
                position: Vec3::new(2.0, 5.0, 5.0),
                target: Vec3::ZERO,
            },
            model: None,
        }
    }

    pub fn attach_model(&mut self, model: Model) -> Result<(), SceneError> {
        if self.model.is_some() {
            return Err(SceneError::ModelAlreadyAttached);
        }
        self.model = Some(model);
        Ok(())
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut Model> {
        self.model.as_mut()
    }

    pub fn model_count(&self) -> usize {
        usize::from(self.model.is_some())
    }
}
