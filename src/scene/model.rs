//! CPU-side model data produced by the loader

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Interleaved vertex as uploaded to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Translation, Euler rotation (XYZ order, radians) and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Triangle list with vertices already in model-root space
#[derive(Debug, Clone)]
pub struct Primitive {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into `Model::materials`
    pub material: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub base_color_factor: [f32; 4],
    /// Index into `Model::textures`
    pub base_color_texture: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0; 4],
            base_color_texture: None,
        }
    }
}

/// RGBA8 image, sRGB encoded
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Root node of a decoded asset
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: Option<String>,
    pub transform: Transform,
    pub primitives: Vec<Primitive>,
    pub materials: Vec<Material>,
    /// Indexed by image, `None` where the image format is not supported
    pub textures: Vec<Option<TextureImage>>,
}

impl Model {
    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.indices.len() / 3).sum()
    }
}
