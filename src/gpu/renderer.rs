//! wgpu implementation of the viewer's rasterizer

use std::sync::Arc;

use glam::{Mat3, Mat4};
use wgpu::util::DeviceExt;

use super::canvas::CanvasTarget;
use super::pipelines::{GlobalsUniform, MaterialUniform, ScenePipeline};
use crate::color::ClearColor;
use crate::error::RenderError;
use crate::render::{Rasterizer, backing_size, fit_within};
use crate::scene::{Material, Model, Scene, TextureImage};

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material: usize,
}

/// Model geometry and materials resident on the GPU
struct GpuModel {
    meshes: Vec<GpuMesh>,
    materials: Vec<wgpu::BindGroup>,
}

/// Everything released by `dispose`
struct Resources {
    pipeline: ScenePipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    canvas: Option<CanvasTarget>,
    model: Option<GpuModel>,
}

/// Draws the scene into an off-screen canvas texture
pub struct SceneRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    resources: Option<Resources>,
    css_size: (f32, f32),
    pixel_ratio: f64,
    clear_color: ClearColor,
    generation: u64,
}

impl SceneRenderer {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, sample_count: u32) -> Self {
        let pipeline = ScenePipeline::new(&device, sample_count);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<GlobalsUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &pipeline.globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        Self {
            device,
            queue,
            resources: Some(Resources {
                pipeline,
                globals_buffer,
                globals_bind_group,
                canvas: None,
                model: None,
            }),
            css_size: (1.0, 1.0),
            pixel_ratio: 1.0,
            clear_color: ClearColor(0x000000),
            generation: 0,
        }
    }

    /// The last rendered canvas image, if any frame has been drawn
    pub fn canvas_view(&self) -> Option<&wgpu::TextureView> {
        self.resources.as_ref()?.canvas.as_ref().map(CanvasTarget::view)
    }

    /// Bumped whenever the canvas texture is recreated
    pub fn canvas_generation(&self) -> u64 {
        self.generation
    }

    /// Physical size of the backing buffer for the current size and ratio
    pub fn backing_size(&self) -> (u32, u32) {
        let max = self.device.limits().max_texture_dimension_2d;
        fit_within(
            backing_size(self.css_size.0, self.css_size.1, self.pixel_ratio),
            max,
        )
    }

    fn globals(scene: &Scene) -> GlobalsUniform {
        let model = scene
            .model()
            .map(|m| m.transform.matrix())
            .unwrap_or(Mat4::IDENTITY);
        let normal_matrix = Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose());
        let ambient = scene.ambient.color * scene.ambient.intensity;
        let light = scene.directional.color * scene.directional.intensity;
        GlobalsUniform {
            view_proj: scene.camera.view_projection().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            ambient: ambient.extend(1.0).to_array(),
            light_dir: scene.directional.direction().extend(0.0).to_array(),
            light_color: light.extend(1.0).to_array(),
        }
    }
}

impl Rasterizer for SceneRenderer {
    fn set_size(&mut self, width: f32, height: f32) {
        self.css_size = (width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let size = self.backing_size();
        let resources = self.resources.as_mut().ok_or(RenderError::Disposed)?;

        if resources.canvas.as_ref().map(CanvasTarget::size) != Some(size) {
            resources.canvas = Some(CanvasTarget::new(
                &self.device,
                size,
                resources.pipeline.sample_count,
            ));
            self.generation += 1;
            log::debug!("Canvas backing buffer is now {}x{}", size.0, size.1);
        }

        if resources.model.is_none() {
            if let Some(model) = scene.model() {
                resources.model = Some(upload_model(
                    &self.device,
                    &self.queue,
                    &resources.pipeline,
                    model,
                ));
            }
        }

        self.queue.write_buffer(
            &resources.globals_buffer,
            0,
            bytemuck::bytes_of(&Self::globals(scene)),
        );

        let Some(canvas) = resources.canvas.as_ref() else {
            return Ok(());
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(canvas.color_attachment(self.clear_color.to_wgpu()))],
                depth_stencil_attachment: Some(canvas.depth_attachment()),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(model) = &resources.model {
                pass.set_pipeline(&resources.pipeline.render_pipeline);
                pass.set_bind_group(0, &resources.globals_bind_group, &[]);
                for mesh in &model.meshes {
                    pass.set_bind_group(1, &model.materials[mesh.material], &[]);
                    pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn dispose(&mut self) {
        if self.resources.take().is_some() {
            log::debug!("Scene renderer disposed");
        }
    }
}

fn upload_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &ScenePipeline,
    model: &Model,
) -> GpuModel {
    let max_dimension = device.limits().max_texture_dimension_2d;
    let textures: Vec<Option<wgpu::TextureView>> = model
        .textures
        .iter()
        .map(|image| {
            let image = image.as_ref()?;
            if image.width > max_dimension || image.height > max_dimension {
                log::warn!(
                    "Skipping {}x{} texture (device limit {})",
                    image.width,
                    image.height,
                    max_dimension
                );
                return None;
            }
            Some(upload_texture(device, queue, image))
        })
        .collect();

    let white = upload_texture(
        device,
        queue,
        &TextureImage {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        },
    );

    // One bind group per material plus a trailing default for unassigned primitives
    let default_material = Material::default();
    let materials: Vec<wgpu::BindGroup> = model
        .materials
        .iter()
        .chain(std::iter::once(&default_material))
        .map(|material| {
            let view = material
                .base_color_texture
                .and_then(|i| textures.get(i))
                .and_then(Option::as_ref)
                .unwrap_or(&white);
            let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::bytes_of(&MaterialUniform {
                    base_color: material.base_color_factor,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &pipeline.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&pipeline.sampler),
                    },
                ],
            })
        })
        .collect();
    let default_index = materials.len() - 1;

    let meshes = model
        .primitives
        .iter()
        .filter(|p| !p.indices.is_empty())
        .map(|primitive| GpuMesh {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&primitive.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&primitive.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: primitive.indices.len() as u32,
            material: primitive
                .material
                .filter(|&i| i < default_index)
                .unwrap_or(default_index),
        })
        .collect::<Vec<_>>();

    log::info!(
        "Uploaded {} meshes, {} materials to the GPU",
        meshes.len(),
        default_index
    );
    GpuModel { meshes, materials }
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, image: &TextureImage) -> wgpu::TextureView {
    device
        .create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Base Color Texture"),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        )
        .create_view(&wgpu::TextureViewDescriptor::default())
}
