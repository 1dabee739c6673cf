//! Asynchronous model loading
//!
//! The loader reads and decodes the asset on its own thread and reports
//! back over a channel that the UI thread drains once per frame. A load
//! cannot be aborted; dropping the loader only stops anyone listening.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use glam::{Mat3, Mat4, Vec3};
use gltf::image::Format;
use rayon::prelude::*;

use crate::error::LoadError;
use crate::scene::{Material, Model, Primitive, TextureImage, Vertex};

const CHUNK_SIZE: usize = 1024 * 1024;

/// Outcome channels of a load: any number of progress reports, then
/// exactly one of `Success` or `Failure`
#[derive(Debug)]
pub enum LoadEvent {
    /// Fraction of the file read so far, 0.0-1.0
    Progress(f32),
    Success(Model),
    Failure(LoadError),
}

impl LoadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadEvent::Progress(_))
    }
}

/// Handle to a load running in the background
pub struct AssetLoader {
    path: PathBuf,
    events: Receiver<LoadEvent>,
}

impl AssetLoader {
    /// Start loading `path` in the background
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, events) = mpsc::channel();

        let worker_tx = tx.clone();
        let worker_path = path.clone();
        let spawned = thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let event = match fetch(&worker_path, &worker_tx).and_then(|bytes| decode_glb(&bytes)) {
                    Ok(model) => LoadEvent::Success(model),
                    Err(e) => LoadEvent::Failure(e),
                };
                // The viewer may already be gone; nothing left to tell.
                let _ = worker_tx.send(event);
            });

        if let Err(source) = spawned {
            let _ = tx.send(LoadEvent::Failure(LoadError::Io {
                path: path.clone(),
                source,
            }));
        }

        log::debug!("Loading {}", path.display());
        Self { path, events }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain every event delivered since the last poll, without blocking
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.events.try_iter().collect()
    }

    /// Block until the next event arrives or the timeout passes
    pub fn wait(&self, timeout: std::time::Duration) -> Option<LoadEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

/// Read the whole file, reporting progress after every chunk
fn fetch(path: &Path, progress: &Sender<LoadEvent>) -> Result<Vec<u8>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut chunk).map_err(io_error)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        if total > 0 {
            let fraction = (bytes.len() as f64 / total as f64).min(1.0) as f32;
            let _ = progress.send(LoadEvent::Progress(fraction));
        }
    }
    Ok(bytes)
}

/// Decode a binary glTF (or self-contained glTF JSON) into a model root.
///
/// Node transforms of the default scene are baked into the vertex data so
/// the returned model only carries its own root transform.
pub fn decode_glb(bytes: &[u8]) -> Result<Model, LoadError> {
    let (document, buffers, images) = gltf::import_slice(bytes)?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::NoScene)?;

    let mut jobs = Vec::new();
    for node in scene.nodes() {
        collect_primitives(node, Mat4::IDENTITY, &mut jobs);
    }

    let primitives: Vec<Primitive> = jobs
        .par_iter()
        .filter_map(|(primitive, world)| read_primitive(primitive, *world, &buffers))
        .collect();

    if primitives.is_empty() {
        log::warn!("Asset contains no triangle geometry");
    }

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            Material {
                base_color_factor: pbr.base_color_factor(),
                base_color_texture: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index()),
            }
        })
        .collect();

    let textures = images.into_iter().map(to_rgba8).collect();

    Ok(Model {
        name: scene.name().map(str::to_string),
        primitives,
        materials,
        textures,
        ..Default::default()
    })
}

fn collect_primitives<'a>(
    node: gltf::Node<'a>,
    parent: Mat4,
    out: &mut Vec<(gltf::Primitive<'a>, Mat4)>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() == gltf::mesh::Mode::Triangles {
                out.push((primitive, world));
            } else {
                log::debug!(
                    "Skipping {:?} primitive in mesh {:?}",
                    primitive.mode(),
                    mesh.name()
                );
            }
        }
    }
    for child in node.children() {
        collect_primitives(child, world, out);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
) -> Option<Primitive> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

    let positions: Vec<Vec3> = reader
        .read_positions()?
        .map(|p| world.transform_point3(Vec3::from(p)))
        .collect();
    if positions.is_empty() {
        return None;
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let normals: Vec<Vec3> = match reader.read_normals() {
        Some(normals) => normals
            .map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero())
            .collect(),
        None => smooth_normals(&positions, &indices),
    };

    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|uv| uv.into_f32().collect())
        .unwrap_or_default();

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| Vertex {
            position: position.to_array(),
            normal: normals.get(i).copied().unwrap_or(Vec3::Y).to_array(),
            uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
        })
        .collect();

    Some(Primitive {
        vertices,
        indices,
        material: primitive.material().index(),
    })
}

/// Area-weighted vertex normals for primitives that ship without any
pub(crate) fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals.into_iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}

fn to_rgba8(image: gltf::image::Data) -> Option<TextureImage> {
    let rgba = match image.format {
        Format::R8G8B8A8 => image.pixels,
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            log::warn!("Unsupported texture format {:?}; using untextured material", other);
            return None;
        }
    };
    Some(TextureImage {
        width: image.width,
        height: image.height,
        rgba,
    })
}
