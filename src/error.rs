//! Error types for the viewer

use std::path::PathBuf;

use thiserror::Error;

/// Failures while bringing up the GPU for a window
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find a suitable GPU adapter")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,
}

/// Failures while drawing a frame
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("renderer has been disposed")]
    Disposed,

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Failures while fetching or decoding the model asset
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode glTF: {0}")]
    Decode(#[from] gltf::Error),

    #[error("asset contains no scene")]
    NoScene,
}

/// Violations of the scene graph's single-model rule
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SceneError {
    #[error("a model is already attached to the scene")]
    ModelAlreadyAttached,
}

/// Failures that abort mounting the viewer
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
