//! GPU rendering module using wgpu
//!
//! The scene is drawn into an off-screen canvas texture which the UI layer
//! then places on the page.

pub mod canvas;
pub mod context;
pub mod pipelines;
pub mod renderer;

pub use context::GpuContext;
pub use renderer::SceneRenderer;
