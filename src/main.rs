mod color;
mod controls;
mod error;
mod gpu;
mod interactive;
mod layout;
mod loader;
mod render;
mod scene;

#[cfg(test)]
mod tests;

// Re-export public API
pub use color::{BackgroundPreset, ClearColor, ViewerState};
pub use controls::{OrbitControls, OrbitInput};
pub use error::{GpuError, LoadError, RenderError, SceneError, ViewerError};
pub use interactive::{FrameLoop, FrameScheduler, Viewer, ViewerConfig, run_viewer};
pub use layout::{PageLayout, SurfaceMetrics};
pub use loader::{AssetLoader, LoadEvent, decode_glb};
pub use render::Rasterizer;
pub use scene::{Model, PerspectiveCamera, Scene};

fn main() {
    if let Err(e) = run_viewer(ViewerConfig::default()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
