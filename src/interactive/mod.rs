//! Interactive viewer: lifecycle, frame loop, page UI and the native window

mod app;
pub mod frame_loop;
pub mod ui;
pub(crate) mod viewer;

pub use app::run_viewer;
pub use frame_loop::{FrameLoop, FrameScheduler};
pub use viewer::{Viewer, ViewerConfig};
