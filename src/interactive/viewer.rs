//! The viewer: scene, camera controls, renderer and asset load wired
//! together with an explicit mount/unmount lifecycle

use std::path::PathBuf;

use glam::Vec3;

use crate::color::{BackgroundPreset, ViewerState};
use crate::controls::{OrbitControls, OrbitInput};
use crate::error::RenderError;
use crate::layout::{PageLayout, SurfaceMetrics};
use crate::loader::{AssetLoader, LoadEvent};
use crate::render::{INITIAL_PIXEL_RATIO_CAP, RESIZE_PIXEL_RATIO_CAP, Rasterizer};
use crate::scene::{DEFAULT_FAR, DEFAULT_FOV_DEGREES, DEFAULT_NEAR, PerspectiveCamera, Scene};

use super::frame_loop::{FrameLoop, FrameScheduler};

pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 1.5, 4.0);
pub const ORBIT_TARGET: Vec3 = Vec3::new(1.0, 1.0, 1.0);

/// Yaw added to the model every frame, in radians. Frame-rate dependent:
/// the model spins faster on faster displays.
pub const MODEL_YAW_STEP: f32 = 0.005;

/// Configuration for the viewer window
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Window title
    pub title: String,
    /// Initial window size in logical pixels
    pub window_size: (f64, f64),
    /// Directory served as the asset root
    pub asset_root: PathBuf,
    /// Model file inside `asset_root`
    pub asset_name: String,
    pub layout: PageLayout,
    /// Multisample count for the canvas
    pub msaa_samples: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "My Bakery 3D Viewer".to_string(),
            window_size: (1700.0, 900.0),
            asset_root: PathBuf::from("public"),
            asset_name: "free_porsche_911_carrera_4s.glb".to_string(),
            layout: PageLayout::default(),
            msaa_samples: 4,
        }
    }
}

impl ViewerConfig {
    pub fn asset_path(&self) -> PathBuf {
        self.asset_root.join(&self.asset_name)
    }
}

/// One mounted viewer instance.
///
/// Owns everything it draws. `unmount` (or dropping the viewer) removes the
/// resize listener, cancels the frame loop and disposes the renderer and
/// controls exactly once.
pub struct Viewer<R: Rasterizer> {
    state: ViewerState,
    scene: Scene,
    controls: OrbitControls,
    rasterizer: Option<R>,
    loader: Option<AssetLoader>,
    frame_loop: FrameLoop,
    resize_listening: bool,
    metrics: SurfaceMetrics,
}

impl<R: Rasterizer> Viewer<R> {
    /// Build the scene for a canvas measured at `metrics` and start the
    /// asset load and frame loop
    pub fn mount(config: &ViewerConfig, metrics: SurfaceMetrics, mut rasterizer: R) -> Self {
        let state = ViewerState::default();

        let mut camera = PerspectiveCamera::new(
            DEFAULT_FOV_DEGREES,
            metrics.aspect(),
            DEFAULT_NEAR,
            DEFAULT_FAR,
        );
        camera.position = CAMERA_POSITION;
        let mut scene = Scene::new(camera);

        rasterizer.set_size(metrics.width, metrics.height);
        rasterizer.set_pixel_ratio(metrics.device_pixel_ratio.min(INITIAL_PIXEL_RATIO_CAP));
        rasterizer.set_clear_color(state.background.clear_color());

        let mut controls = OrbitControls::new(ORBIT_TARGET).with_damping(true);
        controls.update(&mut scene.camera);

        let loader = AssetLoader::spawn(config.asset_path());

        let mut frame_loop = FrameLoop::new();
        frame_loop.start();

        let mut viewer = Self {
            state,
            scene,
            controls,
            rasterizer: Some(rasterizer),
            loader: Some(loader),
            frame_loop,
            resize_listening: true,
            metrics,
        };
        // Setup-time layout pass; keeps the construction-time pixel density.
        viewer.apply_layout(metrics);

        log::info!(
            "Viewer mounted: canvas {}x{} @ {:.2}x",
            metrics.width,
            metrics.height,
            metrics.device_pixel_ratio
        );
        viewer
    }

    /// Viewport resize. Returns false once the listener has been removed.
    pub fn handle_resize(&mut self, metrics: SurfaceMetrics) -> bool {
        if !self.resize_listening {
            return false;
        }
        self.apply_layout(metrics);
        if let Some(rasterizer) = self.rasterizer.as_mut() {
            rasterizer.set_pixel_ratio(metrics.device_pixel_ratio.min(RESIZE_PIXEL_RATIO_CAP));
        }
        log::debug!("Resized canvas to {}x{}", metrics.width, metrics.height);
        true
    }

    fn apply_layout(&mut self, metrics: SurfaceMetrics) {
        self.metrics = metrics;
        self.scene.camera.aspect = metrics.aspect();
        self.scene.camera.update_projection_matrix();
        if let Some(rasterizer) = self.rasterizer.as_mut() {
            rasterizer.set_size(metrics.width, metrics.height);
        }
    }

    /// Switch the page and canvas background together
    pub fn select_background(&mut self, preset: BackgroundPreset) {
        self.state.background = preset;
        if let Some(rasterizer) = self.rasterizer.as_mut() {
            rasterizer.set_clear_color(preset.clear_color());
        }
        log::debug!("Background set to {}", preset.label());
    }

    /// Feed one UI frame's pointer input to the orbit controls
    pub fn apply_orbit_input(&mut self, input: &OrbitInput) {
        if input.is_idle() {
            return;
        }
        input.apply(&mut self.controls, &self.scene.camera, self.metrics.height);
    }

    /// Drain loader events delivered since the last call
    pub fn poll_assets(&mut self) {
        let events = match &self.loader {
            Some(loader) => loader.poll(),
            None => return,
        };
        for event in events {
            if event.is_terminal() {
                self.loader = None;
            }
            self.handle_load_event(event);
        }
    }

    pub(crate) fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Progress(fraction) => {
                log::info!("{:.2}% loaded", fraction * 100.0);
            }
            LoadEvent::Success(mut model) => {
                model.transform.scale = Vec3::ONE;
                model.transform.translation = Vec3::ZERO;
                let triangles = model.triangle_count();
                match self.scene.attach_model(model) {
                    Ok(()) => log::info!("3D model loaded successfully! ({} triangles)", triangles),
                    Err(e) => log::warn!("Discarding loaded model: {}", e),
                }
            }
            LoadEvent::Failure(e) => {
                log::error!("An error occurred loading the model: {}", e);
            }
        }
    }

    /// One frame: spin the model, advance damping, draw.
    ///
    /// Returns `Ok(false)` without touching anything once the frame loop
    /// has been cancelled.
    pub fn tick(&mut self) -> Result<bool, RenderError> {
        if !self.frame_loop.begin_frame() {
            return Ok(false);
        }
        if let Some(model) = self.scene.model_mut() {
            model.transform.rotation.y += MODEL_YAW_STEP;
        }
        self.controls.update(&mut self.scene.camera);

        let rasterizer = self.rasterizer.as_mut().ok_or(RenderError::Disposed)?;
        rasterizer.render(&self.scene)?;
        Ok(true)
    }

    /// Re-arm the frame loop for the next display refresh
    pub fn schedule_frame(&self, scheduler: &dyn FrameScheduler) -> bool {
        self.frame_loop.schedule(scheduler)
    }

    /// Tear down: stop listening, stop the loop, release GPU resources.
    /// Safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.resize_listening && self.rasterizer.is_none() {
            return;
        }
        self.resize_listening = false;
        self.frame_loop.cancel();
        if let Some(mut rasterizer) = self.rasterizer.take() {
            rasterizer.dispose();
        }
        self.controls.dispose();
        self.loader = None;
        log::info!("Viewer unmounted after {} frames", self.frame_loop.frames());
    }

    pub fn is_mounted(&self) -> bool {
        self.rasterizer.is_some()
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn rasterizer(&self) -> Option<&R> {
        self.rasterizer.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }
}

impl<R: Rasterizer> Drop for Viewer<R> {
    fn drop(&mut self) {
        self.unmount();
    }
}
