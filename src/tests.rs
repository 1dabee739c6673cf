//! Tests for the viewer lifecycle, asset loading and background controls

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;
use glam::{Vec2, Vec3};

use crate::interactive::frame_loop::FrameLoopState;
use crate::interactive::viewer::{CAMERA_POSITION, MODEL_YAW_STEP, ORBIT_TARGET};
use crate::{
    AssetLoader, BackgroundPreset, ClearColor, FrameLoop, FrameScheduler, LoadError, LoadEvent,
    Model, OrbitInput, Rasterizer, RenderError, Scene, SurfaceMetrics, Viewer, ViewerConfig,
    decode_glb,
};

/// Everything the viewer asked of the rasterizer
#[derive(Debug, Default)]
struct RasterLog {
    size: (f32, f32),
    pixel_ratio: f64,
    clear_color: Option<ClearColor>,
    renders: usize,
    disposals: usize,
    size_calls: usize,
}

#[derive(Default)]
struct MockRasterizer {
    log: Rc<RefCell<RasterLog>>,
    disposed: bool,
}

impl Rasterizer for MockRasterizer {
    fn set_size(&mut self, width: f32, height: f32) {
        let mut log = self.log.borrow_mut();
        log.size = (width, height);
        log.size_calls += 1;
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.log.borrow_mut().pixel_ratio = ratio;
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.log.borrow_mut().clear_color = Some(color);
    }

    fn render(&mut self, _scene: &Scene) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.log.borrow_mut().renders += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.log.borrow_mut().disposals += 1;
    }
}

#[derive(Default)]
struct CountingScheduler {
    requests: Cell<usize>,
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

fn config_for(asset_root: &Path) -> ViewerConfig {
    ViewerConfig {
        asset_root: asset_root.to_path_buf(),
        ..Default::default()
    }
}

fn mount(
    config: &ViewerConfig,
    width: f32,
    height: f32,
    device_pixel_ratio: f64,
) -> (Viewer<MockRasterizer>, Rc<RefCell<RasterLog>>) {
    let rasterizer = MockRasterizer::default();
    let log = rasterizer.log.clone();
    let metrics = SurfaceMetrics::new(width, height, device_pixel_ratio);
    (Viewer::mount(config, metrics, rasterizer), log)
}

/// A GLB holding one triangle under a node translated by `(0, lift, 0)`
fn triangle_glb(lift: f32) -> Vec<u8> {
    let mut bin = Vec::new();
    for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for component in position {
            bin.extend_from_slice(&component.to_le_bytes());
        }
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    let byte_length = bin.len();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let json = format!(
        r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"name":"Bakery","nodes":[0]}}],"nodes":[{{"mesh":0,"translation":[0.0,{lift:.1},0.0]}}],"meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1}}]}}],"buffers":[{{"byteLength":{byte_length}}}],"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":6}}],"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}},{{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}]}}"#
    );
    let mut json = json.into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

fn named_model(name: &str) -> Model {
    Model {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

/// Poll until the loader has delivered its terminal event
fn wait_for_load(viewer: &mut Viewer<MockRasterizer>) {
    for _ in 0..400 {
        viewer.poll_assets();
        if !viewer.is_loading() {
            return;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    panic!("asset load did not finish");
}

// ---------------------------------------------------------------------------
// Mount and layout
// ---------------------------------------------------------------------------

#[test]
fn test_mount_sizes_camera_and_renderer_from_layout() {
    let dir = tempfile::tempdir().unwrap();
    let (viewer, log) = mount(&config_for(dir.path()), 1600.0, 600.0, 1.0);

    let camera = &viewer.scene().camera;
    assert_relative_eq!(camera.aspect, 1600.0 / 600.0, epsilon = 1e-5);
    assert_eq!(camera.fov, 75.0);
    assert_eq!(camera.near, 0.1);
    assert_eq!(camera.far, 100.0);
    assert_eq!(camera.look_target(), ORBIT_TARGET);
    assert_relative_eq!(camera.position.x, CAMERA_POSITION.x, epsilon = 1e-4);
    assert_relative_eq!(camera.position.y, CAMERA_POSITION.y, epsilon = 1e-4);
    assert_relative_eq!(camera.position.z, CAMERA_POSITION.z, epsilon = 1e-4);

    let log = log.borrow();
    assert_eq!(log.size, (1600.0, 600.0));
    assert_eq!(log.clear_color, Some(BackgroundPreset::Pink.clear_color()));
    assert_eq!(viewer.state().container_token(), "bg-pink-100");
}

#[test]
fn test_mount_builds_fixed_lighting() {
    let dir = tempfile::tempdir().unwrap();
    let (viewer, _) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);
    let scene = viewer.scene();

    assert_eq!(scene.ambient.intensity, 1.2);
    assert_eq!(scene.ambient.color, Vec3::ONE);
    assert_eq!(scene.directional.intensity, 2.5);
    assert_eq!(scene.directional.position, Vec3::new(2.0, 5.0, 5.0));
    assert!(scene.model().is_none());
}

#[test]
fn test_zero_area_layout_is_not_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 0.0, 0.0, 1.0);

    assert!(!viewer.scene().camera.aspect.is_finite());
    assert!(viewer.tick().unwrap());
    assert_eq!(log.borrow().renders, 1);
}

// ---------------------------------------------------------------------------
// Background controls
// ---------------------------------------------------------------------------

#[test]
fn test_background_presets_change_token_and_clear_color_together() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);

    for preset in [
        BackgroundPreset::Dark,
        BackgroundPreset::Green,
        BackgroundPreset::Pink,
        BackgroundPreset::Green,
    ] {
        viewer.select_background(preset);
        assert_eq!(viewer.state().background, preset);
        assert_eq!(viewer.state().container_token(), preset.container_token());
        assert_eq!(log.borrow().clear_color, Some(preset.clear_color()));
    }
}

#[test]
fn test_preset_values() {
    assert_eq!(BackgroundPreset::Pink.container_token(), "bg-pink-100");
    assert_eq!(BackgroundPreset::Pink.clear_color().hex(), 0xf5e6e8);
    assert_eq!(BackgroundPreset::Dark.container_token(), "bg-gray-900");
    assert_eq!(BackgroundPreset::Dark.clear_color().hex(), 0x222222);
    assert_eq!(BackgroundPreset::Green.container_token(), "bg-green-100");
    assert_eq!(BackgroundPreset::Green.clear_color().hex(), 0xe0ffea);
    assert_eq!(BackgroundPreset::default(), BackgroundPreset::Pink);
}

#[test]
fn test_clear_color_conversion() {
    assert_eq!(ClearColor(0xffffff).to_linear(), [1.0, 1.0, 1.0]);
    assert_eq!(ClearColor(0x000000).to_linear(), [0.0, 0.0, 0.0]);

    let [r, g, b] = ClearColor(0x222222).to_srgb();
    assert_relative_eq!(r, 34.0 / 255.0);
    assert_eq!(r, g);
    assert_eq!(g, b);

    // Mid grey decodes to roughly a fifth of linear intensity
    let [linear, _, _] = ClearColor(0x808080).to_linear();
    assert_relative_eq!(linear, 0.2158, epsilon = 1e-3);

    assert_eq!(ClearColor(0xff00_0000 | 0x123456).hex(), 0x123456);
}

// ---------------------------------------------------------------------------
// Resize and pixel density
// ---------------------------------------------------------------------------

#[test]
fn test_resize_updates_aspect_and_keeps_orbit() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 1600.0, 600.0, 1.0);
    let position = viewer.scene().camera.position;

    assert!(viewer.handle_resize(SurfaceMetrics::new(800.0, 600.0, 1.0)));

    let camera = &viewer.scene().camera;
    assert_relative_eq!(camera.aspect, 800.0 / 600.0, epsilon = 1e-5);
    assert_eq!(camera.position, position);
    assert_eq!(viewer.controls().target, ORBIT_TARGET);
    assert_eq!(
        camera.projection_matrix(),
        glam::Mat4::perspective_rh(75.0_f32.to_radians(), 800.0 / 600.0, 0.1, 100.0)
    );
    assert_eq!(log.borrow().size, (800.0, 600.0));
}

#[test]
fn test_pixel_ratio_caps_differ_between_mount_and_resize() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    for (dpr, mounted, resized) in [(1.0, 1.0, 1.0), (1.5, 1.5, 1.5), (3.0, 3.0, 2.0), (5.0, 4.0, 2.0)] {
        let (mut viewer, log) = mount(&config, 800.0, 600.0, dpr);
        assert_eq!(log.borrow().pixel_ratio, mounted, "after mount at dpr {}", dpr);

        viewer.handle_resize(SurfaceMetrics::new(640.0, 480.0, dpr));
        assert_eq!(log.borrow().pixel_ratio, resized, "after resize at dpr {}", dpr);
    }
}

// ---------------------------------------------------------------------------
// Asset loading
// ---------------------------------------------------------------------------

#[test]
fn test_decode_glb_bakes_node_transform() {
    let model = decode_glb(&triangle_glb(1.0)).unwrap();

    assert_eq!(model.name.as_deref(), Some("Bakery"));
    assert_eq!(model.primitives.len(), 1);
    assert_eq!(model.triangle_count(), 1);

    let primitive = &model.primitives[0];
    assert_eq!(primitive.indices, vec![0, 1, 2]);
    assert_eq!(primitive.material, None);
    let ys: Vec<f32> = primitive.vertices.iter().map(|v| v.position[1]).collect();
    assert_eq!(ys, vec![1.0, 1.0, 2.0]);

    // No normals in the asset: generated from the face
    for vertex in &primitive.vertices {
        assert_relative_eq!(vertex.normal[2], 1.0, epsilon = 1e-6);
        assert_eq!(vertex.uv, [0.0, 0.0]);
    }
}

#[test]
fn test_decode_rejects_garbage() {
    let err = decode_glb(b"definitely not a model").unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)), "got {:?}", err);
}

#[test]
fn test_loader_reports_progress_then_success() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triangle.glb");
    std::fs::write(&path, triangle_glb(0.0)).unwrap();

    let loader = AssetLoader::spawn(&path);
    assert_eq!(loader.path(), path.as_path());

    let mut progress = Vec::new();
    let terminal = loop {
        match loader.wait(Duration::from_secs(10)).expect("loader stalled") {
            LoadEvent::Progress(fraction) => progress.push(fraction),
            other => break other,
        }
    };

    assert!(!progress.is_empty());
    assert_eq!(progress.last().copied(), Some(1.0));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(matches!(terminal, LoadEvent::Success(ref m) if m.primitives.len() == 1));
}

#[test]
fn test_loader_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let loader = AssetLoader::spawn(dir.path().join("missing.glb"));

    match loader.wait(Duration::from_secs(10)) {
        Some(LoadEvent::Failure(LoadError::Io { path, .. })) => {
            assert!(path.ends_with("missing.glb"));
        }
        other => panic!("expected an I/O failure, got {:?}", other),
    }
}

#[test]
fn test_successful_load_attaches_one_model_at_unit_scale_and_origin() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    std::fs::write(config.asset_path(), triangle_glb(0.0)).unwrap();

    let (mut viewer, _) = mount(&config, 800.0, 600.0, 1.0);
    wait_for_load(&mut viewer);

    assert_eq!(viewer.scene().model_count(), 1);
    let model = viewer.scene().model().unwrap();
    assert_eq!(model.transform.scale, Vec3::ONE);
    assert_eq!(model.transform.translation, Vec3::ZERO);
}

#[test]
fn test_failed_load_leaves_scene_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);
    wait_for_load(&mut viewer);

    assert!(viewer.scene().model().is_none());
    assert!(viewer.tick().unwrap());
    assert_eq!(log.borrow().renders, 1);
}

#[test]
fn test_only_the_first_model_is_ever_attached() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, _) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);

    let mut first = named_model("first");
    first.transform.scale = Vec3::splat(3.0);
    first.transform.translation = Vec3::new(4.0, 5.0, 6.0);

    for _ in 0..5 {
        viewer.handle_load_event(LoadEvent::Progress(0.5));
    }
    viewer.handle_load_event(LoadEvent::Success(first));
    viewer.handle_load_event(LoadEvent::Progress(1.0));
    viewer.handle_load_event(LoadEvent::Success(named_model("second")));

    let scene = viewer.scene();
    assert_eq!(scene.model_count(), 1);
    let model = scene.model().unwrap();
    assert_eq!(model.name.as_deref(), Some("first"));
    assert_eq!(model.transform.scale, Vec3::ONE);
    assert_eq!(model.transform.translation, Vec3::ZERO);
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

#[test]
fn test_tick_spins_model_by_fixed_step() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);

    // Ticks before the model arrives only draw
    viewer.tick().unwrap();
    viewer.handle_load_event(LoadEvent::Success(named_model("spinner")));
    for _ in 0..3 {
        assert!(viewer.tick().unwrap());
    }

    let rotation = viewer.scene().model().unwrap().transform.rotation;
    assert_relative_eq!(rotation.y, 3.0 * MODEL_YAW_STEP, epsilon = 1e-7);
    assert_eq!(rotation.x, 0.0);
    assert_eq!(log.borrow().renders, 4);
    assert_eq!(viewer.frame_loop().frames(), 4);
}

#[test]
fn test_damped_orbit_keeps_moving_between_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, _) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);

    viewer.apply_orbit_input(&OrbitInput {
        rotate: Vec2::new(120.0, 0.0),
        pinch: 1.0,
        ..Default::default()
    });

    let mut positions = Vec::new();
    for _ in 0..3 {
        viewer.tick().unwrap();
        positions.push(viewer.scene().camera.position);
    }
    assert_ne!(positions[0], positions[1]);
    assert_ne!(positions[1], positions[2]);

    let target = viewer.controls().target;
    let radius = CAMERA_POSITION.distance(ORBIT_TARGET);
    for position in positions {
        assert_relative_eq!(position.distance(target), radius, epsilon = 1e-4);
    }
}

#[test]
fn test_frame_loop_schedules_only_while_running() {
    let scheduler = CountingScheduler::default();
    let mut frame_loop = FrameLoop::new();

    assert_eq!(frame_loop.state(), FrameLoopState::Idle);
    assert!(!frame_loop.schedule(&scheduler));
    assert!(!frame_loop.begin_frame());

    frame_loop.start();
    assert_eq!(frame_loop.state(), FrameLoopState::Running);
    assert!(frame_loop.schedule(&scheduler));
    assert!(frame_loop.begin_frame());
    assert!(frame_loop.schedule(&scheduler));
    assert_eq!(scheduler.requests.get(), 2);

    frame_loop.cancel();
    frame_loop.start();
    assert_eq!(frame_loop.state(), FrameLoopState::Cancelled);
    assert!(!frame_loop.schedule(&scheduler));
    assert!(!frame_loop.begin_frame());
    assert_eq!(scheduler.requests.get(), 2);
    assert_eq!(frame_loop.frames(), 1);
}

// ---------------------------------------------------------------------------
// Unmount
// ---------------------------------------------------------------------------

#[test]
fn test_unmount_stops_everything_and_disposes_once() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 800.0, 600.0, 2.0);
    viewer.tick().unwrap();

    viewer.unmount();
    assert!(!viewer.is_mounted());
    assert!(!viewer.controls().is_enabled());

    // The resize listener is gone
    let size_calls = log.borrow().size_calls;
    assert!(!viewer.handle_resize(SurfaceMetrics::new(300.0, 200.0, 2.0)));
    assert_relative_eq!(viewer.scene().camera.aspect, 800.0 / 600.0, epsilon = 1e-5);
    assert_eq!(log.borrow().size_calls, size_calls);

    // A frame already queued by the platform does nothing
    let scheduler = CountingScheduler::default();
    assert!(!viewer.schedule_frame(&scheduler));
    assert_eq!(scheduler.requests.get(), 0);
    assert!(!viewer.tick().unwrap());
    assert_eq!(log.borrow().renders, 1);

    viewer.unmount();
    drop(viewer);
    assert_eq!(log.borrow().disposals, 1);
}

#[test]
fn test_dropping_a_mounted_viewer_disposes_it() {
    let dir = tempfile::tempdir().unwrap();
    let (viewer, log) = mount(&config_for(dir.path()), 800.0, 600.0, 1.0);
    drop(viewer);
    assert_eq!(log.borrow().disposals, 1);
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn test_mount_dark_resize_unmount_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (mut viewer, log) = mount(&config_for(dir.path()), 1600.0, 600.0, 3.0);
    assert_relative_eq!(viewer.scene().camera.aspect, 2.667, epsilon = 1e-3);
    assert_eq!(log.borrow().pixel_ratio, 3.0);

    viewer.select_background(BackgroundPreset::Dark);
    assert_eq!(viewer.state().container_token(), "bg-gray-900");
    assert_eq!(log.borrow().clear_color, Some(ClearColor(0x222222)));

    viewer.handle_resize(SurfaceMetrics::new(800.0, 600.0, 3.0));
    assert_relative_eq!(viewer.scene().camera.aspect, 1.333, epsilon = 1e-3);
    assert_eq!(log.borrow().pixel_ratio, 2.0);

    viewer.tick().unwrap();
    let renders = log.borrow().renders;
    viewer.unmount();
    for _ in 0..3 {
        assert!(!viewer.tick().unwrap());
    }
    assert_eq!(log.borrow().renders, renders);
    assert_eq!(log.borrow().disposals, 1);
}
