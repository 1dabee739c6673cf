//! Native window hosting the viewer, using wgpu + winit + egui

use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::error::{RenderError, ViewerError};
use crate::gpu::{GpuContext, SceneRenderer};
use crate::layout::SurfaceMetrics;

use super::ui::{self, UiActions};
use super::viewer::{Viewer, ViewerConfig};

/// egui integration: input translation, painter and the registered canvas
struct EguiLayer {
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    /// Canvas texture id and the canvas generation it currently points at
    canvas_texture: Option<(egui::TextureId, u64)>,
}

/// Everything that exists while the viewer is mounted in a window
struct ViewerSession {
    window: Arc<Window>,
    gpu: GpuContext,
    egui: EguiLayer,
    viewer: Viewer<SceneRenderer>,
    config: ViewerConfig,
}

impl ViewerSession {
    fn new(window: Arc<Window>, config: ViewerConfig) -> Result<Self, ViewerError> {
        let gpu = GpuContext::new(window.clone())?;

        let renderer = SceneRenderer::new(gpu.device.clone(), gpu.queue.clone(), config.msaa_samples);
        let metrics = config.layout.measure(gpu.size, gpu.scale_factor());
        let viewer = Viewer::mount(&config, metrics, renderer);

        let egui_ctx = egui::Context::default();
        let state = egui_winit::State::new(
            egui_ctx,
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );
        let renderer = egui_wgpu::Renderer::new(&gpu.device, gpu.format(), None, 1, false);

        Ok(Self {
            window,
            gpu,
            egui: EguiLayer {
                state,
                renderer,
                canvas_texture: None,
            },
            viewer,
            config,
        })
    }

    fn measure(&self) -> SurfaceMetrics {
        self.config.layout.measure(self.gpu.size, self.gpu.scale_factor())
    }

    fn resize(&mut self, size: (u32, u32)) {
        self.gpu.resize(size);
        let metrics = self.measure();
        self.viewer.handle_resize(metrics);
    }

    fn redraw(&mut self) {
        self.viewer.poll_assets();

        let raw_input = self.egui.state.take_egui_input(&self.window);
        let egui_ctx = self.egui.state.egui_ctx().clone();
        let state = *self.viewer.state();
        let metrics = self.viewer.metrics();
        let canvas = self.egui.canvas_texture.map(|(id, _)| id);

        let mut actions = UiActions::default();
        let full_output = egui_ctx.run(raw_input, |ctx| {
            actions = ui::draw(ctx, &state, (metrics.width, metrics.height), canvas);
        });
        self.egui
            .state
            .handle_platform_output(&self.window, full_output.platform_output);

        if let Some(preset) = actions.preset {
            self.viewer.select_background(preset);
        }
        self.viewer.apply_orbit_input(&actions.orbit);

        if let Err(e) = self.viewer.tick() {
            log::error!("Render error: {}", e);
        }
        self.sync_canvas_texture();

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui
                .renderer
                .update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }

        if let Err(e) = self.paint(&paint_jobs, full_output.pixels_per_point) {
            log::error!("UI paint error: {}", e);
        }

        for id in &full_output.textures_delta.free {
            self.egui.renderer.free_texture(id);
        }
    }

    /// Point the egui canvas texture at the renderer's current canvas
    fn sync_canvas_texture(&mut self) {
        let Some(renderer) = self.viewer.rasterizer() else {
            return;
        };
        let Some(view) = renderer.canvas_view() else {
            return;
        };
        let generation = renderer.canvas_generation();

        match self.egui.canvas_texture {
            Some((_, current)) if current == generation => {}
            Some((id, _)) => {
                self.egui.renderer.update_egui_texture_from_wgpu_texture(
                    &self.gpu.device,
                    view,
                    wgpu::FilterMode::Linear,
                    id,
                );
                self.egui.canvas_texture = Some((id, generation));
            }
            None => {
                let id = self.egui.renderer.register_native_texture(
                    &self.gpu.device,
                    view,
                    wgpu::FilterMode::Linear,
                );
                self.egui.canvas_texture = Some((id, generation));
            }
        }
    }

    fn paint(
        &mut self,
        paint_jobs: &[egui::ClippedPrimitive],
        pixels_per_point: f32,
    ) -> Result<(), RenderError> {
        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
            pixels_per_point,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });
        let ui_commands = self.egui.renderer.update_buffers(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            paint_jobs,
            &screen_descriptor,
        );

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("UI Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.egui
                .renderer
                .render(&mut pass, paint_jobs, &screen_descriptor);
        }

        self.gpu
            .queue
            .submit(ui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }

    fn unmount(&mut self) {
        self.viewer.unmount();
        if let Some((id, _)) = self.egui.canvas_texture.take() {
            self.egui.renderer.free_texture(&id);
        }
    }
}

/// Application handler for winit event loop
struct ViewerApp {
    config: ViewerConfig,
    session: Option<ViewerSession>,
}

impl ViewerApp {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    fn mount(&self, event_loop: &ActiveEventLoop) -> Result<ViewerSession, ViewerError> {
        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        ViewerSession::new(window, self.config.clone())
    }

    fn unmount(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.unmount();
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }

        match self.mount(event_loop) {
            Ok(session) => {
                log::info!("Loading model from {}", self.config.asset_path().display());
                self.session = Some(session);
            }
            Err(e) => {
                log::error!("Failed to mount viewer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let session = match &mut self.session {
            Some(s) => s,
            None => return,
        };

        let _ = session.egui.state.on_window_event(&session.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                self.unmount();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                session.resize((size.width, size.height));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = session.window.inner_size();
                session.resize((size.width, size.height));
            }

            WindowEvent::RedrawRequested => {
                session.redraw();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.viewer.schedule_frame(&*session.window);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.unmount();
    }
}

/// Open the viewer window and run until it is closed
pub fn run_viewer(config: ViewerConfig) -> Result<(), ViewerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
