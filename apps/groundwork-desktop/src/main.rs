use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use groundwork_physics::ChainWorld;
use groundwork_render::ShaderHandle;
use groundwork_render_wgpu::{FollowCamera, WgpuBackend};
use groundwork_terrain::{GroundActor, LoadReport, TerrainConfig};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const GROUND_COLOR: [f32; 4] = [0.36, 0.62, 0.28, 1.0];

#[derive(Parser)]
#[command(name = "groundwork-desktop", about = "Scroll over streamed ground")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Terrain config file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera scroll speed in world units per second
    #[arg(short, long, default_value = "10")]
    speed: f32,
}

/// Everything that is not GPU plumbing.
struct AppState {
    terrain: TerrainConfig,
    physics: ChainWorld,
    camera: FollowCamera,
    show_stats: bool,
    keys_held: HashSet<KeyCode>,
    last_frame: Instant,
    last_report: Option<LoadReport>,
}

impl AppState {
    fn new(terrain: TerrainConfig, speed: f32) -> Self {
        Self {
            terrain,
            physics: ChainWorld::new(),
            camera: FollowCamera::with_speed(speed),
            show_stats: true,
            keys_held: HashSet::new(),
            last_frame: Instant::now(),
            last_report: None,
        }
    }

    fn scroll_direction(&self) -> f32 {
        let left = self.keys_held.contains(&KeyCode::ArrowLeft)
            || self.keys_held.contains(&KeyCode::KeyA);
        let right = self.keys_held.contains(&KeyCode::ArrowRight)
            || self.keys_held.contains(&KeyCode::KeyD);
        match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    fn update(&mut self, ground: &GroundActor, dt: f32) {
        let boost = if self.keys_held.contains(&KeyCode::ShiftLeft) {
            4.0
        } else {
            1.0
        };
        self.camera.scroll(self.scroll_direction() * boost, dt);
        let target = ground.height_at(self.camera.position.x);
        self.camera.follow_height(target, dt);
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_held.insert(key);
        } else {
            self.keys_held.remove(&key);
        }

        if !pressed {
            return;
        }

        match key {
            KeyCode::F1 => {
                self.show_stats = !self.show_stats;
            }
            KeyCode::Home => {
                self.camera.position.x = 0.0;
                tracing::info!("camera reset to origin");
            }
            _ => {}
        }
    }

    fn draw_ui(&self, ctx: &EguiContext, ground: &GroundActor, mesh_count: usize) {
        if !self.show_stats {
            return;
        }

        let stats = ground.stats();
        egui::Window::new("Ground")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Camera: ({:.1}, {:.1})",
                    self.camera.position.x, self.camera.position.y
                ));
                let (lo, hi) = self.camera.visible_x();
                ui.label(format!("Visible x: {lo:.1} .. {hi:.1}"));
                ui.separator();

                ui.heading("Streaming");
                if let Some(center) = stats.last_center {
                    ui.label(format!("Center chunk: {center}"));
                }
                ui.label(format!("Resident: {:?}", ground.ring().resident_indices()));
                ui.label(format!("Loads: {}", stats.loads));
                ui.label(format!(
                    "Built: {}  Evicted: {}",
                    stats.chunks_built, stats.chunks_evicted
                ));
                ui.label(format!("Last load: {:?}", stats.last_load));
                if let Some(report) = &self.last_report {
                    if !report.is_noop() {
                        ui.label(format!(
                            "Last change: +{:?} -{:?}",
                            report.built, report.evicted
                        ));
                    }
                }
                ui.separator();

                ui.heading("Resources");
                ui.label(format!(
                    "Fixtures: {}",
                    self.physics.total_fixtures()
                ));
                ui.label(format!("Meshes: {mesh_count}"));
                ui.label(format!(
                    "Chunk: {} x {} = {:.1} units",
                    self.terrain.chunk_size,
                    self.terrain.resolution,
                    self.terrain.chunk_width()
                ));

                ui.separator();
                ui.small("F1: Toggle Stats | Left/Right or A/D: Scroll | Shift: Fast | Home: Origin");
            });
    }
}

/// GPU objects that only exist once the window does.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    backend: WgpuBackend,
    shader: ShaderHandle,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    ground: Option<GroundActor>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(terrain: TerrainConfig, speed: f32) -> Self {
        Self {
            state: AppState::new(terrain, speed),
            gpu: None,
            ground: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Groundwork")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("groundwork_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        self.state.camera.set_viewport(config.width, config.height);

        // Headroom over the window so a debug overlay can add draws.
        let max_draws = self.state.terrain.window_length as usize * 2;
        let mut backend = WgpuBackend::new(device.clone(), queue, surface_format, max_draws);
        let shader = backend.create_ground_shader(GROUND_COLOR);

        let ground = GroundActor::new(
            &mut self.state.physics,
            &mut backend,
            self.state.terrain.clone(),
        )?;

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        self.ground = Some(ground);
        self.gpu = Some(Gpu {
            window,
            surface,
            config,
            backend,
            shader,
            egui_winit,
            egui_renderer,
        });
        Ok(())
    }

    /// Release the ground through the backends that created it.
    fn shutdown(&mut self) {
        let (Some(ground), Some(gpu)) = (self.ground.take(), self.gpu.as_mut()) else {
            return;
        };
        match ground.destroy(&mut self.state.physics, &mut gpu.backend) {
            Ok(()) => tracing::info!(
                fixtures = self.state.physics.total_fixtures(),
                "ground released"
            ),
            Err(e) => tracing::error!("failed to release ground: {e}"),
        }
    }

    fn frame(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;

        let (Some(gpu), Some(ground)) = (self.gpu.as_mut(), self.ground.as_mut()) else {
            return Ok(());
        };

        self.state.update(ground, dt);
        let report = ground.load(
            &mut self.state.physics,
            &mut gpu.backend,
            self.state.camera.position.x,
        )?;
        if !report.is_noop() {
            tracing::debug!(
                center = report.window.center,
                built = ?report.built,
                evicted = ?report.evicted,
                "ground window moved"
            );
            self.state.last_report = Some(report);
        }

        ground.draw(&mut gpu.backend, gpu.shader, self.state.camera.view_projection())?;

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(gpu.backend.device(), &gpu.config);
                // Drop this frame's queued draws along with the frame.
                gpu.backend.discard_queued();
                return Ok(());
            }
            Err(e) => {
                gpu.backend.discard_queued();
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.backend.render(&view);

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let mesh_count = gpu.backend.mesh_count();
        let state = &self.state;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx, ground, mesh_count);
        });

        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let device = gpu.backend.device().clone();
        let queue = gpu.backend.queue().clone();
        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&device, &queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        gpu.egui_renderer.update_buffers(
            &device,
            &queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            tracing::error!("failed to initialize: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(gpu.backend.device(), &gpu.config);
                    self.state
                        .camera
                        .set_viewport(gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape && key_state == ElementState::Pressed {
                    self.shutdown();
                    event_loop.exit();
                    return;
                }
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    tracing::error!("frame failed: {e:#}");
                    self.shutdown();
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let terrain = match &cli.config {
        Some(path) => TerrainConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TerrainConfig::default(),
    };

    tracing::info!("groundwork-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(terrain, cli.speed);
    event_loop.run_app(&mut app)?;

    Ok(())
}
