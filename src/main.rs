//! Particle Fountain
//!
//! Hold a mouse button to spray particles from the cursor. Up to 512×512
//! particles are integrated and drawn on the GPU every display refresh.

mod backend;

use backend::GpuBackend;
use particle_renderer::ParticleRenderer;
use particle_simulation::{
    request_device, FrameScheduler, GpuSimulation, PointerState, SimulationConfig,
    SimulationError, Viewport,
};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const WINDOW_TITLE: &str = "Particle Fountain";

/// Button bit as reported by DOM-style `buttons` masks
fn button_bit(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 1,
        MouseButton::Right => 2,
        MouseButton::Middle => 4,
        MouseButton::Back => 8,
        MouseButton::Forward => 16,
        MouseButton::Other(_) => 0,
    }
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,

    scheduler: FrameScheduler<GpuBackend>,
    capacity: u64,
}

impl GpuState {
    async fn new(window: Arc<Window>, sim_config: SimulationConfig) -> Result<Self, SimulationError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| SimulationError::Device {
                operation: "surface creation",
                message: e.to_string(),
            })?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        let (device, queue) = request_device(&adapter, &sim_config).await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| SimulationError::Device {
                operation: "surface configuration",
                message: "surface reports no supported formats".to_string(),
            })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            // One tick per display refresh
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let simulation = GpuSimulation::new(device.clone(), queue, sim_config)?;
        log::info!("✓ Simulation initialized");

        let renderer = ParticleRenderer::new(
            &device,
            &config,
            sim_config.grid_side,
            sim_config.point_size,
        );
        log::info!("✓ Renderer initialized");

        let backend = GpuBackend::new(simulation, renderer, window.scale_factor() as f32);
        let scheduler = FrameScheduler::new(backend, sim_config.block_size);

        Ok(Self {
            surface,
            device,
            config,
            scheduler,
            capacity: sim_config.capacity(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.scheduler
                .backend_mut()
                .resize(&self.device, &self.config);
            log::debug!("Resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Run one tick. `Ok(false)` means the surface was not ready and the tick
    /// was skipped.
    fn render(&mut self, window: &Window, pointer: PointerState) -> Result<bool, SimulationError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                self.resize(window.inner_size());
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(false),
            Err(e) => {
                return Err(SimulationError::Device {
                    operation: "surface acquire",
                    message: e.to_string(),
                })
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let pixel_ratio = window.scale_factor() as f32;
        let viewport = Viewport::new(self.config.width, self.config.height, pixel_ratio);
        self.scheduler.backend_mut().set_pixel_ratio(pixel_ratio);

        let capacity = self.capacity;
        let mut counter = |count: u64| {
            window.set_title(&format!("{WINDOW_TITLE} - {count} / {capacity} particles"));
        };

        let report = self
            .scheduler
            .frame(pointer, viewport, &view, &mut counter)?;
        if report.injected {
            log::debug!(
                "tick {}: {} particles drawn",
                report.tick,
                report.draw.count
            );
        }

        output.present();
        Ok(true)
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    sim_config: SimulationConfig,

    // Sampled once per tick; mutated by input events in between
    pointer: PointerState,

    fatal: Option<SimulationError>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        log::error!("Fatal: {error}");
        self.fatal = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop
            .create_window(Window::default_attributes().with_title(WINDOW_TITLE))
        {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GpuState::new(window.clone(), self.sim_config)) {
            Ok(gpu_state) => {
                self.gpu_state = Some(gpu_state);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                // Logical pixels; the injection math scales by the pixel ratio
                let scale = self
                    .window
                    .as_ref()
                    .map_or(1.0, |window| window.scale_factor());
                self.pointer.x = (position.x / scale) as f32;
                self.pointer.y = (position.y / scale) as f32;
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let bit = button_bit(button);
                match state {
                    ElementState::Pressed => self.pointer.buttons |= bit,
                    ElementState::Released => self.pointer.buttons &= !bit,
                }
            }

            WindowEvent::CursorLeft { .. } => {
                self.pointer.buttons = 0;
            }

            WindowEvent::RedrawRequested => {
                if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
                    if let Err(e) = gpu_state.render(window, self.pointer) {
                        self.fail(event_loop, e);
                        return;
                    }
                }
            }

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting particle fountain...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        window: None,
        gpu_state: None,
        sim_config: SimulationConfig::default(),
        pointer: PointerState::default(),
        fatal: None,
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {e}");
        std::process::exit(1);
    }

    if app.fatal.is_some() {
        std::process::exit(1);
    }
}
