//! Cadence demo - paces an animated clear colour into a resizable window
//!
//! Resize, minimize and restore the window to exercise chain rebuilds.
//! Build with `--features vulkan-validation` to route validation layer
//! messages into the engine logger.

use cadence_engine::cadence::chain::PresentableChain;
use cadence_engine::cadence::device::{CommandBufferHandle, Extent2D, PresentationSurface, RenderPassHandle};
use cadence_engine::cadence::log::LogSeverity;
use cadence_engine::cadence::{Config, Engine, FramePacer, PacerStats, RecordTarget, Result};
use cadence_engine::{engine_error, engine_info};
use cadence_engine_vulkan::{VulkanContext, VulkanDevice, VulkanSurface};
use glam::Vec3;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const STATS_INTERVAL: Duration = Duration::from_secs(1);

struct Renderer {
    device: VulkanDevice,
    pacer: Option<FramePacer<VulkanDevice, VulkanSurface>>,
    render_pass: RenderPassHandle,
    start: Instant,
    last_report: Instant,
    reported: PacerStats,
}

impl Renderer {
    fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let context = Arc::new(VulkanContext::new(window.as_ref(), config)?);
        let device = VulkanDevice::new(context.clone());
        let surface = VulkanSurface::new(context, window);

        let caps = surface.capabilities()?;
        let format = PresentableChain::select_format(&caps, config)?;
        let render_pass = device.create_present_render_pass(format.format)?;
        let pacer = match FramePacer::new(device.clone(), surface, render_pass, config.clone()) {
            Ok(pacer) => pacer,
            Err(e) => {
                device.destroy_render_pass(render_pass);
                return Err(e);
            }
        };

        let now = Instant::now();
        Ok(Self {
            device,
            pacer: Some(pacer),
            render_pass,
            start: now,
            last_report: now,
            reported: PacerStats::default(),
        })
    }

    fn clear_color(&self) -> [f32; 4] {
        let t = self.start.elapsed().as_secs_f32();
        let phase = Vec3::new(t, t + 2.094, t + 4.188);
        let rgb = Vec3::new(phase.x.cos(), phase.y.cos(), phase.z.cos()) * 0.5 + Vec3::splat(0.5);
        rgb.extend(1.0).to_array()
    }

    fn render_frame(&mut self) -> Result<()> {
        let color = self.clear_color();
        let device = &self.device;
        let Some(pacer) = self.pacer.as_mut() else {
            return Ok(());
        };

        let mut record = |target: &RecordTarget, command_buffer: CommandBufferHandle| {
            device.record_clear_pass(command_buffer, target, color);
        };
        pacer.run_once(&mut record)?;

        if self.last_report.elapsed() >= STATS_INTERVAL {
            let stats = pacer.stats();
            let seconds = self.last_report.elapsed().as_secs_f64();
            engine_info!(
                "cadence::demo",
                "{:.1} fps | rebuilds {} | deferred {} | owner waits {}",
                (stats.frames_presented - self.reported.frames_presented) as f64 / seconds,
                stats.rebuilds,
                stats.deferred_frames,
                stats.owner_waits
            );
            self.reported = stats;
            self.last_report = Instant::now();
        }
        Ok(())
    }

    fn resized(&mut self, extent: Extent2D) {
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.notify_resized(extent);
        }
    }

    fn shutdown(&mut self) {
        if let Some(pacer) = self.pacer.take() {
            let stats = pacer.stats();
            if let Err(e) = pacer.shutdown() {
                engine_error!("cadence::demo", "Shutdown failed: {}", e);
            }
            engine_info!(
                "cadence::demo",
                "Presented {} frames with {} rebuilds",
                stats.frames_presented,
                stats.rebuilds
            );
            self.device.destroy_render_pass(self.render_pass);
        }
    }
}

struct App {
    config: Config,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
        }
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Cadence Demo")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
            .with_resizable(true);
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                engine_error!("cadence::demo", "Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(window.clone(), &self.config) {
            Ok(renderer) => {
                engine_info!("cadence::demo", "Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                engine_error!("cadence::demo", "Failed to create renderer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                engine_info!("cadence::demo", "Close requested, shutting down");
                self.exit(event_loop);
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resized(Extent2D::new(size.width, size.height));
                }
            }
            WindowEvent::RedrawRequested => {
                let result = match self.renderer.as_mut() {
                    Some(renderer) => renderer.render_frame(),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    engine_error!("cadence::demo", "Frame failed: {}", e);
                    self.exit(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    Engine::set_min_severity(LogSeverity::Info);
    engine_info!("cadence::demo", "Starting Cadence demo");

    let config = Config {
        enable_validation: cfg!(feature = "vulkan-validation"),
        app_name: "Cadence Demo".to_string(),
        ..Config::default()
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    #[cfg(feature = "vulkan-validation")]
    cadence_engine_vulkan::print_validation_stats_report();

    Ok(())
}
