use anyhow::Context as _;
use clap::Parser;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

// Import from the library crate
use ambler::{
    config, error, logging, ui,
    view, controller,
};

use config::Settings;
use controller::{Effects, Game, InputEvent};
use error::AppError;
use view::{GpuContext, OverlayFrame, SceneRenderer};

#[derive(Parser, Debug)]
#[command(version, about = "First-person walking simulator")]
struct Args {
    /// JSON settings file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Number of walls to build (1 or 2)
    #[arg(long)]
    walls: Option<u8>,
}

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: SceneRenderer,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    game: Game,
    backend: String,
    started: Instant,
}

impl App {
    async fn new(window: Arc<Window>, settings: Settings) -> Result<Self, AppError> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone(), size.width, size.height).await?;
        let backend = format!("{:?}", gpu.adapter_info.backend);

        let game = Game::new(settings, size.width, size.height);
        let renderer = SceneRenderer::new(&gpu, &game.controller.scene);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            gpu,
            renderer,
            egui_state,
            egui_ctx,
            game,
            backend,
            started: Instant::now(),
        })
    }

    fn dispatch(&mut self, event: InputEvent) {
        let effects = self.game.handle_event(&event);
        self.apply(effects);
    }

    /// Carry out what the game asked for
    fn apply(&mut self, mut effects: Effects) {
        if effects.lock_pointer {
            effects.request_frame |= self.grab_cursor().request_frame;
        }
        if effects.unlock_pointer {
            effects.request_frame |= self.release_cursor().request_frame;
        }
        if effects.request_frame {
            self.window.request_redraw();
        }
    }

    fn grab_cursor(&mut self) -> Effects {
        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                self.window.set_cursor_visible(false);
                self.game.handle_event(&InputEvent::PointerLockChanged { locked: true })
            }
            Err(e) => self
                .game
                .pointer_lock_failed(&AppError::Platform(format!("cursor grab failed: {e}"))),
        }
    }

    fn release_cursor(&mut self) -> Effects {
        if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            tracing::warn!(error = %e, "failed to release cursor");
        }
        self.window.set_cursor_visible(true);
        self.game.handle_event(&InputEvent::PointerLockChanged { locked: false })
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // egui only needs to see events here; the HUD takes no input
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);

        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, physical_key, repeat, .. }, .. } => {
                if let PhysicalKey::Code(code) = physical_key {
                    // winit's variant names match the DOM `code` strings
                    let code = format!("{code:?}");
                    let event = match state {
                        ElementState::Pressed => InputEvent::KeyDown { code, repeat: *repeat },
                        ElementState::Released => InputEvent::KeyUp(code),
                    };
                    self.dispatch(event);
                }
                true
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                self.dispatch(InputEvent::PointerPressed);
                true
            }
            WindowEvent::Focused(false) => {
                let effects = self.release_cursor();
                self.apply(effects);
                true
            }
            _ => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gpu.resize(new_size.width, new_size.height);
            let effects = self.game.resize(new_size.width, new_size.height);
            self.apply(effects);
        }
    }

    fn run_ui(&mut self) -> OverlayFrame {
        let hud = ui::Hud::capture(&self.game, &self.backend);
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let output = self.egui_ctx.run(raw_input, |ctx| ui::draw_hud(ctx, &hud));
        self.egui_state.handle_platform_output(&self.window, output.platform_output);

        let pixels_per_point = output.pixels_per_point;
        OverlayFrame {
            primitives: self.egui_ctx.tessellate(output.shapes, pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point,
        }
    }

    fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = self.started.elapsed().as_secs_f64() * 1000.0;
        self.game.begin_frame(now);

        let overlay = self.run_ui();
        let ctl = &self.game.controller;
        let drawn = self.renderer.draw(&self.gpu, &ctl.scene, &ctl.camera, Some(overlay));

        let effects = self.game.end_frame();
        self.apply(effects);
        drawn
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_with(if args.verbose { "debug,wgpu_core=warn,wgpu_hal=warn,naga=warn" } else { logging::DEFAULT_FILTER });

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(walls) = args.walls {
        settings.scene.walls = walls;
    }
    settings.validate()?;

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("Ambler")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window, settings))?;
    let effects = app.game.boot();
    app.apply(effects);
    tracing::info!(backend = %app.backend, "ambler ready");

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            match app.redraw() {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    let size = app.window.inner_size();
                                    app.gpu.resize(size.width, size.height);
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                                Err(e) => tracing::error!(error = %e, "frame dropped"),
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
                app.dispatch(InputEvent::MouseMove { dx: delta.0 as f32, dy: delta.1 as f32 });
            }
            _ => {}
        }
    })?;
    Ok(())
}
