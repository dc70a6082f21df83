// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod physics;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue, prelude::wasm_bindgen};
#[cfg(target_arch = "wasm32")]
use web_sys::{Window, Document, HtmlCanvasElement, KeyboardEvent, MouseEvent, Event};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;

#[cfg(target_arch = "wasm32")]
use controller::{Effects, Game, InputEvent};
#[cfg(target_arch = "wasm32")]
use controller::input::wasm::{keyboard_event_to_input, mouse_move_to_input};
#[cfg(target_arch = "wasm32")]
use error::AppError;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, OverlayFrame, SceneRenderer};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(window, document, canvas).await
}

/// Everything one browser tab runs
#[cfg(target_arch = "wasm32")]
struct WebApp {
    game: Game,
    gpu: GpuContext,
    renderer: SceneRenderer,
    egui_ctx: egui::Context,
    backend: String,
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
}

#[cfg(target_arch = "wasm32")]
impl WebApp {
    /// One animation frame: simulate if running, then draw
    fn frame(&mut self, now: f64) {
        // this frame is the redraw a resize would ask for; begin_frame clears it
        let _ = self.sync_canvas_size();
        self.game.begin_frame(now);

        let hud = ui::Hud::capture(&self.game, &self.backend);
        let dpr = self.window.device_pixel_ratio() as f32;
        let (width, height) = self.gpu.size();
        let mut full_output = ui::build_ui(&self.egui_ctx, &hud, width, height, dpr, now);
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
        let overlay = OverlayFrame {
            primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point: dpr,
        };

        let ctl = &self.game.controller;
        match self.renderer.draw(&self.gpu, &ctl.scene, &ctl.camera, Some(overlay)) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.resize(width, height);
            }
            Err(e) => tracing::error!(error = %e, "frame dropped"),
        }
    }

    fn sync_canvas_size(&mut self) -> Effects {
        let (width, height) = window_size(&self.window);
        if (width, height) == self.gpu.size() {
            return Effects::default();
        }
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.gpu.resize(width, height);
        tracing::debug!(width, height, "canvas resized");
        self.game.resize(width, height)
    }

    fn pointer_lock_supported(&self) -> bool {
        js_sys::Reflect::has(&self.canvas, &JsValue::from_str("requestPointerLock")).unwrap_or(false)
    }

    /// Carry out what the game asked for
    fn apply(&mut self, mut effects: Effects, scheduler: &FrameScheduler) {
        if effects.lock_pointer {
            if self.pointer_lock_supported() {
                self.canvas.request_pointer_lock();
            } else {
                let failed = self.game.pointer_lock_failed(&AppError::PointerLockUnsupported);
                effects.request_frame |= failed.request_frame;
            }
        }
        if effects.unlock_pointer {
            self.document.exit_pointer_lock();
        }
        if effects.request_frame {
            if let Err(e) = scheduler.request() {
                tracing::error!(error = ?e, "requestAnimationFrame failed");
            }
        }
    }
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
) -> Result<(), JsValue> {
    // browser builds have no config file to read
    let settings = config::Settings::default();

    let (width, height) = (canvas.width(), canvas.height());
    let gpu = GpuContext::new(&canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
    let backend = format!("{:?}", gpu.adapter_info.backend);

    let game = Game::new(settings, width, height);
    let renderer = SceneRenderer::new(&gpu, &game.controller.scene);

    let app = Rc::new(RefCell::new(WebApp {
        game,
        gpu,
        renderer,
        egui_ctx: egui::Context::default(),
        backend,
        window: window.clone(),
        document: document.clone(),
        canvas: canvas.clone(),
    }));

    let scheduler = FrameScheduler::new(window.clone());
    scheduler.install({
        let app = app.clone();
        let scheduler = scheduler.clone();
        move |now: f64| {
            let mut app = app.borrow_mut();
            app.frame(now);
            let effects = app.game.end_frame();
            app.apply(effects, &scheduler);
        }
    });

    setup_input_listeners(&window, &document, &canvas, app.clone(), scheduler.clone())?;

    let mut app = app.borrow_mut();
    let effects = app.game.boot();
    app.apply(effects, &scheduler);
    tracing::info!("ambler ready");
    Ok(())
}

/// Route a platform event through the game and act on the result
#[cfg(target_arch = "wasm32")]
fn dispatch(app: &Rc<RefCell<WebApp>>, scheduler: &FrameScheduler, event: InputEvent) {
    let mut app = app.borrow_mut();
    let effects = app.game.handle_event(&event);
    app.apply(effects, scheduler);
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
    app: Rc<RefCell<WebApp>>,
    scheduler: FrameScheduler,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            // keep the page from scrolling
            if matches!(
                e.code().as_str(),
                "Space" | "ArrowUp" | "ArrowDown" | "ArrowLeft" | "ArrowRight"
            ) {
                e.prevent_default();
            }
            dispatch(&app, &scheduler, keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            dispatch(&app, &scheduler, keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Pointer lock change
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            tracing::debug!(locked, "pointer lock changed");
            dispatch(&app, &scheduler, InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Pointer lock refused by the browser
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let ple = Closure::wrap(Box::new(move |_e: Event| {
            let mut app = app.borrow_mut();
            let effects = app
                .game
                .pointer_lock_failed(&AppError::Platform("pointer lock request was refused".into()));
            app.apply(effects, &scheduler);
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockerror", ple.as_ref().unchecked_ref())?;
        ple.forget();
    }

    // Canvas click starts or resumes
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let click = Closure::wrap(Box::new(move |_e: MouseEvent| {
            dispatch(&app, &scheduler, InputEvent::PointerPressed);
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }

    // Mouse move
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            dispatch(&app, &scheduler, mouse_move_to_input(&e));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Window resize redraws even while paused
    {
        let app = app.clone();
        let scheduler = scheduler.clone();
        let resize = Closure::wrap(Box::new(move |_e: Event| {
            let mut app = app.borrow_mut();
            let effects = app.sync_canvas_size();
            app.apply(effects, &scheduler);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;
        resize.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let width = window.inner_width().ok().and_then(|w| w.as_f64()).unwrap_or(800.0);
    let height = window.inner_height().ok().and_then(|h| h.as_f64()).unwrap_or(600.0);
    ((width as u32).max(1), (height as u32).max(1))
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    let (width, height) = window_size(&window);
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// One requestAnimationFrame callback, scheduled on demand. Each frame
/// decides whether to ask for the next, so stopping the chain is just not
/// asking again.
#[cfg(target_arch = "wasm32")]
#[derive(Clone)]
struct FrameScheduler {
    callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl FrameScheduler {
    fn new(window: Window) -> Self {
        Self {
            callback: Rc::new(RefCell::new(None)),
            window,
        }
    }

    /// The closure holds a clone of the scheduler, so the pair lives for
    /// the rest of the page's lifetime.
    fn install(&self, f: impl FnMut(f64) + 'static) {
        *self.callback.borrow_mut() = Some(Closure::wrap(Box::new(f) as Box<dyn FnMut(f64)>));
    }

    fn request(&self) -> Result<(), JsValue> {
        let callback = self.callback.borrow();
        let callback = callback
            .as_ref()
            .ok_or_else(|| js_error("frame callback not installed"))?;
        self.window
            .request_animation_frame(callback.as_ref().unchecked_ref())?;
        Ok(())
    }
}
