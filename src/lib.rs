pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use app::Turntable;
pub use config::SceneConfig;
pub use error::Error;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Event, HtmlCanvasElement, PointerEvent, Window};

    use crate::controller::input::wasm::EventSubscription;
    use crate::controller::{FrameCallback, FrameScheduler, InputEvent, InputState};
    use crate::model::{DefaultLoader, ViewportHandle, ViewportState};
    use crate::ui::QueuedInput;
    use crate::view::{DebugOverlay, GpuContext, Renderer};
    use crate::{logging, SceneConfig, Turntable};

    const CANVAS_ID: &str = "turntable";

    /// Everything that must live as long as the page shows the scene
    struct WebScene {
        _app: Rc<Turntable>,
        _subscriptions: Vec<EventSubscription>,
    }

    thread_local! {
        static SCENE: RefCell<Option<WebScene>> = const { RefCell::new(None) };
    }

    /// One `requestAnimationFrame` per submitted frame
    struct AnimationFrameScheduler {
        window: Window,
    }

    impl FrameScheduler for AnimationFrameScheduler {
        fn schedule_next_frame(&self, frame: FrameCallback) {
            let callback = Closure::once_into_js(move || frame());
            if let Err(e) = self.window.request_animation_frame(callback.unchecked_ref()) {
                tracing::error!(error = ?e, "requestAnimationFrame failed");
            }
        }
    }

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        logging::init();
        let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
        let canvas = find_or_create_canvas(&window)?;
        let config = match canvas.get_attribute("data-config") {
            Some(json) => SceneConfig::from_json(&json).map_err(js_error)?,
            None => SceneConfig::default(),
        };

        let viewport = ViewportHandle::new(window_viewport(&window, config.max_pixel_ratio));
        resize_canvas(&canvas, &viewport.get());
        let gpu = GpuContext::new(&canvas, viewport.get().width, viewport.get().height)
            .await
            .map_err(js_error)?;

        let app = Rc::new(Turntable::new(config, viewport.clone()).map_err(js_error)?);
        let mut renderer = Renderer::new(gpu);
        let overlay = if app.config().debug_panel {
            let ctx = egui::Context::default();
            let input = QueuedInput::default();
            let overlay = DebugOverlay::new(ctx.clone(), &renderer.gpu().device, renderer.gpu().format, Box::new(input.clone()));
            renderer = renderer.with_overlay(overlay);
            Some((ctx, input))
        } else {
            None
        };

        let subscriptions = subscribe(&window, &canvas, app.clone(), overlay)?;
        let scheduler = Rc::new(AnimationFrameScheduler { window: window.clone() });
        app.load_model(&DefaultLoader::default(), scheduler, Box::new(renderer));

        SCENE.with(|scene| {
            *scene.borrow_mut() = Some(WebScene { _app: app, _subscriptions: subscriptions });
        });
        Ok(())
    }

    fn apply(app: &Turntable, events: impl IntoIterator<Item = InputEvent>) {
        for event in events {
            // Rejected samples are already logged by the controller
            let _ = app.handle_input(&event);
        }
    }

    fn subscribe(
        window: &Window,
        canvas: &HtmlCanvasElement,
        app: Rc<Turntable>,
        overlay: Option<(egui::Context, QueuedInput)>,
    ) -> Result<Vec<EventSubscription>, JsValue> {
        let input = Rc::new(RefCell::new(InputState::new()));
        let mut on_canvas = EventSubscription::new(canvas.clone().into());
        let mut on_window = EventSubscription::new(window.clone().into());

        {
            let (app, input, overlay, canvas) = (app.clone(), input.clone(), overlay.clone(), canvas.clone());
            on_canvas.listen("pointerdown", move |e: PointerEvent| {
                let (x, y) = (e.offset_x() as f64, e.offset_y() as f64);
                let captured = match &overlay {
                    Some((ctx, queued)) => {
                        queued.push(pointer_button(x, y, true));
                        ctx.is_pointer_over_area()
                    }
                    None => false,
                };
                let event = input.borrow_mut().press(x, y, captured);
                if event.is_some() {
                    let _ = canvas.set_pointer_capture(e.pointer_id());
                }
                apply(&app, event);
            })?;
        }
        {
            let (app, input, overlay) = (app.clone(), input.clone(), overlay.clone());
            on_canvas.listen("pointermove", move |e: PointerEvent| {
                let (x, y) = (e.offset_x() as f64, e.offset_y() as f64);
                if let Some((_, queued)) = &overlay {
                    queued.push(egui::Event::PointerMoved(egui::pos2(x as f32, y as f32)));
                }
                let events = input.borrow_mut().pointer_move(x, y);
                apply(&app, events);
            })?;
        }
        for kind in ["pointerup", "pointercancel"] {
            let (app, input, overlay) = (app.clone(), input.clone(), overlay.clone());
            on_canvas.listen(kind, move |e: PointerEvent| {
                if let Some((_, queued)) = &overlay {
                    queued.push(pointer_button(e.offset_x() as f64, e.offset_y() as f64, false));
                }
                apply(&app, input.borrow_mut().pointer_up());
            })?;
        }
        {
            let (app, input) = (app.clone(), input.clone());
            on_window.listen("blur", move |_: Event| {
                apply(&app, [input.borrow_mut().focus_lost()]);
            })?;
        }
        {
            let (window_ref, canvas) = (window.clone(), canvas.clone());
            let max_ratio = app.config().max_pixel_ratio;
            on_window.listen("resize", move |_: Event| {
                let viewport = window_viewport(&window_ref, max_ratio);
                resize_canvas(&canvas, &viewport);
                apply(&app, [InputEvent::Resized(viewport)]);
            })?;
        }

        Ok(vec![on_canvas, on_window])
    }

    fn pointer_button(x: f64, y: f64, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: egui::pos2(x as f32, y as f32),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::default(),
        }
    }

    /// Full-window viewport; backing store scaled by the clamped device pixel ratio
    fn window_viewport(window: &Window, max_pixel_ratio: f64) -> ViewportState {
        let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
        let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
        ViewportState::from_logical(width, height, window.device_pixel_ratio(), max_pixel_ratio)
    }

    fn resize_canvas(canvas: &HtmlCanvasElement, viewport: &ViewportState) {
        canvas.set_width(viewport.width);
        canvas.set_height(viewport.height);
    }

    fn find_or_create_canvas(window: &Window) -> Result<HtmlCanvasElement, JsValue> {
        let document = window.document().ok_or_else(|| js_error("no document on window"))?;
        if let Some(existing) = document.get_element_by_id(CANVAS_ID) {
            return existing
                .dyn_into::<HtmlCanvasElement>()
                .map_err(|_| js_error("#turntable is not a canvas"));
        }
        let body = document.body().ok_or_else(|| js_error("no body on document"))?;
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        canvas.set_id(CANVAS_ID);
        body.append_child(&canvas)?;
        Ok(canvas)
    }

    fn js_error(msg: impl ToString) -> JsValue {
        JsValue::from_str(&msg.to_string())
    }
}
