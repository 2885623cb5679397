use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use winit::{
    event::*,
    event_loop::EventLoop,
    window::Window,
};

use turntable::{
    controller::{FrameQueue, InputEvent, InputState, RotationMode, StageStatus},
    error::{ConfigurationError, Error},
    logging,
    model::{DefaultLoader, ViewportHandle, ViewportState},
    ui::OverlayInput,
    view::{DebugOverlay, GpuContext, Renderer},
    SceneConfig, Turntable,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Drag horizontally; the model eases after the pointer
    Drag,
    /// Horizontal pointer position sets the angle directly
    Pointer,
}

impl From<ModeArg> for RotationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Drag => RotationMode::InertialDrag,
            ModeArg::Pointer => RotationMode::DirectPointer,
        }
    }
}

/// Interactive model turntable
#[derive(Debug, Parser)]
#[command(name = "turntable", version, about)]
struct Cli {
    /// JSON scene config; defaults are used for anything it omits
    #[arg(long, env = "TURNTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Model to show (STL path or `builtin:cube`)
    #[arg(long, env = "TURNTABLE_MODEL")]
    model: Option<String>,

    #[arg(long, env = "TURNTABLE_MODE", value_enum)]
    mode: Option<ModeArg>,

    /// Seed for the randomized spring constants
    #[arg(long, env = "TURNTABLE_SEED")]
    seed: Option<u64>,

    /// Show the egui debug panel
    #[arg(long, env = "TURNTABLE_DEBUG_PANEL")]
    debug_panel: bool,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn scene_config(&self) -> Result<SceneConfig, ConfigurationError> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::load(path)?,
            None => SceneConfig::default(),
        };
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(mode) = self.mode {
            config.rotation.mode = mode.into();
        }
        if self.seed.is_some() {
            config.rotation.seed = self.seed;
        }
        config.debug_panel |= self.debug_panel;
        config.validate()?;
        Ok(config)
    }
}

/// Feeds winit events to egui through the shared `egui_winit` state
struct WinitInput {
    state: Rc<RefCell<egui_winit::State>>,
    window: Arc<Window>,
}

impl OverlayInput for WinitInput {
    fn take_input(&mut self, _viewport: &ViewportState) -> egui::RawInput {
        self.state.borrow_mut().take_egui_input(&self.window)
    }

    fn handle_output(&mut self, output: egui::PlatformOutput) {
        self.state.borrow_mut().handle_platform_output(&self.window, output);
    }
}

fn window_viewport(window: &Window) -> ViewportState {
    let size = window.inner_size();
    ViewportState::new(size.width, size.height, window.scale_factor())
}

fn apply(app: &Turntable, events: impl IntoIterator<Item = InputEvent>) {
    for event in events {
        // Rejected samples are already logged by the controller
        let _ = app.handle_input(&event);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = cli.scene_config()?;
    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;
    let window_attributes = Window::default_attributes()
        .with_title("Turntable")
        .with_transparent(true)
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    #[allow(deprecated)]
    let window = event_loop
        .create_window(window_attributes)
        .map_err(|e| Error::Window(e.to_string()))?;
    let window = Arc::new(window);

    let viewport = ViewportHandle::new(window_viewport(&window));
    let gpu = pollster::block_on(GpuContext::new_native(window.clone()))?;
    let mut renderer = Renderer::new(gpu);

    let egui_state = if config.debug_panel {
        let ctx = egui::Context::default();
        let state = Rc::new(RefCell::new(egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        )));
        let input = WinitInput { state: state.clone(), window: window.clone() };
        let overlay = DebugOverlay::new(ctx, &renderer.gpu().device, renderer.gpu().format, Box::new(input));
        renderer = renderer.with_overlay(overlay);
        Some(state)
    } else {
        None
    };

    let title_window = window.clone();
    let app = Turntable::new(config, viewport)?.with_status_listener(move |status| {
        if let StageStatus::Failed(failure) = status {
            title_window.set_title(&format!("Turntable - {failure}"));
        }
    });

    let queue = Rc::new(FrameQueue::new());
    app.load_model(&DefaultLoader::default(), queue.clone(), Box::new(renderer));

    let mut input = InputState::new();
    #[allow(deprecated)]
    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => {
                let overlay_consumed = egui_state
                    .as_ref()
                    .is_some_and(|state| state.borrow_mut().on_window_event(&window, event).consumed);
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        apply(&app, [InputEvent::Resized(window_viewport(&window))]);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let logical = position.to_logical::<f64>(window.scale_factor());
                        let events = input.pointer_move(logical.x, logical.y);
                        apply(&app, events);
                    }
                    WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                        ElementState::Pressed => {
                            let (x, y) = input.cursor;
                            apply(&app, input.press(x, y, overlay_consumed));
                        }
                        ElementState::Released => apply(&app, input.pointer_up()),
                    },
                    WindowEvent::Focused(false) => {
                        let event = input.focus_lost();
                        apply(&app, [event]);
                    }
                    WindowEvent::RedrawRequested => {
                        queue.run_frame();
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if queue.has_pending() {
                    window.request_redraw();
                }
            }
            _ => {}
        })
        .map_err(|e| Error::Window(e.to_string()))
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "turntable exited with an error");
        std::process::exit(1);
    }
}
