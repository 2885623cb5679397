use std::cell::RefCell;
use std::rc::Rc;

use egui::{Context, RichText, Slider};
use glam::Vec3;

use crate::controller::{Frame, RotationState};
use crate::model::ViewportState;

/// Where the panel gets its pointer/keyboard input from
pub trait OverlayInput {
    fn take_input(&mut self, viewport: &ViewportState) -> egui::RawInput;

    /// Cursor changes, clipboard and the like; ignored by default
    fn handle_output(&mut self, _output: egui::PlatformOutput) {}
}

/// Events pushed by DOM listeners and drained once per frame
#[derive(Clone, Default)]
pub struct QueuedInput {
    events: Rc<RefCell<Vec<egui::Event>>>,
}

impl QueuedInput {
    pub fn push(&self, event: egui::Event) {
        self.events.borrow_mut().push(event);
    }
}

impl OverlayInput for QueuedInput {
    fn take_input(&mut self, viewport: &ViewportState) -> egui::RawInput {
        let ratio = viewport.pixel_ratio as f32;
        let mut raw_input = egui::RawInput::default();
        raw_input.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(viewport.width as f32 / ratio, viewport.height as f32 / ratio),
        ));
        raw_input.events.extend(self.events.borrow_mut().drain(..));
        raw_input
    }
}

/// Build the debug panel. Presentation values are editable; rotation is read-only.
pub fn build_panel(ctx: &Context, frame: &mut Frame<'_>) {
    let logical_width = frame.viewport.logical_width() as f32;

    egui::Window::new("Scene")
        .default_pos([8.0, 8.0])
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.label(RichText::new("Tone mapping").small());
            ui.add(Slider::new(&mut frame.scene.exposure, 0.0..=2.0).text("exposure"));
            ui.add(Slider::new(&mut frame.scene.env_intensity, 0.0..=100.0).text("env intensity"));

            ui.separator();
            if let Some(node) = frame.scene.node_mut(frame.model) {
                vec3_sliders(ui, "Model position", &mut node.transform.position, 20.0);
            }
            vec3_sliders(ui, "Camera position", &mut frame.camera.eye, 50.0);

            ui.collapsing("Lights", |ui| {
                for (i, light) in frame.scene.lights.iter_mut().enumerate() {
                    ui.push_id(i, |ui| {
                        ui.add(Slider::new(&mut light.intensity, 0.0..=500.0).text(format!("light {i}")));
                        vec3_sliders(ui, "position", &mut light.position, 30.0);
                    });
                }
            });
        });

    egui::Window::new("Rotation")
        .default_pos([logical_width - 180.0, 8.0])
        .default_width(170.0)
        .show(ctx, |ui| rotation_readout(ui, &frame.rotation, frame.index));
}

fn vec3_sliders(ui: &mut egui::Ui, label: &str, value: &mut Vec3, extent: f32) {
    ui.label(RichText::new(label).small());
    ui.add(Slider::new(&mut value.x, -extent..=extent).text("x"));
    ui.add(Slider::new(&mut value.y, -extent..=extent).text("y"));
    ui.add(Slider::new(&mut value.z, -extent..=extent).text("z"));
}

fn rotation_readout(ui: &mut egui::Ui, state: &RotationState, frame: u64) {
    for (name, value) in [
        ("position", state.position),
        ("target", state.target),
        ("velocity", state.velocity),
        ("easing", state.easing),
        ("friction", state.friction),
    ] {
        ui.label(RichText::new(format!("{name}: {value:.4}")).small().monospace());
    }
    ui.label(RichText::new(format!("frame: {frame}")).small());
}
