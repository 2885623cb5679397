use std::cell::Cell;
use std::rc::Rc;

/// Size of the draw surface in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl ViewportState {
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self { width, height, pixel_ratio }
    }

    /// Build from CSS/logical size, clamping the device pixel ratio like the
    /// browser renderer does to keep fill rate bounded on dense displays
    pub fn from_logical(width: f64, height: f64, device_pixel_ratio: f64, max_pixel_ratio: f64) -> Self {
        let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(max_pixel_ratio)
        } else {
            1.0
        };
        Self {
            width: (width * ratio).round().max(1.0) as u32,
            height: (height * ratio).round().max(1.0) as u32,
            pixel_ratio: ratio,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Horizontal center in the same (logical) coordinate space as pointer events
    pub fn logical_center_x(&self) -> f64 {
        self.logical_width() / 2.0
    }

    pub fn logical_width(&self) -> f64 {
        self.width as f64 / self.pixel_ratio
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(800, 600, 1.0)
    }
}

/// Shared read handle to the current viewport.
///
/// Only the resize collaborator calls [`ViewportHandle::set`]; the render loop,
/// the camera and the pointer mapping read the current value on demand.
#[derive(Debug, Clone, Default)]
pub struct ViewportHandle(Rc<Cell<ViewportState>>);

impl ViewportHandle {
    pub fn new(state: ViewportState) -> Self {
        Self(Rc::new(Cell::new(state)))
    }

    pub fn get(&self) -> ViewportState {
        self.0.get()
    }

    /// Returns true when the size actually changed
    pub fn set(&self, state: ViewportState) -> bool {
        let changed = self.0.get() != state;
        if changed {
            tracing::debug!(width = state.width, height = state.height, ratio = state.pixel_ratio, "viewport resized");
            self.0.set(state);
        }
        changed
    }
}
