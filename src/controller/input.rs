/// Platform-agnostic pointer input
use crate::controller::rotation::RotationController;
use crate::error::InvalidInputError;
use crate::model::{ViewportHandle, ViewportState};

/// Platform-independent input events; coordinates are logical (CSS) pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    DragStart { x: f64 },
    DragMove { x: f64 },
    DragEnd,
    PointerMoved { x: f64, y: f64 },
    Resized(ViewportState),
    FocusLost,
}

/// Turns raw button/cursor callbacks into [`InputEvent`]s
#[derive(Debug, Default)]
pub struct InputState {
    pub pressed: bool,
    pub cursor: (f64, f64),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> InputEvent {
        self.pressed = true;
        self.cursor = (x, y);
        InputEvent::DragStart { x }
    }

    /// Button press that an overlay may claim. A claimed press starts no drag;
    /// releases and focus loss are never claimable, so a drag cannot outlive the button.
    pub fn press(&mut self, x: f64, y: f64, captured_by_overlay: bool) -> Option<InputEvent> {
        if captured_by_overlay {
            self.cursor = (x, y);
            return None;
        }
        Some(self.pointer_down(x, y))
    }

    /// Hover always reports the position; a held button also continues the drag
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Vec<InputEvent> {
        self.cursor = (x, y);
        let mut events = vec![InputEvent::PointerMoved { x, y }];
        if self.pressed {
            events.push(InputEvent::DragMove { x });
        }
        events
    }

    pub fn pointer_up(&mut self) -> Option<InputEvent> {
        std::mem::take(&mut self.pressed).then_some(InputEvent::DragEnd)
    }

    pub fn focus_lost(&mut self) -> InputEvent {
        self.pressed = false;
        InputEvent::FocusLost
    }
}

/// Route one event. Resizes only touch the viewport, never the rotation state.
pub fn dispatch(
    event: &InputEvent,
    controller: &mut RotationController,
    viewport: &ViewportHandle,
) -> Result<(), InvalidInputError> {
    match *event {
        InputEvent::DragStart { x } => controller.on_drag_start(x),
        InputEvent::DragMove { x } => controller.on_drag_move(x),
        InputEvent::PointerMoved { x, y } => controller.on_pointer_move(x, y),
        InputEvent::Resized(state) => {
            viewport.set(state);
            Ok(())
        }
        InputEvent::DragEnd | InputEvent::FocusLost => Ok(()),
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Event, EventTarget};

    /// DOM listeners owned by one scene; removed from the target on drop
    pub struct EventSubscription {
        target: EventTarget,
        listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
    }

    impl EventSubscription {
        pub fn new(target: EventTarget) -> Self {
            Self { target, listeners: Vec::new() }
        }

        /// Attach `handler` for `kind`, downcasting the DOM event to `E`
        pub fn listen<E, F>(&mut self, kind: &'static str, mut handler: F) -> Result<(), JsValue>
        where
            E: JsCast,
            F: FnMut(E) + 'static,
        {
            let closure = Closure::wrap(Box::new(move |event: Event| {
                if let Ok(event) = event.dyn_into::<E>() {
                    handler(event);
                }
            }) as Box<dyn FnMut(Event)>);
            self.target
                .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
            self.listeners.push((kind, closure));
            Ok(())
        }
    }

    impl Drop for EventSubscription {
        fn drop(&mut self) {
            for (kind, closure) in self.listeners.drain(..) {
                let _ = self
                    .target
                    .remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            }
            tracing::debug!("event listeners removed");
        }
    }
}
