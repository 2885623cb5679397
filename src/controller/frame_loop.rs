use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::rc::Rc;

use crate::controller::rotation::{RotationController, RotationState};
use crate::model::{Camera, NodeId, Scene, ViewportHandle, ViewportState};

/// Work to run at the next display refresh
pub type FrameCallback = Box<dyn FnOnce()>;

/// The only timing primitive of the render loop
pub trait FrameScheduler {
    /// Invoke `frame` once, at the next display refresh
    fn schedule_next_frame(&self, frame: FrameCallback);
}

/// Callbacks held until the host says a refresh happened.
///
/// Used by the native window loop (pumped on every redraw) and by tests.
#[derive(Default)]
pub struct FrameQueue {
    pending: RefCell<VecDeque<FrameCallback>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Run everything that was due at this refresh. Callbacks scheduled while
    /// running wait for the next call. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let due: Vec<FrameCallback> = self.pending.borrow_mut().drain(..).collect();
        let ran = due.len();
        for frame in due {
            frame();
        }
        ran
    }
}

impl FrameScheduler for FrameQueue {
    fn schedule_next_frame(&self, frame: FrameCallback) {
        self.pending.borrow_mut().push_back(frame);
    }
}

/// Per-frame view handed to the draw target
pub struct Frame<'a> {
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
    /// The node this loop orients
    pub model: NodeId,
    pub viewport: ViewportState,
    /// Snapshot after this frame's advance, for read-only display
    pub rotation: RotationState,
    pub index: u64,
}

/// Draw primitive: paints one full frame of the scene through the camera.
///
/// The target may adjust presentation parameters (exposure, lights, camera
/// placement) from a debug panel but never writes node orientation.
pub trait DrawTarget {
    fn draw(&mut self, frame: Frame<'_>);
}

/// Shared state of one turntable scene; all single-threaded
#[derive(Clone)]
pub struct SceneHandles {
    pub controller: Rc<RefCell<RotationController>>,
    pub scene: Rc<RefCell<Scene>>,
    pub camera: Rc<RefCell<Camera>>,
    pub viewport: ViewportHandle,
}

/// Advance, orient, draw. Only constructible once the model node exists.
pub struct RenderLoop {
    handles: SceneHandles,
    target: Box<dyn DrawTarget>,
    model: NodeId,
    angle_scale: f64,
    frames: u64,
}

impl RenderLoop {
    pub fn new(handles: SceneHandles, target: Box<dyn DrawTarget>, model: NodeId, angle_scale: f64) -> Self {
        Self { handles, target, model, angle_scale, frames: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One frame: advance the integrator, write the scaled angle into the model
    /// node, then draw with whatever viewport is current.
    pub fn tick(&mut self) {
        let (angle, rotation) = {
            let mut controller = self.handles.controller.borrow_mut();
            let angle = controller.advance();
            (angle, *controller.state())
        };
        let viewport = self.handles.viewport.get();

        let mut scene = self.handles.scene.borrow_mut();
        let mut camera = self.handles.camera.borrow_mut();
        if !scene.set_rotation_y(self.model, node_angle(angle, self.angle_scale)) {
            tracing::warn!(model = ?self.model, "model node missing from scene");
        }
        camera.sync_viewport(&viewport);

        self.target.draw(Frame {
            scene: &mut *scene,
            camera: &mut *camera,
            model: self.model,
            viewport,
            rotation,
            index: self.frames,
        });
        self.frames += 1;
    }

    /// Hand the loop to `scheduler`. Every tick re-submits the next one until
    /// the returned handle is stopped or dropped.
    pub fn start(self, scheduler: Rc<dyn FrameScheduler>) -> LoopHandle {
        tracing::info!(model = ?self.model, "render loop started");
        let running = Rc::new(Cell::new(true));
        let render_loop = Rc::new(RefCell::new(self));
        submit(render_loop.clone(), scheduler, running.clone());
        LoopHandle { running, render_loop }
    }
}

/// Controller units to a node angle in `[0, 2π)`; the controller itself never wraps
fn node_angle(position: f64, angle_scale: f64) -> f32 {
    (position * angle_scale).rem_euclid(TAU) as f32
}

fn submit(render_loop: Rc<RefCell<RenderLoop>>, scheduler: Rc<dyn FrameScheduler>, running: Rc<Cell<bool>>) {
    let next = scheduler.clone();
    scheduler.schedule_next_frame(Box::new(move || {
        if !running.get() {
            return;
        }
        render_loop.borrow_mut().tick();
        submit(render_loop, next, running);
    }));
}

/// Keeps a started loop alive; stopping means the next tick is never scheduled
pub struct LoopHandle {
    running: Rc<Cell<bool>>,
    render_loop: Rc<RefCell<RenderLoop>>,
}

impl LoopHandle {
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn frames(&self) -> u64 {
        self.render_loop.borrow().frames()
    }

    pub fn stop(&self) {
        if self.running.replace(false) {
            // May run from inside a tick, when the loop is already borrowed
            let frames = self.render_loop.try_borrow().map(|l| l.frames()).unwrap_or_default();
            tracing::info!(frames, "render loop stopped");
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::rotation::{RotationMode, SpringParams};
    use crate::model::{Mesh, SceneNode, Transform};
    use glam::Vec3;

    #[derive(Default)]
    struct Recorder {
        angles: Rc<RefCell<Vec<f32>>>,
        sizes: Rc<RefCell<Vec<(u32, u32)>>>,
    }

    impl DrawTarget for Recorder {
        fn draw(&mut self, frame: Frame<'_>) {
            let node = frame.scene.node(frame.model).unwrap();
            self.angles.borrow_mut().push(node.transform.rotation_y);
            self.sizes.borrow_mut().push((frame.viewport.width, frame.viewport.height));
        }
    }

    fn handles() -> (SceneHandles, NodeId) {
        let viewport = ViewportHandle::new(ViewportState::new(800, 600, 1.0));
        let controller = RotationController::new(
            RotationMode::InertialDrag,
            SpringParams::new(0.6, 0.1).unwrap(),
            viewport.clone(),
        );
        let mut scene = Scene::new();
        let model = scene.add_node(SceneNode::new(Mesh::cuboid(Vec3::ONE), Transform::default()));
        let handles = SceneHandles {
            controller: Rc::new(RefCell::new(controller)),
            scene: Rc::new(RefCell::new(scene)),
            camera: Rc::new(RefCell::new(Camera::new(800, 600))),
            viewport,
        };
        (handles, model)
    }

    #[test]
    fn tick_writes_scaled_angle_before_drawing() {
        let (handles, model) = handles();
        let recorder = Recorder::default();
        let angles = recorder.angles.clone();
        handles.controller.borrow_mut().on_drag_start(100.0).unwrap();
        handles.controller.borrow_mut().on_drag_move(150.0).unwrap();

        let mut render_loop = RenderLoop::new(handles, Box::new(recorder), model, 0.5);
        render_loop.tick();
        assert_eq!(*angles.borrow(), vec![1.5]);
        assert_eq!(render_loop.frames(), 1);
    }

    #[test]
    fn one_tick_per_refresh() {
        let (handles, model) = handles();
        let recorder = Recorder::default();
        let angles = recorder.angles.clone();
        let queue = Rc::new(FrameQueue::new());

        let handle = RenderLoop::new(handles, Box::new(recorder), model, 1.0).start(queue.clone());
        assert!(angles.borrow().is_empty(), "nothing runs before the first refresh");
        for _ in 0..5 {
            assert_eq!(queue.run_frame(), 1);
        }
        assert_eq!(angles.borrow().len(), 5);
        assert_eq!(handle.frames(), 5);
        assert!(queue.has_pending());
    }

    #[test]
    fn stopping_skips_the_pending_tick() {
        let (handles, model) = handles();
        let recorder = Recorder::default();
        let angles = recorder.angles.clone();
        let queue = Rc::new(FrameQueue::new());

        let handle = RenderLoop::new(handles, Box::new(recorder), model, 1.0).start(queue.clone());
        queue.run_frame();
        handle.stop();
        assert!(!handle.is_running());
        queue.run_frame();
        assert_eq!(angles.borrow().len(), 1);
        assert!(!queue.has_pending());
    }

    #[test]
    fn dropping_the_handle_ends_the_loop() {
        let (handles, model) = handles();
        let queue = Rc::new(FrameQueue::new());
        drop(RenderLoop::new(handles, Box::new(Recorder::default()), model, 1.0).start(queue.clone()));
        queue.run_frame();
        assert!(!queue.has_pending());
    }

    #[test]
    fn node_angle_is_wrapped_into_one_turn() {
        let (handles, model) = handles();
        let recorder = Recorder::default();
        let angles = recorder.angles.clone();
        handles.controller.borrow_mut().on_drag_start(0.0).unwrap();
        handles.controller.borrow_mut().on_drag_move(1000.0).unwrap();

        let mut render_loop = RenderLoop::new(handles.clone(), Box::new(recorder), model, 1.0);
        render_loop.tick();
        let position = handles.controller.borrow().position();
        assert!(position > TAU);
        assert!((angles.borrow()[0] - position.rem_euclid(TAU) as f32).abs() < 1e-5);

        assert!((node_angle(-3.0, 1.0) - (TAU - 3.0) as f32).abs() < 1e-6);
        let far = node_angle(1.0e9 + 0.5, 1.0);
        assert!((0.0..TAU as f32).contains(&far));
    }

    #[test]
    fn draws_with_viewport_current_at_tick_time() {
        let (handles, model) = handles();
        let viewport = handles.viewport.clone();
        let camera = handles.camera.clone();
        let recorder = Recorder::default();
        let sizes = recorder.sizes.clone();
        let mut render_loop = RenderLoop::new(handles, Box::new(recorder), model, 1.0);

        render_loop.tick();
        viewport.set(ViewportState::new(1000, 500, 1.0));
        render_loop.tick();
        assert_eq!(*sizes.borrow(), vec![(800, 600), (1000, 500)]);
        assert_eq!(camera.borrow().aspect, 2.0);
    }
}
