use std::cell::RefCell;
use std::rc::Rc;

use crate::config::SceneConfig;
use crate::controller::{
    dispatch, AssetLoader, AssetStage, DrawTarget, FrameScheduler, InputEvent, LoopHandle, RenderLoop,
    RotationController, SceneHandles, StageStatus,
};
use crate::error::{ConfigurationError, InvalidInputError};
use crate::model::{Camera, Scene, Transform, ViewportHandle};

/// One turntable scene: the rotation controller, the scene it orients, and the
/// render loop that starts once the model has arrived.
///
/// Platform-free so the whole load-input-tick cycle runs under a [`crate::controller::FrameQueue`].
pub struct Turntable {
    handles: SceneHandles,
    stage: AssetStage,
    render_loop: Rc<RefCell<Option<LoopHandle>>>,
    config: SceneConfig,
}

impl Turntable {
    pub fn new(config: SceneConfig, viewport: ViewportHandle) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let controller = RotationController::from_config(&config.rotation, viewport.clone())?;
        let scene = Rc::new(RefCell::new(Scene::from_config(&config)?));
        let mut camera = Camera::from_config(&config.camera);
        camera.sync_viewport(&viewport.get());

        let stage = AssetStage::new(scene.clone(), Transform::from_model_config(&config.model));
        tracing::info!(model = %config.model_path, mode = ?config.rotation.mode, "scene configured");
        Ok(Self {
            handles: SceneHandles {
                controller: Rc::new(RefCell::new(controller)),
                scene,
                camera: Rc::new(RefCell::new(camera)),
                viewport,
            },
            stage,
            render_loop: Rc::new(RefCell::new(None)),
            config,
        })
    }

    /// Observe asset stage transitions, e.g. to show a failure message
    pub fn with_status_listener(mut self, listener: impl Fn(&StageStatus) + 'static) -> Self {
        self.stage = self.stage.with_status_listener(listener);
        self
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn handles(&self) -> &SceneHandles {
        &self.handles
    }

    /// Apply one input event between frames
    pub fn handle_input(&self, event: &InputEvent) -> Result<(), InvalidInputError> {
        let mut controller = self.handles.controller.borrow_mut();
        dispatch(event, &mut controller, &self.handles.viewport)
    }

    /// Load the configured model; the render loop is handed to `scheduler` only
    /// after the model node is in the scene.
    pub fn load_model<L: AssetLoader + ?Sized>(
        &self,
        loader: &L,
        scheduler: Rc<dyn FrameScheduler>,
        target: Box<dyn DrawTarget>,
    ) {
        let handles = self.handles.clone();
        let slot = self.render_loop.clone();
        let angle_scale = self.config.rotation.angle_scale;
        self.stage.load(loader, &self.config.model_path, move |model| {
            let handle = RenderLoop::new(handles, target, model, angle_scale).start(scheduler);
            *slot.borrow_mut() = Some(handle);
        });
    }

    pub fn status(&self) -> StageStatus {
        self.stage.status()
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.borrow().as_ref().is_some_and(LoopHandle::is_running)
    }

    pub fn frames(&self) -> u64 {
        self.render_loop.borrow().as_ref().map_or(0, LoopHandle::frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Frame, FrameQueue};
    use crate::model::{BuiltinLoader, ViewportState};

    struct Discard;

    impl DrawTarget for Discard {
        fn draw(&mut self, _frame: Frame<'_>) {}
    }

    fn config() -> SceneConfig {
        let mut config = SceneConfig { model_path: "builtin:cube".into(), ..SceneConfig::default() };
        config.rotation.easing = Some(0.6);
        config.rotation.friction = Some(0.1);
        config
    }

    #[test]
    fn invalid_config_fails_fast() {
        let mut bad = config();
        bad.rotation.friction = Some(1.5);
        let err = Turntable::new(bad, ViewportHandle::default()).err();
        assert_eq!(err, Some(ConfigurationError::Friction(1.5)));
    }

    #[test]
    fn loop_starts_only_after_load() {
        let app = Turntable::new(config(), ViewportHandle::new(ViewportState::new(640, 480, 1.0))).unwrap();
        assert!(!app.is_running());
        assert_eq!(app.status(), StageStatus::Idle);

        let queue = Rc::new(FrameQueue::new());
        app.load_model(&BuiltinLoader, queue.clone(), Box::new(Discard));
        assert!(app.is_running());
        assert!(matches!(app.status(), StageStatus::Ready(_)));

        queue.run_frame();
        queue.run_frame();
        assert_eq!(app.frames(), 2);
    }

    #[test]
    fn camera_starts_with_viewport_aspect() {
        let app = Turntable::new(config(), ViewportHandle::new(ViewportState::new(1000, 500, 1.0))).unwrap();
        assert_eq!(app.handles().camera.borrow().aspect, 2.0);
    }
}
