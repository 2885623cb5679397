use std::cell::RefCell;
use std::rc::Rc;

use crate::error::LoadFailure;
use crate::model::{Mesh, NodeId, Scene, SceneNode, Transform};

/// Completion callback of an [`AssetLoader`]; invoked exactly once on success or failure
pub type LoadCallback = Box<dyn FnOnce(Result<Mesh, LoadFailure>)>;

/// Source of renderable models. Loading may complete later on the same thread.
pub trait AssetLoader {
    fn load(&self, path: &str, on_done: LoadCallback);
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Idle,
    Loading { path: String },
    Ready(NodeId),
    Failed(LoadFailure),
}

type StatusListener = Rc<dyn Fn(&StageStatus)>;

/// One-time gate between "no model yet" and "render loop running"
pub struct AssetStage {
    scene: Rc<RefCell<Scene>>,
    placement: Transform,
    status: Rc<RefCell<StageStatus>>,
    listener: Option<StatusListener>,
}

impl AssetStage {
    pub fn new(scene: Rc<RefCell<Scene>>, placement: Transform) -> Self {
        Self {
            scene,
            placement,
            status: Rc::new(RefCell::new(StageStatus::Idle)),
            listener: None,
        }
    }

    /// Observe every status change (loading, ready, failed)
    pub fn with_status_listener(mut self, listener: impl Fn(&StageStatus) + 'static) -> Self {
        self.listener = Some(Rc::new(listener));
        self
    }

    pub fn status(&self) -> StageStatus {
        self.status.borrow().clone()
    }

    /// Fetch the model at `path`; once it is placed in the scene, `on_ready`
    /// receives its node id. On failure `on_ready` is dropped uncalled.
    pub fn load<L: AssetLoader + ?Sized>(&self, loader: &L, path: &str, on_ready: impl FnOnce(NodeId) + 'static) {
        if matches!(*self.status.borrow(), StageStatus::Loading { .. } | StageStatus::Ready(_)) {
            tracing::warn!(path, "model already loading or loaded, ignoring");
            return;
        }
        tracing::info!(path, "loading model");
        set_status(&self.status, &self.listener, StageStatus::Loading { path: path.to_string() });

        let scene = self.scene.clone();
        let placement = self.placement;
        let status = self.status.clone();
        let listener = self.listener.clone();
        let path_owned = path.to_string();
        loader.load(
            path,
            Box::new(move |result| match result {
                Ok(mesh) => {
                    tracing::info!(
                        path = %path_owned,
                        triangles = mesh.triangle_count(),
                        bounds = ?mesh.bounds(),
                        "model loaded"
                    );
                    let id = scene.borrow_mut().add_node(SceneNode::new(mesh, placement));
                    set_status(&status, &listener, StageStatus::Ready(id));
                    on_ready(id);
                }
                Err(failure) => {
                    tracing::error!(path = %path_owned, error = %failure, "model failed to load");
                    set_status(&status, &listener, StageStatus::Failed(failure));
                }
            }),
        );
    }
}

fn set_status(status: &RefCell<StageStatus>, listener: &Option<StatusListener>, next: StageStatus) {
    *status.borrow_mut() = next.clone();
    if let Some(listener) = listener {
        listener(&next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::cell::Cell;

    struct Immediate(Result<Mesh, LoadFailure>);

    impl AssetLoader for Immediate {
        fn load(&self, _path: &str, on_done: LoadCallback) {
            on_done(self.0.clone());
        }
    }

    /// Holds the callback until the test completes it
    #[derive(Default)]
    struct Deferred(RefCell<Option<LoadCallback>>);

    impl AssetLoader for Deferred {
        fn load(&self, _path: &str, on_done: LoadCallback) {
            *self.0.borrow_mut() = Some(on_done);
        }
    }

    fn stage() -> (AssetStage, Rc<RefCell<Scene>>) {
        let scene = Rc::new(RefCell::new(Scene::new()));
        let placement = Transform { position: Vec3::new(6.0, -7.0, 3.0), scale: 0.1, rotation_y: 0.0 };
        (AssetStage::new(scene.clone(), placement), scene)
    }

    #[test]
    fn success_places_node_then_signals_ready() {
        let (stage, scene) = stage();
        let ready = Rc::new(Cell::new(None));
        let seen = ready.clone();
        let scene_at_ready = scene.clone();
        stage.load(&Immediate(Ok(Mesh::cuboid(Vec3::ONE))), "a.stl", move |id| {
            assert!(scene_at_ready.borrow().node(id).is_some());
            seen.set(Some(id));
        });

        let id = ready.get().unwrap();
        assert_eq!(stage.status(), StageStatus::Ready(id));
        let transform = scene.borrow().node(id).unwrap().transform;
        assert_eq!(transform.scale, 0.1);
        assert_eq!(transform.position, Vec3::new(6.0, -7.0, 3.0));
    }

    #[test]
    fn failure_is_reported_and_ready_never_fires() {
        let (stage, scene) = stage();
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let log = statuses.clone();
        let stage = stage.with_status_listener(move |s| log.borrow_mut().push(s.clone()));
        let failure = LoadFailure::Http { path: "a.stl".into(), status: 404 };

        stage.load(&Immediate(Err(failure.clone())), "a.stl", |_| panic!("must not start"));

        assert_eq!(stage.status(), StageStatus::Failed(failure.clone()));
        assert_eq!(
            *statuses.borrow(),
            vec![StageStatus::Loading { path: "a.stl".into() }, StageStatus::Failed(failure)]
        );
        assert!(scene.borrow().is_empty());
    }

    #[test]
    fn pending_load_keeps_stage_loading() {
        let (stage, scene) = stage();
        let loader = Deferred::default();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        stage.load(&loader, "slow.stl", move |_| flag.set(true));

        assert_eq!(stage.status(), StageStatus::Loading { path: "slow.stl".into() });
        assert!(!fired.get());

        let done = loader.0.borrow_mut().take().unwrap();
        done(Ok(Mesh::cuboid(Vec3::ONE)));
        assert!(fired.get());
        assert_eq!(scene.borrow().nodes().count(), 1);
    }

    #[test]
    fn second_load_is_ignored() {
        let (stage, scene) = stage();
        let loader = Immediate(Ok(Mesh::cuboid(Vec3::ONE)));
        stage.load(&loader, "a.stl", |_| {});
        stage.load(&loader, "b.stl", |_| panic!("second model"));
        assert_eq!(scene.borrow().nodes().count(), 1);
    }
}
