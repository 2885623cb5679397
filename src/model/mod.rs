// MODEL: Scene data, viewport and model decoding
pub mod camera;
pub mod loader;
pub mod mesh;
pub mod scene;
pub mod stl;
pub mod viewport;

pub use camera::Camera;
pub use loader::{BuiltinLoader, DefaultLoader};
pub use mesh::{Mesh, MeshBuffer, Vertex};
pub use scene::{DirectionalLight, NodeId, Scene, SceneNode, Transform};
pub use viewport::{ViewportHandle, ViewportState};
