use glam::{Mat4, Quat, Vec3};

use crate::config::{parse_hex_color, LightConfig, ModelConfig, SceneConfig};
use crate::error::ConfigurationError;
use crate::model::Mesh;

/// Handle to a node registered with [`Scene::add_node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: f32,
    /// Orientation around the vertical axis, in radians
    pub rotation_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, scale: 1.0, rotation_y: 0.0 }
    }
}

impl Transform {
    pub fn from_model_config(config: &ModelConfig) -> Self {
        Self {
            position: Vec3::from_array(config.position),
            scale: config.scale,
            rotation_y: 0.0,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation_y),
            self.position,
        )
    }
}

pub struct SceneNode {
    pub mesh: Mesh,
    pub transform: Transform,
    pub color: [f32; 3],
}

impl SceneNode {
    pub fn new(mesh: Mesh, transform: Transform) -> Self {
        Self { mesh, transform, color: [0.8, 0.8, 0.82] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    pub fn from_config(config: &LightConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            color: parse_hex_color(&config.color)?,
            intensity: config.intensity,
            position: Vec3::from_array(config.position),
            target: Vec3::from_array(config.target),
        })
    }

    /// Unit vector pointing from the lit surface towards the light
    pub fn to_light(&self) -> Vec3 {
        (self.position - self.target).try_normalize().unwrap_or(Vec3::Y)
    }
}

/// Everything the draw call needs besides the camera
pub struct Scene {
    nodes: Vec<SceneNode>,
    pub lights: Vec<DirectionalLight>,
    pub exposure: f32,
    pub env_intensity: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self { nodes: Vec::new(), lights: Vec::new(), exposure: 1.0, env_intensity: 1.0 }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SceneConfig) -> Result<Self, ConfigurationError> {
        let lights = config
            .lights
            .iter()
            .map(DirectionalLight::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            nodes: Vec::new(),
            lights,
            exposure: config.exposure,
            env_intensity: config.env_intensity,
        })
    }

    /// Register a renderable node so it takes part in drawing
    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        tracing::debug!(?id, triangles = node.mesh.triangle_count(), "node added to scene");
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns false when `id` does not belong to this scene
    pub fn set_rotation_y(&mut self, id: NodeId, radians: f32) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.transform.rotation_y = radians;
                true
            }
            None => false,
        }
    }
}
