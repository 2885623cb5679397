use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::controller::rotation::{RotationMode, SpringParams, EASING_RANGE, FRICTION_RANGE};
use crate::error::ConfigurationError;

/// Everything needed to assemble one turntable scene.
///
/// Every field has a default, so a partial JSON document only overrides what it
/// names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub model_path: String,
    pub model: ModelConfig,
    pub rotation: RotationConfig,
    pub camera: CameraConfig,
    pub lights: Vec<LightConfig>,
    /// Tone-mapping exposure applied in the fragment shader
    pub exposure: f32,
    /// Strength of the ambient (environment) term
    pub env_intensity: f32,
    pub debug_panel: bool,
    pub max_pixel_ratio: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model_path: "models/robot.stl".to_string(),
            model: ModelConfig::default(),
            rotation: RotationConfig::default(),
            camera: CameraConfig::default(),
            lights: LightConfig::defaults(),
            exposure: 0.1,
            env_intensity: 20.0,
            debug_panel: false,
            max_pixel_ratio: 2.0,
        }
    }
}

impl SceneConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty JSON that [`SceneConfig::from_json`] reads back unchanged
    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigurationError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Check every value that would otherwise only fail (or silently diverge) at runtime
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.rotation.validate()?;
        self.model.validate()?;
        if !self.max_pixel_ratio.is_finite() || self.max_pixel_ratio < 1.0 {
            return Err(ConfigurationError::PixelRatio(self.max_pixel_ratio));
        }
        for light in &self.lights {
            parse_hex_color(&light.color)?;
        }
        Ok(())
    }
}

/// Placement of the loaded model inside the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub scale: f32,
    pub position: [f32; 3],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scale: 0.1,
            position: [6.0, -7.0, 3.0],
        }
    }
}

impl ModelConfig {
    /// A zero or non-finite scale leaves no invertible model matrix for lighting
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigurationError::ModelScale(self.scale));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub mode: RotationMode,
    /// Fixed spring gain; randomized within `easing_range` when absent
    pub easing: Option<f64>,
    /// Fixed damping factor; randomized within `friction_range` when absent
    pub friction: Option<f64>,
    pub easing_range: [f64; 2],
    pub friction_range: [f64; 2],
    /// Seed for the randomized constants, for reproducible sessions
    pub seed: Option<u64>,
    /// Radians per controller unit
    pub angle_scale: f64,
    /// Controller units spanned by the full viewport width in direct pointer mode
    pub pointer_range: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            mode: RotationMode::default(),
            easing: None,
            friction: None,
            easing_range: [EASING_RANGE.start, EASING_RANGE.end],
            friction_range: [FRICTION_RANGE.start, FRICTION_RANGE.end],
            seed: None,
            angle_scale: PI / 200.0,
            pointer_range: 200.0,
        }
    }
}

impl RotationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_range("easing_range", self.easing_range)?;
        check_range("friction_range", self.friction_range)?;
        // Range bounds have to be usable constants themselves
        SpringParams::new(self.easing_range[0], self.friction_range[0])?;
        if self.friction_range[1] > 1.0 {
            return Err(ConfigurationError::Friction(self.friction_range[1]));
        }
        if let Some(easing) = self.easing {
            SpringParams::new(easing, self.friction.unwrap_or(self.friction_range[0]))?;
        }
        if let Some(friction) = self.friction {
            SpringParams::new(self.easing.unwrap_or(self.easing_range[0]), friction)?;
        }
        if !self.angle_scale.is_finite() || self.angle_scale <= 0.0 {
            return Err(ConfigurationError::AngleScale(self.angle_scale));
        }
        if !self.pointer_range.is_finite() || self.pointer_range <= 0.0 {
            return Err(ConfigurationError::PointerRange(self.pointer_range));
        }
        Ok(())
    }
}

fn check_range(name: &'static str, [start, end]: [f64; 2]) -> Result<(), ConfigurationError> {
    if start.is_finite() && end.is_finite() && start < end {
        Ok(())
    } else {
        Err(ConfigurationError::EmptyRange { name, start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            z_near: 0.1,
            z_far: 100.0,
            position: [0.0, 7.0, 30.0],
            look_at: [0.0, -1.0, 0.0],
        }
    }
}

/// A directional light shining from `position` towards `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub color: String,
    pub intensity: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: "#FFFFFF".to_string(),
            intensity: 1.0,
            position: [0.0, 1.0, 0.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

impl LightConfig {
    /// Two white key lights and two pink rim lights
    pub fn defaults() -> Vec<Self> {
        vec![
            Self { color: "#FFFFFF".into(), intensity: 300.0, position: [20.0, 2.0, 0.0], target: [0.0; 3] },
            Self { color: "#FFFFFF".into(), intensity: 300.0, position: [-10.0, 8.0, 0.0], target: [0.0; 3] },
            Self { color: "#FF66F9".into(), intensity: 200.0, position: [20.0, -3.0, 2.0], target: [0.0, -7.0, 0.0] },
            Self { color: "#FF66F9".into(), intensity: 3.0, position: [-4.0, -3.0, 9.0], target: [0.0; 3] },
        ]
    }
}

/// Parse `#RRGGBB` into linear-ish 0..1 components
pub fn parse_hex_color(text: &str) -> Result<[f32; 3], ConfigurationError> {
    let invalid = || ConfigurationError::Color(text.to_string());
    let hex = text.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let mut rgb = [0.0; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        *channel = byte as f32 / 255.0;
    }
    Ok(rgb)
}
