/// Error types shared by the controller, the asset stage and the entry points

/// Rejected spring or scene configuration, detected at construction time
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("friction must be finite and within [0, 1), got {0}")]
    Friction(f64),
    #[error("easing must be finite and greater than zero, got {0}")]
    Easing(f64),
    #[error("empty randomization range for {name}: [{start}, {end})")]
    EmptyRange {
        name: &'static str,
        start: f64,
        end: f64,
    },
    #[error("angle scale must be finite and greater than zero, got {0}")]
    AngleScale(f64),
    #[error("pointer range must be finite and greater than zero, got {0}")]
    PointerRange(f64),
    #[error("model scale must be finite and greater than zero, got {0}")]
    ModelScale(f32),
    #[error("max pixel ratio must be finite and at least 1, got {0}")]
    PixelRatio(f64),
    #[error("invalid color {0:?}, expected #RRGGBB")]
    Color(String),
    #[error("invalid scene config: {0}")]
    Parse(String),
}

/// The model could not be obtained or decoded
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadFailure {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("request for {path} failed with status {status}")]
    Http { path: String, status: u16 },
    #[error("malformed model data in {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("unknown built-in model `{0}`")]
    UnknownBuiltin(String),
}

/// A pointer or gesture sample that would poison the rotation state
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("non-finite pointer coordinate ({x}, {y})")]
pub struct InvalidInputError {
    pub x: f64,
    pub y: f64,
}

/// Top-level error for the native and web entry points
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Load(#[from] LoadFailure),
    #[error("GPU initialization failed: {0}")]
    Gpu(String),
    #[error("window setup failed: {0}")]
    Window(String),
}
