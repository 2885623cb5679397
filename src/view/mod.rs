// VIEW: wgpu renderer and debug overlay
pub mod gpu_init;
pub mod overlay;
pub mod render;

pub use gpu_init::GpuContext;
pub use overlay::DebugOverlay;
pub use render::Renderer;
