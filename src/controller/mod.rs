// CONTROLLER: Input, rotation integrator, asset gate and frame loop
pub mod asset_stage;
pub mod frame_loop;
pub mod input;
pub mod rotation;

pub use asset_stage::{AssetLoader, AssetStage, LoadCallback, StageStatus};
pub use frame_loop::{
    DrawTarget, Frame, FrameCallback, FrameQueue, FrameScheduler, LoopHandle, RenderLoop, SceneHandles,
};
pub use input::{dispatch, InputEvent, InputState};
pub use rotation::{RotationController, RotationMode, RotationState, SpringParams};
