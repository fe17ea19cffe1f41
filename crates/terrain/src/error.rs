use groundwork_physics::PhysicsError;
use groundwork_render::RenderError;

use crate::config::ConfigError;

/// Errors from building, streaming or drawing terrain.
///
/// None of these are recoverable inside the streamer: a failed load leaves
/// the affected slot empty and the caller is expected to abort the frame.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("invalid terrain config: {0}")]
    Config(#[from] ConfigError),
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("window of {window} chunks does not fit a ring of {capacity} slots")]
    WindowMismatch { window: u32, capacity: u32 },
    #[error("slot {0} is empty; load must complete before drawing")]
    EmptySlot(usize),
}
