//! wgpu render backend for streamed ground.
//!
//! Implements [`groundwork_render::GraphicsBackend`] with GPU vertex buffers and
//! a solid-color 2D shader. A side-scrolling orthographic camera supplies the
//! projection.
//!
//! # Invariants
//! - The renderer never touches terrain or physics state.
//! - Camera motion is presentation only and does not feed back into streaming,
//!   except through the x position the app passes to `load`.

mod camera;
mod gpu;
mod shaders;

pub use camera::FollowCamera;
pub use gpu::{MVP_UNIFORM, WgpuBackend};
