//! Rendering adapter: backend-agnostic mesh upload and draw interface.
//!
//! # Invariants
//! - Mesh data is uploaded once and referenced by handle afterwards.
//! - Uniforms are bound per shader and read at draw time.
//!
//! # Workaround
//! Provides a [`RecordingBackend`] that keeps vertex data in memory and logs
//! every draw call, standing in for a GPU during tests and in the CLI. The
//! wgpu backend implements the same [`GraphicsBackend`] trait.

mod backend;
mod recording;

pub use backend::{
    GraphicsBackend, MeshHandle, RenderError, ShaderHandle, Topology, VertexAttribute,
    VertexFormat, VertexKind,
};
pub use recording::{DrawCall, RecordedMesh, RecordingBackend};

pub fn crate_info() -> &'static str {
    "groundwork-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
