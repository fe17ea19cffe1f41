use glam::Mat4;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::backend::{
    GraphicsBackend, MeshHandle, RenderError, ShaderHandle, Topology, VertexFormat,
};

/// A mesh held in memory by the recording backend.
#[derive(Debug, Clone)]
pub struct RecordedMesh {
    pub format: VertexFormat,
    pub topology: Topology,
    pub vertices: Vec<[f32; 2]>,
}

/// One recorded draw call, with the uniforms bound at the time of the draw.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub mesh: MeshHandle,
    pub shader: ShaderHandle,
    pub uniforms: BTreeMap<String, Mat4>,
    pub vertex_count: usize,
}

#[derive(Debug, Clone, Default)]
struct RecordedShader {
    uniforms: BTreeMap<String, Option<Mat4>>,
}

/// Graphics backend that keeps everything in memory.
///
/// Useful for tests, headless tools and logging. Draw calls accumulate until
/// [`RecordingBackend::take_draws`] is called.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    meshes: BTreeMap<MeshHandle, RecordedMesh>,
    shaders: BTreeMap<ShaderHandle, RecordedShader>,
    draws: Vec<DrawCall>,
    next_mesh: u32,
    next_shader: u32,
    mesh_capacity: Option<usize>,
    meshes_created: usize,
    meshes_destroyed: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many meshes may be alive at once; further uploads fail.
    pub fn with_mesh_capacity(mut self, capacity: usize) -> Self {
        self.mesh_capacity = Some(capacity);
        self
    }

    /// Register a shader that accepts the given matrix uniforms.
    pub fn create_shader(&mut self, uniforms: &[&str]) -> ShaderHandle {
        let handle = ShaderHandle(self.next_shader);
        self.next_shader += 1;
        let shader = RecordedShader {
            uniforms: uniforms.iter().map(|u| (u.to_string(), None)).collect(),
        };
        self.shaders.insert(handle, shader);
        handle
    }

    pub fn mesh(&self, mesh: MeshHandle) -> Option<&RecordedMesh> {
        self.meshes.get(&mesh)
    }

    /// Meshes currently alive.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn meshes_created(&self) -> usize {
        self.meshes_created
    }

    pub fn meshes_destroyed(&self) -> usize {
        self.meshes_destroyed
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Drain and return recorded draw calls.
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    /// Human-readable dump of backend state and pending draws.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Recording backend (meshes={}, created={}, destroyed={}) ===",
            self.meshes.len(),
            self.meshes_created,
            self.meshes_destroyed
        );
        let _ = writeln!(out, "Draws: {}", self.draws.len());
        for draw in &self.draws {
            let tx = draw
                .uniforms
                .get("mvp")
                .map(|m| m.w_axis.x)
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  mesh={} shader={} vertices={} mvp.tx={:.3}",
                draw.mesh.0, draw.shader.0, draw.vertex_count, tx
            );
        }
        out
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_mesh(
        &mut self,
        format: &VertexFormat,
        topology: Topology,
        vertices: &[[f32; 2]],
    ) -> Result<MeshHandle, RenderError> {
        if format.components() != 2 {
            return Err(RenderError::UnsupportedFormat(format.clone()));
        }
        topology.check_vertex_count(vertices.len())?;
        if let Some(capacity) = self.mesh_capacity {
            if self.meshes.len() >= capacity {
                return Err(RenderError::MeshCapacity(capacity));
            }
        }

        let handle = MeshHandle(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(
            handle,
            RecordedMesh {
                format: format.clone(),
                topology,
                vertices: vertices.to_vec(),
            },
        );
        self.meshes_created += 1;
        tracing::trace!(mesh = handle.0, vertices = vertices.len(), "mesh recorded");
        Ok(handle)
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) -> Result<(), RenderError> {
        self.meshes
            .remove(&mesh)
            .ok_or(RenderError::MeshNotFound(mesh))?;
        self.meshes_destroyed += 1;
        Ok(())
    }

    fn set_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        value: Mat4,
    ) -> Result<(), RenderError> {
        let entry = self
            .shaders
            .get_mut(&shader)
            .ok_or(RenderError::ShaderNotFound(shader))?;
        let slot = entry
            .uniforms
            .get_mut(name)
            .ok_or_else(|| RenderError::UnknownUniform {
                shader,
                name: name.to_string(),
            })?;
        *slot = Some(value);
        Ok(())
    }

    fn draw(&mut self, mesh: MeshHandle, shader: ShaderHandle) -> Result<(), RenderError> {
        let vertex_count = self
            .meshes
            .get(&mesh)
            .ok_or(RenderError::MeshNotFound(mesh))?
            .vertices
            .len();
        let uniforms = self
            .shaders
            .get(&shader)
            .ok_or(RenderError::ShaderNotFound(shader))?
            .uniforms
            .iter()
            .filter_map(|(name, value)| value.map(|v| (name.clone(), v)))
            .collect();
        self.draws.push(DrawCall {
            mesh,
            shader,
            uniforms,
            vertex_count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const TRIANGLE: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];

    #[test]
    fn create_and_destroy_mesh() {
        let mut backend = RecordingBackend::new();
        let mesh = backend
            .create_mesh(&VertexFormat::position_2d(), Topology::TriangleList, &TRIANGLE)
            .unwrap();
        assert_eq!(backend.mesh_count(), 1);
        assert_eq!(backend.mesh(mesh).unwrap().vertices.len(), 3);

        backend.destroy_mesh(mesh).unwrap();
        assert_eq!(backend.mesh_count(), 0);
        assert!(matches!(
            backend.destroy_mesh(mesh),
            Err(RenderError::MeshNotFound(_))
        ));
        assert_eq!(backend.meshes_created(), 1);
        assert_eq!(backend.meshes_destroyed(), 1);
    }

    #[test]
    fn rejects_non_2d_format() {
        let mut backend = RecordingBackend::new();
        let format = VertexFormat::new(vec![crate::VertexAttribute::float("a_position", 3)]);
        assert!(matches!(
            backend.create_mesh(&format, Topology::TriangleList, &TRIANGLE),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn mesh_capacity_is_enforced() {
        let mut backend = RecordingBackend::new().with_mesh_capacity(1);
        let format = VertexFormat::position_2d();
        backend
            .create_mesh(&format, Topology::TriangleList, &TRIANGLE)
            .unwrap();
        assert!(matches!(
            backend.create_mesh(&format, Topology::TriangleList, &TRIANGLE),
            Err(RenderError::MeshCapacity(1))
        ));
    }

    #[test]
    fn draw_captures_bound_uniforms() {
        let mut backend = RecordingBackend::new();
        let shader = backend.create_shader(&["mvp"]);
        let mesh = backend
            .create_mesh(&VertexFormat::position_2d(), Topology::TriangleList, &TRIANGLE)
            .unwrap();

        let a = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let b = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        backend.set_uniform(shader, "mvp", a).unwrap();
        backend.draw(mesh, shader).unwrap();
        backend.set_uniform(shader, "mvp", b).unwrap();
        backend.draw(mesh, shader).unwrap();

        let draws = backend.take_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].uniforms["mvp"], a);
        assert_eq!(draws[1].uniforms["mvp"], b);
        assert_eq!(draws[1].vertex_count, 3);
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn unknown_uniform_is_rejected() {
        let mut backend = RecordingBackend::new();
        let shader = backend.create_shader(&["mvp"]);
        assert!(matches!(
            backend.set_uniform(shader, "model", Mat4::IDENTITY),
            Err(RenderError::UnknownUniform { .. })
        ));
        assert!(matches!(
            backend.set_uniform(ShaderHandle(9), "mvp", Mat4::IDENTITY),
            Err(RenderError::ShaderNotFound(_))
        ));
    }

    #[test]
    fn summary_lists_draws() {
        let mut backend = RecordingBackend::new();
        let shader = backend.create_shader(&["mvp"]);
        let mesh = backend
            .create_mesh(&VertexFormat::position_2d(), Topology::TriangleList, &TRIANGLE)
            .unwrap();
        backend.set_uniform(shader, "mvp", Mat4::IDENTITY).unwrap();
        backend.draw(mesh, shader).unwrap();

        let out = backend.summary();
        assert!(out.contains("meshes=1"));
        assert!(out.contains("Draws: 1"));
        assert!(out.contains("vertices=3"));
    }
}
