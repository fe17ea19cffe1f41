use glam::Mat4;

/// Handle to an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u32);

/// Handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

/// Scalar type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    Float,
}

/// One named attribute inside a vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: String,
    pub kind: VertexKind,
    pub components: u32,
}

impl VertexAttribute {
    pub fn float(name: impl Into<String>, components: u32) -> Self {
        Self {
            name: name.into(),
            kind: VertexKind::Float,
            components,
        }
    }
}

/// Ordered list of attributes making up one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    attributes: Vec<VertexAttribute>,
}

impl VertexFormat {
    pub fn new(attributes: Vec<VertexAttribute>) -> Self {
        Self { attributes }
    }

    /// The `a_position: vec2` format used by flat 2D meshes.
    pub fn position_2d() -> Self {
        Self::new(vec![VertexAttribute::float("a_position", 2)])
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Floats per vertex.
    pub fn components(&self) -> u32 {
        self.attributes.iter().map(|a| a.components).sum()
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u64 {
        self.components() as u64 * std::mem::size_of::<f32>() as u64
    }
}

/// How consecutive vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    TriangleList,
    LineList,
    PointList,
}

impl Topology {
    /// Vertices consumed per primitive.
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            Self::TriangleList => 3,
            Self::LineList => 2,
            Self::PointList => 1,
        }
    }

    /// Check that `count` vertices form whole primitives.
    pub fn check_vertex_count(self, count: usize) -> Result<(), RenderError> {
        let per_primitive = self.vertices_per_primitive();
        if count % per_primitive != 0 {
            return Err(RenderError::IncompletePrimitive {
                topology: self,
                count,
                per_primitive,
            });
        }
        Ok(())
    }
}

/// Errors from graphics backend operations.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("vertex format {0:?} is not supported by this backend")]
    UnsupportedFormat(VertexFormat),
    #[error("mesh has {count} vertices, not a multiple of {per_primitive} for {topology:?}")]
    IncompletePrimitive {
        topology: Topology,
        count: usize,
        per_primitive: usize,
    },
    #[error("mesh {0:?} not found")]
    MeshNotFound(MeshHandle),
    #[error("shader {0:?} not found")]
    ShaderNotFound(ShaderHandle),
    #[error("shader {shader:?} has no uniform named {name:?}")]
    UnknownUniform { shader: ShaderHandle, name: String },
    #[error("draw capacity of {0} calls per frame exceeded")]
    FrameCapacity(usize),
    #[error("mesh capacity of {0} exhausted")]
    MeshCapacity(usize),
}

/// Backend-agnostic mesh/shader interface.
///
/// Vertices are passed as 2D positions; the format describes how the backend
/// should interpret them.
pub trait GraphicsBackend {
    /// Upload a non-indexed vertex buffer and return its handle.
    fn create_mesh(
        &mut self,
        format: &VertexFormat,
        topology: Topology,
        vertices: &[[f32; 2]],
    ) -> Result<MeshHandle, RenderError>;

    /// Release a mesh's buffers.
    fn destroy_mesh(&mut self, mesh: MeshHandle) -> Result<(), RenderError>;

    /// Bind a matrix uniform on a shader; read by subsequent draws.
    fn set_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        value: Mat4,
    ) -> Result<(), RenderError>;

    /// Draw a whole mesh with a shader.
    fn draw(&mut self, mesh: MeshHandle, shader: ShaderHandle) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_format_stride() {
        let format = VertexFormat::position_2d();
        assert_eq!(format.components(), 2);
        assert_eq!(format.stride(), 8);
        assert_eq!(format.attributes()[0].name, "a_position");
    }

    #[test]
    fn triangle_list_requires_triples() {
        assert!(Topology::TriangleList.check_vertex_count(6).is_ok());
        assert!(matches!(
            Topology::TriangleList.check_vertex_count(4),
            Err(RenderError::IncompletePrimitive { count: 4, .. })
        ));
        assert!(Topology::PointList.check_vertex_count(5).is_ok());
    }
}
