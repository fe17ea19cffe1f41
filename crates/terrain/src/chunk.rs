use glam::Vec2;
use groundwork_physics::{BodyHandle, ChainShape, FixtureDef, FixtureHandle, PhysicsWorld};
use groundwork_render::{GraphicsBackend, MeshHandle, Topology, VertexFormat};
use serde::Serialize;

use crate::config::TerrainConfig;
use crate::error::TerrainError;
use crate::heightfield::Heightfield;

/// Vertices emitted per column interval (two triangles).
pub const VERTICES_PER_COLUMN: usize = 6;

/// CPU-side geometry of one chunk, before anything is uploaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkGeometry {
    pub index: i32,
    /// `chunk_size + 1` samples; the last one is shared with the next chunk.
    pub heights: Vec<f32>,
    /// Non-indexed triangle list in chunk-local x.
    pub vertices: Vec<[f32; 2]>,
    /// Surface polyline in world space.
    pub chain: Vec<Vec2>,
    /// Ghost vertex one column before the chunk.
    pub prev_ghost: Vec2,
    /// Ghost vertex one column after the chunk's last sample.
    pub next_ghost: Vec2,
}

impl ChunkGeometry {
    pub fn generate(index: i32, config: &TerrainConfig, field: &Heightfield) -> Self {
        let size = config.chunk_size as usize;
        let res = config.resolution;
        let depth = config.chunk_depth;
        let first = config.first_column(index);

        let heights = field.sample(first, size + 1);

        let mut vertices = Vec::with_capacity(size * VERTICES_PER_COLUMN);
        for i in 0..size {
            let x0 = i as f32 * res;
            let x1 = (i + 1) as f32 * res;
            let (h0, h1) = (heights[i], heights[i + 1]);
            vertices.extend_from_slice(&[
                [x0, h0 - depth],
                [x1, h1 - depth],
                [x1, h1],
                [x0, h0 - depth],
                [x0, h0],
                [x1, h1],
            ]);
        }

        let chain = heights
            .iter()
            .enumerate()
            .map(|(i, h)| Vec2::new(config.column_x(first + i as i64), *h))
            .collect();

        let before = first - 1;
        let after = first + size as i64 + 1;
        Self {
            index,
            heights,
            vertices,
            chain,
            prev_ghost: Vec2::new(config.column_x(before), field.height(before)),
            next_ghost: Vec2::new(config.column_x(after), field.height(after)),
        }
    }

    /// Chain shape with both ghost vertices set.
    pub fn chain_shape(&self) -> Result<ChainShape, TerrainError> {
        Ok(ChainShape::new(self.chain.clone())?
            .with_prev_vertex(self.prev_ghost)
            .with_next_vertex(self.next_ghost))
    }
}

/// A resident chunk: its samples plus the mesh and fixture it owns.
///
/// Release goes through [`GroundChunk::destroy`], which consumes the chunk so
/// its fixture can only ever be detached once.
#[derive(Debug)]
pub struct GroundChunk {
    index: i32,
    heights: Vec<f32>,
    mesh: MeshHandle,
    fixture: FixtureHandle,
    body: BodyHandle,
}

impl GroundChunk {
    /// Generate chunk `index`, upload its mesh and attach its fixture to `body`.
    pub fn build<P, G>(
        physics: &mut P,
        graphics: &mut G,
        body: BodyHandle,
        index: i32,
        config: &TerrainConfig,
        field: &Heightfield,
    ) -> Result<Self, TerrainError>
    where
        P: PhysicsWorld + ?Sized,
        G: GraphicsBackend + ?Sized,
    {
        let geometry = ChunkGeometry::generate(index, config, field);
        let shape = geometry.chain_shape()?;

        let mesh = graphics.create_mesh(
            &VertexFormat::position_2d(),
            Topology::TriangleList,
            &geometry.vertices,
        )?;

        let def = FixtureDef {
            shape,
            friction: config.friction,
        };
        let fixture = match physics.create_fixture(body, &def) {
            Ok(fixture) => fixture,
            Err(e) => {
                if let Err(release) = graphics.destroy_mesh(mesh) {
                    tracing::error!(index, "failed to release mesh after fixture error: {release}");
                }
                return Err(e.into());
            }
        };

        tracing::debug!(index, mesh = mesh.0, fixture = fixture.0, "chunk built");
        Ok(Self {
            index,
            heights: geometry.heights,
            mesh,
            fixture,
            body,
        })
    }

    /// Detach the fixture from its body, then release the mesh.
    ///
    /// Both releases are attempted; the first failure is returned.
    pub fn destroy<P, G>(self, physics: &mut P, graphics: &mut G) -> Result<(), TerrainError>
    where
        P: PhysicsWorld + ?Sized,
        G: GraphicsBackend + ?Sized,
    {
        // The mesh is released even if the fixture is already gone.
        let detached = physics.destroy_fixture(self.body, self.fixture);
        let released = graphics.destroy_mesh(self.mesh);
        detached?;
        released?;
        tracing::debug!(index = self.index, "chunk destroyed");
        Ok(())
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn fixture(&self) -> FixtureHandle {
        self.fixture
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// World x where this chunk's mesh is placed.
    pub fn origin_x(&self, config: &TerrainConfig) -> f32 {
        config.chunk_origin_x(self.index)
    }
}
