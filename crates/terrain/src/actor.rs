use glam::{Mat4, Vec2, Vec3};
use groundwork_physics::{BodyDef, BodyHandle, PhysicsWorld};
use groundwork_render::{GraphicsBackend, ShaderHandle};

use crate::chunk::GroundChunk;
use crate::config::TerrainConfig;
use crate::error::TerrainError;
use crate::heightfield::Heightfield;
use crate::ring::{ChunkRing, ChunkSource, LoadReport, StreamStats, StreamWindow};

/// Name of the matrix uniform the ground shader expects.
pub const MVP_UNIFORM: &str = "mvp";

/// Infinite streamed ground: one static body plus a ring of chunks around
/// the viewer.
///
/// Backends are borrowed per call. Call [`GroundActor::destroy`] before
/// dropping, otherwise the resident fixtures and meshes leak.
#[derive(Debug)]
pub struct GroundActor {
    config: TerrainConfig,
    field: Heightfield,
    body: BodyHandle,
    ring: ChunkRing,
    stats: StreamStats,
}

impl GroundActor {
    /// Create the ground body and stream in the window around x = 0.
    pub fn new<P, G>(
        physics: &mut P,
        graphics: &mut G,
        config: TerrainConfig,
    ) -> Result<Self, TerrainError>
    where
        P: PhysicsWorld + ?Sized,
        G: GraphicsBackend + ?Sized,
    {
        config.validate()?;
        let body = physics.create_body(&BodyDef::static_at(Vec2::ZERO));
        tracing::info!(
            body = body.0,
            chunk_size = config.chunk_size,
            window = config.window_length,
            "ground actor created"
        );

        let mut actor = Self {
            field: Heightfield::from_config(&config),
            ring: ChunkRing::new(config.window_length),
            stats: StreamStats::default(),
            config,
            body,
        };
        if let Err(e) = actor.load(physics, graphics, 0.0) {
            if let Err(release) = actor.destroy(physics, graphics) {
                tracing::error!("failed to release partially loaded ground: {release}");
            }
            return Err(e);
        }
        Ok(actor)
    }

    /// Stream chunks so the window is centered on the chunk holding `world_x`.
    pub fn load<P, G>(
        &mut self,
        physics: &mut P,
        graphics: &mut G,
        world_x: f32,
    ) -> Result<LoadReport, TerrainError>
    where
        P: PhysicsWorld + ?Sized,
        G: GraphicsBackend + ?Sized,
    {
        let window = StreamWindow::for_position(world_x, &self.config);
        let source = ChunkSource {
            body: self.body,
            config: &self.config,
            field: &self.field,
        };
        let report = self.ring.load(window, source, physics, graphics)?;
        self.stats.record(&report);
        Ok(report)
    }

    /// Issue one draw per slot, each offset to its chunk's world x.
    pub fn draw<G>(
        &self,
        graphics: &mut G,
        shader: ShaderHandle,
        projection: Mat4,
    ) -> Result<(), TerrainError>
    where
        G: GraphicsBackend + ?Sized,
    {
        for (slot, chunk) in self.ring.slots().iter().enumerate() {
            let chunk = chunk.as_ref().ok_or(TerrainError::EmptySlot(slot))?;
            let model = Mat4::from_translation(Vec3::new(chunk.origin_x(&self.config), 0.0, 0.0));
            graphics.set_uniform(shader, MVP_UNIFORM, projection * model)?;
            graphics.draw(chunk.mesh(), shader)?;
        }
        Ok(())
    }

    /// Surface height under `world_x`, from the heightfield.
    pub fn height_at(&self, world_x: f32) -> f32 {
        self.field.height_at(world_x, self.config.resolution)
    }

    /// Release every chunk, then the ground body.
    ///
    /// A failed release does not stop the rest; the first error is returned.
    pub fn destroy<P, G>(mut self, physics: &mut P, graphics: &mut G) -> Result<(), TerrainError>
    where
        P: PhysicsWorld + ?Sized,
        G: GraphicsBackend + ?Sized,
    {
        let chunks = self.ring.take_all();
        let count = chunks.len();
        let mut first_err: Option<TerrainError> = None;
        for chunk in chunks {
            let index = chunk.index();
            if let Err(e) = chunk.destroy(physics, graphics) {
                tracing::error!(index, "failed to release ground chunk: {e}");
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = physics.destroy_body(self.body) {
            tracing::error!("failed to release ground body: {e}");
            first_err.get_or_insert(e.into());
        }
        match first_err {
            Some(e) => Err(e),
            None => {
                tracing::info!(chunks = count, "ground actor destroyed");
                Ok(())
            }
        }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn heightfield(&self) -> &Heightfield {
        &self.field
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn ring(&self) -> &ChunkRing {
        &self.ring
    }

    pub fn chunk(&self, index: i32) -> Option<&GroundChunk> {
        self.ring.get(index)
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

impl Drop for GroundActor {
    fn drop(&mut self) {
        let leaked = self.ring.len();
        if leaked > 0 {
            tracing::warn!(
                chunks = leaked,
                body = self.body.0,
                "ground actor dropped without destroy; fixtures and meshes leaked"
            );
        }
    }
}
