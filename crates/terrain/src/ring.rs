use std::time::{Duration, Instant};

use groundwork_physics::{BodyHandle, PhysicsWorld};
use groundwork_render::GraphicsBackend;

use crate::chunk::GroundChunk;
use crate::config::TerrainConfig;
use crate::error::TerrainError;
use crate::heightfield::Heightfield;

/// The contiguous range of chunk indices that should be resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamWindow {
    /// Chunk containing the viewer.
    pub center: i32,
    /// First resident chunk index.
    pub start: i32,
    pub len: u32,
}

impl StreamWindow {
    /// Window around the chunk containing `world_x`.
    ///
    /// Uses floor division so positions just left of zero land in chunk -1,
    /// not chunk 0.
    pub fn for_position(world_x: f32, config: &TerrainConfig) -> Self {
        let chunks = world_x as f64 / config.resolution as f64 / config.chunk_size as f64;
        let len = config.window_length;
        // Keep start..start+len inside i32 for absurd positions, in i64 so
        // an unvalidated window length cannot overflow.
        let margin = (len as i64).min(i32::MAX as i64 / 2);
        let center = (chunks.floor() as i64).clamp(i32::MIN as i64 + margin, i32::MAX as i64 - margin);
        let start = (center - (len / 2) as i64).max(i32::MIN as i64);
        Self {
            center: center as i32,
            start: start as i32,
            len,
        }
    }

    /// Chunk indices in window order, cut off at `i32::MAX`.
    pub fn indices(&self) -> impl Iterator<Item = i32> + use<> {
        let start = self.start as i64;
        (0..self.len as i64)
            .map(move |i| start + i)
            .take_while(|pos| *pos <= i32::MAX as i64)
            .map(|pos| pos as i32)
    }

    pub fn contains(&self, index: i32) -> bool {
        let index = index as i64;
        index >= self.start as i64 && index < self.start as i64 + self.len as i64
    }
}

/// Ring slot holding chunk `index`. Non-negative for negative indices too.
pub fn slot_index(index: i32, len: u32) -> usize {
    (index as i64).rem_euclid(len as i64) as usize
}

/// Everything needed to build a chunk, minus the backends.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSource<'a> {
    pub body: BodyHandle,
    pub config: &'a TerrainConfig,
    pub field: &'a Heightfield,
}

/// What a single load call changed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub window: StreamWindow,
    /// Chunk indices built this call, in window order.
    pub built: Vec<i32>,
    /// Chunk indices evicted this call.
    pub evicted: Vec<i32>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn rebuilds(&self) -> usize {
        self.built.len()
    }

    pub fn is_noop(&self) -> bool {
        self.built.is_empty() && self.evicted.is_empty()
    }
}

/// Cumulative streaming counters for instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    pub loads: u64,
    pub chunks_built: u64,
    pub chunks_evicted: u64,
    pub last_load: Duration,
    pub last_center: Option<i32>,
}

impl StreamStats {
    pub fn record(&mut self, report: &LoadReport) {
        self.loads += 1;
        self.chunks_built += report.built.len() as u64;
        self.chunks_evicted += report.evicted.len() as u64;
        self.last_load = report.elapsed;
        self.last_center = Some(report.window.center);
    }
}

/// Fixed-capacity slot array keyed by `chunk_index mod len`.
#[derive(Debug)]
pub struct ChunkRing {
    slots: Vec<Option<GroundChunk>>,
}

impl ChunkRing {
    /// `len` empty slots.
    pub fn new(len: u32) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn is_fully_populated(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn slots(&self) -> &[Option<GroundChunk>] {
        &self.slots
    }

    /// Occupied slots, in slot order.
    pub fn resident(&self) -> impl Iterator<Item = &GroundChunk> {
        self.slots.iter().flatten()
    }

    /// Resident chunk indices, sorted.
    pub fn resident_indices(&self) -> Vec<i32> {
        let mut indices: Vec<i32> = self.resident().map(GroundChunk::index).collect();
        indices.sort_unstable();
        indices
    }

    /// The resident chunk with this index, if any.
    pub fn get(&self, index: i32) -> Option<&GroundChunk> {
        self.slots[slot_index(index, self.capacity())]
            .as_ref()
            .filter(|c| c.index() == index)
    }

    /// Make `window` resident.
    ///
    /// Slots already holding the right chunk are left alone. An empty slot
    /// always gets built. The first build or destroy error aborts the call.
    /// The window must be exactly as long as the ring.
    pub fn load<P, G>(
        &mut self,
        window: StreamWindow,
        source: ChunkSource<'_>,
        physics: &mut P,
        graphics: &mut G,
    ) -> Result<LoadReport, TerrainError>
    where
        P: PhysicsWorld + ?Sized,
        G: GraphicsBackend + ?Sized,
    {
        let _span = tracing::info_span!("ground_load", center = window.center).entered();
        if window.len != self.capacity() {
            return Err(TerrainError::WindowMismatch {
                window: window.len,
                capacity: self.capacity(),
            });
        }
        let started = Instant::now();
        let mut built = Vec::new();
        let mut evicted = Vec::new();

        for pos in window.indices() {
            let idx = slot_index(pos, self.capacity());
            let slot = &mut self.slots[idx];
            if slot.as_ref().is_some_and(|c| c.index() == pos) {
                continue;
            }
            if let Some(old) = slot.take() {
                tracing::debug!(slot = idx, old = old.index(), new = pos, "evicting chunk");
                evicted.push(old.index());
                old.destroy(physics, graphics)?;
            }
            *slot = Some(GroundChunk::build(
                physics,
                graphics,
                source.body,
                pos,
                source.config,
                source.field,
            )?);
            built.push(pos);
        }

        tracing::trace!(
            built = built.len(),
            evicted = evicted.len(),
            resident = self.len(),
            "ground load complete"
        );
        Ok(LoadReport {
            window,
            built,
            evicted,
            elapsed: started.elapsed(),
        })
    }

    /// Empty every slot, returning the chunks for teardown.
    pub fn take_all(&mut self) -> Vec<GroundChunk> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_physics::{BodyDef, ChainWorld};
    use groundwork_render::RecordingBackend;

    fn config(chunk_size: u32, resolution: f32, window_length: u32) -> TerrainConfig {
        TerrainConfig {
            chunk_size,
            resolution,
            window_length,
            ..TerrainConfig::default()
        }
    }

    struct Rig {
        config: TerrainConfig,
        field: Heightfield,
        physics: ChainWorld,
        graphics: RecordingBackend,
        body: BodyHandle,
        ring: ChunkRing,
    }

    impl Rig {
        fn new(config: TerrainConfig) -> Self {
            let mut physics = ChainWorld::new();
            let body = physics.create_body(&BodyDef::default());
            Self {
                field: Heightfield::from_config(&config),
                ring: ChunkRing::new(config.window_length),
                graphics: RecordingBackend::new(),
                config,
                physics,
                body,
            }
        }

        fn load(&mut self, world_x: f32) -> LoadReport {
            let window = StreamWindow::for_position(world_x, &self.config);
            let source = ChunkSource {
                body: self.body,
                config: &self.config,
                field: &self.field,
            };
            self.ring
                .load(window, source, &mut self.physics, &mut self.graphics)
                .unwrap()
        }
    }

    #[test]
    fn slot_index_is_non_negative() {
        assert_eq!(slot_index(0, 8), 0);
        assert_eq!(slot_index(9, 8), 1);
        assert_eq!(slot_index(-1, 8), 7);
        assert_eq!(slot_index(-8, 8), 0);
        assert_eq!(slot_index(-9, 8), 7);
    }

    #[test]
    fn window_uses_floor_division() {
        let config = config(256, 0.1, 8);
        let w = StreamWindow::for_position(-1.0, &config);
        assert_eq!(w.center, -1);
        assert_eq!(w.start, -5);
        assert_eq!(w.indices().collect::<Vec<_>>(), (-5..3).collect::<Vec<_>>());

        let w = StreamWindow::for_position(0.0, &config);
        assert_eq!(w.center, 0);
        assert_eq!(w.start, -4);

        // One chunk is 25.6 world units wide.
        let w = StreamWindow::for_position(25.0, &config);
        assert_eq!(w.center, 0);
        let w = StreamWindow::for_position(26.0, &config);
        assert_eq!(w.center, 1);
        let w = StreamWindow::for_position(-26.0, &config);
        assert_eq!(w.center, -2);
    }

    #[test]
    fn unvalidated_window_length_does_not_overflow() {
        for window_length in [1 << 31, u32::MAX] {
            let config = config(256, 0.1, window_length);
            let w = StreamWindow::for_position(0.0, &config);
            assert!(w.start <= w.center);
            assert!(w.contains(w.center));
            let w = StreamWindow::for_position(f32::MAX, &config);
            assert!(w.contains(w.center));
            assert!(w.contains(i32::MAX));
            assert_eq!(w.indices().next(), Some(w.start));
        }
        assert_eq!(slot_index(-1, u32::MAX), u32::MAX as usize - 1);
    }

    #[test]
    fn odd_window_length() {
        let config = config(4, 1.0, 5);
        let w = StreamWindow::for_position(0.0, &config);
        assert_eq!(w.start, -2);
        assert!(w.contains(2));
        assert!(!w.contains(3));
    }

    #[test]
    fn extreme_positions_do_not_overflow() {
        let config = config(1, 0.001, 8);
        let w = StreamWindow::for_position(f32::MAX, &config);
        assert_eq!(w.indices().count(), 8);
        let w = StreamWindow::for_position(f32::MIN, &config);
        assert_eq!(w.indices().count(), 8);
    }

    #[test]
    fn load_fills_every_slot_with_the_window() {
        let mut rig = Rig::new(config(4, 0.5, 8));
        let report = rig.load(0.0);

        assert_eq!(report.rebuilds(), 8);
        assert!(report.evicted.is_empty());
        assert!(rig.ring.is_fully_populated());
        assert_eq!(rig.ring.resident_indices(), (-4..4).collect::<Vec<_>>());
        for chunk in rig.ring.resident() {
            let slot = slot_index(chunk.index(), 8);
            assert_eq!(rig.ring.slots()[slot].as_ref().unwrap().index(), chunk.index());
        }
        assert_eq!(rig.physics.total_fixtures(), 8);
        assert_eq!(rig.graphics.mesh_count(), 8);
    }

    #[test]
    fn reload_in_same_chunk_is_a_noop() {
        let mut rig = Rig::new(config(4, 0.5, 8));
        rig.load(0.1);
        rig.physics.drain_events();

        // Chunk 0 spans [0, 2) world units.
        let report = rig.load(1.9);
        assert!(report.is_noop());
        assert!(rig.physics.events().is_empty());
        assert_eq!(rig.graphics.meshes_created(), 8);
    }

    #[test]
    fn shifting_one_chunk_rebuilds_one_slot() {
        let mut rig = Rig::new(config(4, 0.5, 8));
        rig.load(0.0);

        let report = rig.load(2.0);
        assert_eq!(report.window.center, 1);
        assert_eq!(report.built, vec![4]);
        assert_eq!(report.evicted, vec![-4]);
        assert_eq!(rig.ring.resident_indices(), (-3..5).collect::<Vec<_>>());

        let report = rig.load(0.0);
        assert_eq!(report.built, vec![-4]);
        assert_eq!(report.evicted, vec![4]);
    }

    #[test]
    fn jumping_far_rebuilds_everything() {
        let mut rig = Rig::new(config(4, 0.5, 8));
        rig.load(0.0);
        let report = rig.load(1000.0);
        assert_eq!(report.rebuilds(), 8);
        assert_eq!(report.evicted.len(), 8);
        assert_eq!(rig.physics.total_fixtures(), 8);
        assert_eq!(rig.graphics.mesh_count(), 8);
    }

    #[test]
    fn negative_positions_stream_correctly() {
        let mut rig = Rig::new(config(256, 0.1, 8));
        rig.load(-1.0);
        assert_eq!(rig.ring.resident_indices(), (-5..3).collect::<Vec<_>>());
        assert!(rig.ring.get(-1).is_some());
        assert!(rig.ring.get(3).is_none());
    }

    #[test]
    fn scrolling_keeps_window_invariant() {
        let mut rig = Rig::new(config(4, 0.5, 6));
        let mut x = -40.0_f32;
        while x < 40.0 {
            let report = rig.load(x);
            let expected: Vec<i32> = report.window.indices().collect();
            assert_eq!(rig.ring.resident_indices(), expected);
            assert!(report.rebuilds() <= 1 || report.built.len() == 6);
            assert_eq!(rig.physics.total_fixtures(), 6);
            x += 0.7;
        }
    }

    #[test]
    fn failed_build_propagates() {
        let mut rig = Rig::new(config(4, 0.5, 4));
        rig.graphics = RecordingBackend::new().with_mesh_capacity(2);

        let window = StreamWindow::for_position(0.0, &rig.config);
        let source = ChunkSource {
            body: rig.body,
            config: &rig.config,
            field: &rig.field,
        };
        let err = rig
            .ring
            .load(window, source, &mut rig.physics, &mut rig.graphics)
            .unwrap_err();
        assert!(matches!(err, TerrainError::Render(_)));
        assert_eq!(rig.ring.len(), 2);
        assert!(!rig.ring.is_fully_populated());
    }

    #[test]
    fn window_of_wrong_length_is_rejected() {
        let mut rig = Rig::new(config(4, 0.5, 4));
        let window = StreamWindow::for_position(0.0, &config(4, 0.5, 6));
        let source = ChunkSource {
            body: rig.body,
            config: &rig.config,
            field: &rig.field,
        };
        let err = rig
            .ring
            .load(window, source, &mut rig.physics, &mut rig.graphics)
            .unwrap_err();
        assert!(matches!(
            err,
            TerrainError::WindowMismatch {
                window: 6,
                capacity: 4
            }
        ));
        assert!(rig.ring.is_empty());
        assert_eq!(rig.graphics.meshes_created(), 0);
    }

    #[test]
    fn take_all_empties_the_ring() {
        let mut rig = Rig::new(config(4, 0.5, 4));
        rig.load(0.0);
        let chunks = rig.ring.take_all();
        assert_eq!(chunks.len(), 4);
        assert!(rig.ring.is_empty());
        for chunk in chunks {
            chunk.destroy(&mut rig.physics, &mut rig.graphics).unwrap();
        }
        assert_eq!(rig.physics.total_fixtures(), 0);
    }

    #[test]
    fn stats_accumulate() {
        let mut rig = Rig::new(config(4, 0.5, 4));
        let mut stats = StreamStats::default();
        stats.record(&rig.load(0.0));
        stats.record(&rig.load(2.0));
        stats.record(&rig.load(2.5));
        assert_eq!(stats.loads, 3);
        assert_eq!(stats.chunks_built, 5);
        assert_eq!(stats.chunks_evicted, 1);
        assert_eq!(stats.last_center, Some(1));
    }
}
