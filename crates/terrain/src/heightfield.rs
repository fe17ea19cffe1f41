use crate::config::{TerrainConfig, Wave};

/// Terrain height as a pure function of the world column.
///
/// Sums a fixed set of sine waves, so any column can be recomputed on demand
/// and adjacent chunks agree on their shared edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    waves: Vec<Wave>,
}

impl Heightfield {
    pub fn new(waves: Vec<Wave>) -> Self {
        Self { waves }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.waves.clone())
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Height at world column `x`. Defined for every `x`, negative included.
    pub fn height(&self, x: i64) -> f32 {
        let x = x as f64;
        self.waves
            .iter()
            .map(|w| (x * w.frequency).sin() * w.amplitude)
            .sum::<f64>() as f32
    }

    /// `count` consecutive samples starting at column `start`.
    pub fn sample(&self, start: i64, count: usize) -> Vec<f32> {
        (0..count as i64).map(|i| self.height(start + i)).collect()
    }

    /// Surface height at world position `world_x`, linearly interpolated
    /// between the two surrounding columns.
    pub fn height_at(&self, world_x: f32, resolution: f32) -> f32 {
        let column = world_x as f64 / resolution as f64;
        let left = column.floor();
        let t = (column - left) as f32;
        let left = left as i64;
        let a = self.height(left);
        let b = self.height(left + 1);
        a + (b - a) * t
    }
}
