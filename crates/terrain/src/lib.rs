//! Terrain: procedural heightfield, chunk builder and ring-buffer streaming.
//!
//! # Invariants
//! - Heights are a pure function of the world column; chunks built at any
//!   time agree on their shared edge sample.
//! - After a load, the ring holds exactly the chunks of the window around the
//!   viewer, each in slot `index mod window_length`.
//! - A chunk's fixture is detached exactly once, before its mesh is released.
//!
//! # Workaround
//! Chunks are generated synchronously on the calling thread. There is no
//! background loading or per-frame build budget; a large jump rebuilds the
//! whole window in one call.

mod actor;
mod chunk;
mod config;
mod error;
mod heightfield;
mod ring;

pub use actor::{GroundActor, MVP_UNIFORM};
pub use chunk::{ChunkGeometry, GroundChunk, VERTICES_PER_COLUMN};
pub use config::{ConfigError, MAX_CHUNK_SIZE, MAX_WINDOW_LENGTH, TerrainConfig, Wave, WaveProfile};
pub use error::TerrainError;
pub use heightfield::Heightfield;
pub use ring::{ChunkRing, ChunkSource, LoadReport, StreamStats, StreamWindow, slot_index};

pub fn crate_info() -> &'static str {
    "groundwork-terrain v0.1.0"
}
