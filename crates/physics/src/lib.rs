//! Physics world capability consumed by the terrain streamer.
//!
//! # Invariants
//! - A fixture belongs to exactly one body and is destroyed through that body.
//! - A body cannot be destroyed while fixtures are still attached to it.
//!
//! # Workaround
//! Ships an in-memory [`ChainWorld`] that stores bodies and chain fixtures and
//! answers ground queries, in place of a full rigid-body engine. Consumers only
//! see the [`PhysicsWorld`] trait, so a real engine can be swapped in.

mod shape;
mod world;

pub use shape::{BodyDef, BodyType, ChainShape, FixtureDef};
pub use world::{
    BodyHandle, ChainWorld, Fixture, FixtureHandle, PhysicsError, PhysicsEvent, PhysicsWorld,
};

pub fn crate_info() -> &'static str {
    "groundwork-physics v0.1.0"
}
