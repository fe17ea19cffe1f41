use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::shape::{BodyDef, ChainShape, FixtureDef};

/// Handle to a body owned by a physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Handle to a fixture attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureHandle(pub u32);

/// Errors from physics world operations.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("chain shape needs at least 2 vertices, got {0}")]
    DegenerateChain(usize),
    #[error("body {0:?} not found")]
    BodyNotFound(BodyHandle),
    #[error("fixture {fixture:?} is not attached to body {body:?}")]
    FixtureNotFound {
        body: BodyHandle,
        fixture: FixtureHandle,
    },
    #[error("body {body:?} still has {fixtures} fixture(s) attached")]
    BodyInUse { body: BodyHandle, fixtures: usize },
    #[error("friction must be finite and non-negative, got {0}")]
    InvalidFriction(f32),
}

/// Physics world capability: static bodies plus chain fixtures.
pub trait PhysicsWorld {
    /// Create a body and return its handle.
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle;

    /// Destroy a body. Fails if fixtures are still attached.
    fn destroy_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError>;

    /// Attach a fixture to `body`.
    fn create_fixture(
        &mut self,
        body: BodyHandle,
        def: &FixtureDef,
    ) -> Result<FixtureHandle, PhysicsError>;

    /// Detach a fixture from `body`.
    fn destroy_fixture(
        &mut self,
        body: BodyHandle,
        fixture: FixtureHandle,
    ) -> Result<(), PhysicsError>;
}

/// A record of every mutation applied to a [`ChainWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicsEvent {
    BodyCreated { body: BodyHandle, def: BodyDef },
    BodyDestroyed { body: BodyHandle },
    FixtureCreated {
        body: BodyHandle,
        fixture: FixtureHandle,
        edges: usize,
    },
    FixtureDestroyed {
        body: BodyHandle,
        fixture: FixtureHandle,
    },
}

/// A fixture stored in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub body: BodyHandle,
    pub shape: ChainShape,
    pub friction: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Body {
    def: BodyDef,
    fixtures: BTreeSet<FixtureHandle>,
}

/// In-memory physics world holding static bodies and chain fixtures.
///
/// Uses BTreeMap so iteration (and therefore ground queries) is
/// deterministic. Every mutation is appended to an event log.
#[derive(Debug, Clone, Default)]
pub struct ChainWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    fixtures: BTreeMap<FixtureHandle, Fixture>,
    next_body: u32,
    next_fixture: u32,
    event_log: Vec<PhysicsEvent>,
}

impl ChainWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Total fixtures across all bodies.
    pub fn total_fixtures(&self) -> usize {
        self.fixtures.len()
    }

    /// Number of fixtures attached to `body`, or `None` if it does not exist.
    pub fn fixture_count(&self, body: BodyHandle) -> Option<usize> {
        self.bodies.get(&body).map(|b| b.fixtures.len())
    }

    pub fn body_def(&self, body: BodyHandle) -> Option<&BodyDef> {
        self.bodies.get(&body).map(|b| &b.def)
    }

    pub fn fixture(&self, fixture: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(&fixture)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[PhysicsEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Highest ground surface at world `x` across all fixtures, in world
    /// space. Fixture shapes are stored relative to their body position.
    pub fn ground_height(&self, x: f32) -> Option<f32> {
        self.fixtures
            .values()
            .filter_map(|f| {
                let origin = self.bodies.get(&f.body)?.def.position;
                f.shape.height_at(x - origin.x).map(|y| y + origin.y)
            })
            .reduce(f32::max)
    }
}

impl PhysicsWorld for ChainWorld {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let body = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            body,
            Body {
                def: *def,
                fixtures: BTreeSet::new(),
            },
        );
        tracing::trace!(?body, "body created");
        self.event_log
            .push(PhysicsEvent::BodyCreated { body, def: *def });
        body
    }

    fn destroy_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        let attached = self
            .bodies
            .get(&body)
            .ok_or(PhysicsError::BodyNotFound(body))?
            .fixtures
            .len();
        if attached > 0 {
            return Err(PhysicsError::BodyInUse {
                body,
                fixtures: attached,
            });
        }
        self.bodies.remove(&body);
        tracing::trace!(?body, "body destroyed");
        self.event_log.push(PhysicsEvent::BodyDestroyed { body });
        Ok(())
    }

    fn create_fixture(
        &mut self,
        body: BodyHandle,
        def: &FixtureDef,
    ) -> Result<FixtureHandle, PhysicsError> {
        if !def.friction.is_finite() || def.friction < 0.0 {
            return Err(PhysicsError::InvalidFriction(def.friction));
        }
        let entry = self
            .bodies
            .get_mut(&body)
            .ok_or(PhysicsError::BodyNotFound(body))?;

        let fixture = FixtureHandle(self.next_fixture);
        self.next_fixture += 1;
        entry.fixtures.insert(fixture);

        let edges = def.shape.edge_count();
        self.fixtures.insert(
            fixture,
            Fixture {
                body,
                shape: def.shape.clone(),
                friction: def.friction,
            },
        );
        self.event_log.push(PhysicsEvent::FixtureCreated {
            body,
            fixture,
            edges,
        });
        Ok(fixture)
    }

    fn destroy_fixture(
        &mut self,
        body: BodyHandle,
        fixture: FixtureHandle,
    ) -> Result<(), PhysicsError> {
        let entry = self
            .bodies
            .get_mut(&body)
            .ok_or(PhysicsError::BodyNotFound(body))?;
        if !entry.fixtures.remove(&fixture) {
            return Err(PhysicsError::FixtureNotFound { body, fixture });
        }
        self.fixtures.remove(&fixture);
        self.event_log
            .push(PhysicsEvent::FixtureDestroyed { body, fixture });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn flat(y: f32, x0: f32, x1: f32) -> FixtureDef {
        FixtureDef::chain(vec![Vec2::new(x0, y), Vec2::new(x1, y)], 0.5).unwrap()
    }

    #[test]
    fn world_starts_empty() {
        let w = ChainWorld::new();
        assert_eq!(w.body_count(), 0);
        assert_eq!(w.total_fixtures(), 0);
        assert!(w.events().is_empty());
    }

    #[test]
    fn create_and_destroy_fixture() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::default());
        let fixture = w.create_fixture(body, &flat(1.0, 0.0, 4.0)).unwrap();

        assert_eq!(w.fixture_count(body), Some(1));
        assert_eq!(w.fixture(fixture).unwrap().friction, 0.5);

        w.destroy_fixture(body, fixture).unwrap();
        assert_eq!(w.fixture_count(body), Some(0));
        assert!(w.fixture(fixture).is_none());
    }

    #[test]
    fn double_destroy_is_an_error() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::default());
        let fixture = w.create_fixture(body, &flat(1.0, 0.0, 4.0)).unwrap();
        w.destroy_fixture(body, fixture).unwrap();

        let err = w.destroy_fixture(body, fixture).unwrap_err();
        assert!(matches!(err, PhysicsError::FixtureNotFound { .. }));
    }

    #[test]
    fn fixture_must_belong_to_body() {
        let mut w = ChainWorld::new();
        let a = w.create_body(&BodyDef::default());
        let b = w.create_body(&BodyDef::default());
        let fixture = w.create_fixture(a, &flat(1.0, 0.0, 4.0)).unwrap();

        assert!(w.destroy_fixture(b, fixture).is_err());
        assert_eq!(w.fixture_count(a), Some(1));
    }

    #[test]
    fn body_with_fixtures_cannot_be_destroyed() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::default());
        let fixture = w.create_fixture(body, &flat(1.0, 0.0, 4.0)).unwrap();

        let err = w.destroy_body(body).unwrap_err();
        assert!(matches!(err, PhysicsError::BodyInUse { fixtures: 1, .. }));

        w.destroy_fixture(body, fixture).unwrap();
        w.destroy_body(body).unwrap();
        assert_eq!(w.body_count(), 0);
    }

    #[test]
    fn unknown_body_is_rejected() {
        let mut w = ChainWorld::new();
        let err = w
            .create_fixture(BodyHandle(7), &flat(0.0, 0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, PhysicsError::BodyNotFound(BodyHandle(7))));
    }

    #[test]
    fn negative_friction_is_rejected() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::default());
        let def = FixtureDef::chain(vec![Vec2::ZERO, Vec2::X], -1.0).unwrap();
        assert!(matches!(
            w.create_fixture(body, &def),
            Err(PhysicsError::InvalidFriction(_))
        ));
    }

    #[test]
    fn ground_height_takes_highest_surface() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::default());
        w.create_fixture(body, &flat(1.0, 0.0, 4.0)).unwrap();
        w.create_fixture(body, &flat(3.0, 2.0, 6.0)).unwrap();

        assert_eq!(w.ground_height(1.0), Some(1.0));
        assert_eq!(w.ground_height(3.0), Some(3.0));
        assert_eq!(w.ground_height(5.0), Some(3.0));
        assert_eq!(w.ground_height(10.0), None);
    }

    #[test]
    fn ground_height_respects_body_position() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::static_at(Vec2::new(10.0, 2.0)));
        w.create_fixture(body, &flat(1.0, 0.0, 4.0)).unwrap();

        assert_eq!(w.ground_height(12.0), Some(3.0));
        assert_eq!(w.ground_height(2.0), None);
    }

    #[test]
    fn events_are_recorded() {
        let mut w = ChainWorld::new();
        let body = w.create_body(&BodyDef::default());
        let fixture = w.create_fixture(body, &flat(0.0, 0.0, 1.0)).unwrap();
        w.destroy_fixture(body, fixture).unwrap();
        w.destroy_body(body).unwrap();

        let events = w.drain_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[1],
            PhysicsEvent::FixtureCreated { edges: 1, .. }
        ));
        assert!(w.events().is_empty());
    }
}
