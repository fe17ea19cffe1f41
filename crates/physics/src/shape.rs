use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::world::PhysicsError;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves; terrain lives on a static body.
    #[default]
    Static,
    Kinematic,
    Dynamic,
}

/// Parameters for creating a body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vec2,
}

impl BodyDef {
    /// A static body at the given position.
    pub fn static_at(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Static,
            position,
        }
    }
}

/// Open polyline collision shape.
///
/// Ghost vertices are the neighbours just outside either end of the chain.
/// They do not form edges of their own but let the contact solver treat the
/// first and last edges as if the surface continued, so adjacent chains do
/// not snag objects at their seams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainShape {
    vertices: Vec<Vec2>,
    prev_vertex: Option<Vec2>,
    next_vertex: Option<Vec2>,
}

impl ChainShape {
    /// Create an open chain through `vertices`. At least two are required.
    pub fn new(vertices: Vec<Vec2>) -> Result<Self, PhysicsError> {
        if vertices.len() < 2 {
            return Err(PhysicsError::DegenerateChain(vertices.len()));
        }
        Ok(Self {
            vertices,
            prev_vertex: None,
            next_vertex: None,
        })
    }

    pub fn with_prev_vertex(mut self, v: Vec2) -> Self {
        self.prev_vertex = Some(v);
        self
    }

    pub fn with_next_vertex(mut self, v: Vec2) -> Self {
        self.next_vertex = Some(v);
        self
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn prev_vertex(&self) -> Option<Vec2> {
        self.prev_vertex
    }

    pub fn next_vertex(&self) -> Option<Vec2> {
        self.next_vertex
    }

    /// Number of edges (vertex count minus one).
    pub fn edge_count(&self) -> usize {
        self.vertices.len() - 1
    }

    /// Iterate the chain's edges as `(start, end)` pairs. Ghost vertices are
    /// not part of any edge.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.vertices.windows(2).map(|w| (w[0], w[1]))
    }

    /// Highest point of the chain directly above or below `x`, if the chain
    /// spans `x`.
    pub fn height_at(&self, x: f32) -> Option<f32> {
        self.edges()
            .filter_map(|(a, b)| {
                let (lo, hi) = if a.x <= b.x { (a, b) } else { (b, a) };
                if x < lo.x || x > hi.x {
                    return None;
                }
                let span = hi.x - lo.x;
                if span <= f32::EPSILON {
                    return Some(lo.y.max(hi.y));
                }
                let t = (x - lo.x) / span;
                Some(lo.y + (hi.y - lo.y) * t)
            })
            .reduce(f32::max)
    }
}

/// Parameters for attaching a fixture to a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDef {
    pub shape: ChainShape,
    pub friction: f32,
}

impl FixtureDef {
    /// Chain fixture through raw points, without ghost vertices.
    pub fn chain(points: Vec<Vec2>, friction: f32) -> Result<Self, PhysicsError> {
        Ok(Self {
            shape: ChainShape::new(points)?,
            friction,
        })
    }
}
