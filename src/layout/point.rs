//! Physical state attached to nodes and edges by the layout.
//!
//! A `Point` is the particle simulated for one node; a `Spring` is the
//! Hooke's-law coupling simulated for one edge. Both are created lazily by
//! the layout and cached by node/edge id.

use crate::graph::NodeId;
use crate::vector::Vector;

/// Per-node physical state.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Current position in layout space.
    pub position: Vector,
    /// Mass. External code may raise this temporarily (pin weight) to make
    /// the point effectively immovable during a drag.
    pub mass: f32,
    /// Current velocity.
    pub velocity: Vector,
    /// Force accumulated this tick, already divided by mass. Reset to zero
    /// after the velocity update.
    pub acceleration: Vector,
    /// Blocks excitement propagation through this point, except when it is
    /// the propagation origin.
    pub insulator: bool,
    /// Transient highlight flag, recomputed by each propagation pass.
    pub excited: bool,
}

impl Point {
    /// Create a point at rest.
    pub fn new(position: Vector, mass: f32, insulator: bool) -> Self {
        Self {
            position,
            mass,
            velocity: Vector::ZERO,
            acceleration: Vector::ZERO,
            insulator,
            excited: false,
        }
    }

    /// Accumulate a force for this tick. Acceleration gains `force / mass`;
    /// zero mass contributes nothing rather than dividing by zero.
    #[inline]
    pub fn apply_force(&mut self, force: Vector) {
        self.acceleration += force / self.mass;
    }

    /// Kinetic energy, `0.5 * m * |v|^2`.
    #[inline]
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity.magnitude_squared()
    }
}

/// Per-edge spring state. Endpoints are referenced by node id into the
/// layout's point cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    /// Source endpoint (the edge's own source).
    pub source: NodeId,
    /// Target endpoint (the edge's own target).
    pub target: NodeId,
    /// Rest length.
    pub length: f32,
    /// Stiffness. Zero for alias springs.
    pub k: f32,
    /// True for the zero-stiffness stand-in cached for a parallel or
    /// anti-parallel edge whose node pair already has a force-bearing
    /// spring. Alias springs never receive stiffness updates.
    pub alias: bool,
}

impl Spring {
    /// A force-bearing spring.
    pub fn new(source: NodeId, target: NodeId, length: f32, k: f32) -> Self {
        Self {
            source,
            target,
            length,
            k,
            alias: false,
        }
    }

    /// A zero-length, zero-stiffness alias for an edge whose unordered node
    /// pair already carries a real spring. Oriented to the aliasing edge's
    /// own source/target so directional excitement propagation still works.
    pub fn alias(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            length: 0.0,
            k: 0.0,
            alias: true,
        }
    }
}
