//! Excitement propagation: a bounded flood fill over the spring set.
//!
//! Excitement is a transient presentation flag seeded at the selected point
//! and spread along springs until a fixed point is reached. It never feeds
//! back into the physics. Insulator points block propagation *through*
//! themselves but not *from* themselves when they are the selected origin.

use std::collections::HashMap;

use crate::graph::{EdgeId, NodeId};

use super::point::{Point, Spring};

/// How excitement spreads from the selected point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExciteMethod {
    /// Only the selected point is marked.
    #[default]
    None,
    /// Spread along springs from source to target.
    Downstream,
    /// Spread along springs from target to source.
    Upstream,
    /// Spread in both directions, ignoring insulators.
    Connected,
}

/// Recompute the `excited` flag on every point.
///
/// Clears all flags, marks the selected point if any, then repeatedly scans
/// all springs applying the method's rule until a full scan marks nothing
/// new. Each scan either marks a previously-unmarked point or the loop
/// exits, so this terminates in at most V scans (worst case O(E·V)).
pub(crate) fn propagate(
    springs: &HashMap<EdgeId, Spring>,
    points: &mut HashMap<NodeId, Point>,
    selected: Option<&NodeId>,
    method: ExciteMethod,
) {
    for point in points.values_mut() {
        point.excited = false;
    }

    let Some(origin) = selected else {
        return;
    };
    if let Some(point) = points.get_mut(origin) {
        point.excited = true;
    }
    if method == ExciteMethod::None {
        return;
    }

    loop {
        let mut changed = false;
        for spring in springs.values() {
            let (Some(source), Some(target)) =
                (points.get(&spring.source), points.get(&spring.target))
            else {
                continue;
            };

            // Selection always propagates outward once, overriding its own
            // insulator flag.
            let source_conducts = !source.insulator || spring.source == *origin;
            let target_conducts = !target.insulator || spring.target == *origin;

            let (forward, backward) = match method {
                ExciteMethod::None => (false, false),
                ExciteMethod::Downstream => {
                    (source.excited && !target.excited && source_conducts, false)
                }
                ExciteMethod::Upstream => {
                    (false, target.excited && !source.excited && target_conducts)
                }
                ExciteMethod::Connected => (
                    source.excited && !target.excited,
                    target.excited && !source.excited,
                ),
            };

            if forward {
                if let Some(target) = points.get_mut(&spring.target) {
                    target.excited = true;
                    changed = true;
                }
            }
            if backward {
                if let Some(source) = points.get_mut(&spring.source) {
                    source.excited = true;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}
