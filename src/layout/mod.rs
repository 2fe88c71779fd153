//! Force-directed layout: simulation state, the engine, and excitement
//! propagation.

mod excite;
mod force;
mod point;

pub use excite::ExciteMethod;
pub use force::{BoundingBox, ForceDirectedLayout, LayoutParams, Nearest, RunCallbacks};
pub use point::{Point, Spring};
