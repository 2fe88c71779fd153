//! Force-directed 2-D graph layout.
//!
//! `tension` keeps a mutable directed graph and animates node positions with
//! a spring/charge simulation:
//!
//! - [`graph`] — the node/edge store: id-keyed upsert semantics, cascade
//!   removal, adjacency queries in insertion order, change listeners, and
//!   bulk import from plain bundle descriptions.
//! - [`layout`] — the [`ForceDirectedLayout`] engine: per-node points and
//!   per-edge springs cached lazily, Coulomb repulsion, Hooke attraction, a
//!   centering pull, damped integration with a speed clamp, a cooperative
//!   tick/run loop that stops on convergence, selection with excitement
//!   propagation, and nearest-node / bounding-box queries for hit testing
//!   and viewport fitting.
//! - [`vector`] — the small 2-D vector algebra everything above is written
//!   in terms of.
//!
//! The graph is shared with the layout through `Rc<RefCell<Graph>>`, so UI
//! code can mutate the graph between ticks; the layout re-synchronizes its
//! caches at the start of every step.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use tension::{ForceDirectedLayout, Graph};
//!
//! let graph = Rc::new(RefCell::new(Graph::new()));
//! {
//!     let mut g = graph.borrow_mut();
//!     g.add_nodes(["a", "b", "c"]);
//!     g.add_edges([("a", "b"), ("b", "c")]).unwrap();
//! }
//!
//! let mut layout = ForceDirectedLayout::new(graph);
//! for _ in 0..100 {
//!     layout.step(0.03);
//! }
//! let fit = layout.bounding_box();
//! assert!(fit.top_right.x > fit.bottom_left.x);
//! ```

pub mod graph;
pub mod layout;
pub mod vector;

pub use graph::{
    BundleEdge, BundleNode, Edge, EdgeData, EdgeId, Graph, GraphBundle, GraphError, GraphListener,
    Node, NodeData, NodeId,
};
pub use layout::{
    BoundingBox, ExciteMethod, ForceDirectedLayout, LayoutParams, Nearest, Point, RunCallbacks,
    Spring,
};
pub use vector::Vector;
