//! Graph data structure: node/edge store, adjacency queries, bulk import,
//! and change notification.

mod bundle;
mod edge;
mod node;
mod store;

pub use bundle::{BundleEdge, BundleNode, GraphBundle};
pub use edge::{Edge, EdgeData, EdgeId};
pub use node::{Node, NodeData, NodeId};
pub use store::{Graph, GraphError, GraphListener};
