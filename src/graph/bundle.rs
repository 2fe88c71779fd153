//! Plain graph descriptions for bulk import.
//!
//! A [`GraphBundle`] is the serde-friendly "nodes plus edges" shape used to
//! populate a graph in one call. It is a convenience loader, not a durable
//! format. Edge endpoints reference nodes by *index into the bundle's node
//! list*, which keeps descriptions compact and independent of id schemes.
//!
//! Non-directed edges get a normalized id with the lexicographically smaller
//! endpoint first, so merging the same logical undirected edge twice — in
//! either endpoint order — produces exactly one edge.

use log::debug;
use serde::{Deserialize, Serialize};

use super::edge::{Edge, EdgeData};
use super::node::{Node, NodeData, NodeId};
use super::store::{Graph, GraphError};

/// Fallback edge category when a bundle edge carries no `type`.
const DEFAULT_EDGE_KIND: &str = "edge";

/// A node entry in a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleNode {
    /// Node id, unique within the target graph.
    pub id: NodeId,
    /// Node attributes.
    #[serde(default)]
    pub data: NodeData,
}

/// An edge entry in a bundle. Endpoints are indices into the bundle's
/// node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEdge {
    /// Index of the source node within the bundle.
    pub from: usize,
    /// Index of the target node within the bundle.
    pub to: usize,
    /// Whether the edge is directed. Non-directed edges get an id
    /// normalized by endpoint order.
    #[serde(default)]
    pub directed: bool,
    /// Edge category, folded into the generated edge id.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Edge attributes.
    #[serde(default)]
    pub data: EdgeData,
}

/// A plain nodes/edges description of a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphBundle {
    /// Nodes, in the order edge indices refer to them.
    #[serde(default)]
    pub nodes: Vec<BundleNode>,
    /// Edges referencing nodes by index.
    #[serde(default)]
    pub edges: Vec<BundleEdge>,
}

impl BundleEdge {
    /// The persisted edge id for this entry, given the resolved endpoints.
    ///
    /// Directed: `"{kind}-{from}-{to}"`. Non-directed: the lexicographically
    /// smaller endpoint id comes first, making the id independent of the
    /// description order.
    fn edge_id(&self, from: &NodeId, to: &NodeId) -> String {
        let kind = self.kind.as_deref().unwrap_or(DEFAULT_EDGE_KIND);
        if self.directed || from <= to {
            format!("{kind}-{from}-{to}")
        } else {
            format!("{kind}-{to}-{from}")
        }
    }
}

impl Graph {
    /// Bulk-import nodes then edges from a plain description.
    ///
    /// Node entries upsert by id like [`Graph::add_node`]. Edge entries
    /// resolve their endpoint indices against the bundle's node list; an
    /// out-of-range index fails the call with [`GraphError::InvalidIndex`]
    /// (entries already imported stay imported). Re-merging an identical
    /// bundle is idempotent: directed and non-directed edge ids are both
    /// deterministic functions of the endpoints.
    pub fn merge(&mut self, bundle: &GraphBundle) -> Result<(), GraphError> {
        let mut imported: Vec<NodeId> = Vec::with_capacity(bundle.nodes.len());
        for entry in &bundle.nodes {
            imported.push(self.add_node(Node {
                id: entry.id.clone(),
                data: entry.data.clone(),
            }));
        }

        let len = imported.len();
        for entry in &bundle.edges {
            let from = imported
                .get(entry.from)
                .ok_or(GraphError::InvalidIndex {
                    index: entry.from,
                    len,
                })?
                .clone();
            let to = imported
                .get(entry.to)
                .ok_or(GraphError::InvalidIndex {
                    index: entry.to,
                    len,
                })?
                .clone();

            let mut data = entry.data.clone();
            data.directional = entry.directed;
            if data.kind.is_none() {
                data.kind = entry.kind.clone();
            }
            self.add_edge(Edge::new(entry.edge_id(&from, &to), from, to, data))?;
        }

        debug!(
            "merged bundle: {} nodes, {} edges",
            bundle.nodes.len(),
            bundle.edges.len()
        );
        Ok(())
    }
}
