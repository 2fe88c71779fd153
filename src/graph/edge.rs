//! Edge identity and attribute data.
//!
//! Edges are the directed connections between nodes. Each edge has:
//! - A stable string identifier, unique within its graph
//! - Source and target node ids (non-owning references; the nodes must
//!   exist in the same graph when the edge is inserted)
//! - An attribute map with the optional fields the layout reads
//!   (`length`, `weight`, `directional`, `label`)
//!
//! Multiple edges may share the same ordered (source, target) pair; such
//! parallel edges are retrievable together via
//! [`Graph::get_edges`](crate::graph::Graph::get_edges).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Stable edge identifier, unique within one [`Graph`](crate::graph::Graph).
///
/// Callers may supply a composite id (e.g. `"road-a-b"`) to normalize
/// undirected duplicates; [`Graph::merge`](crate::graph::Graph::merge) does
/// exactly that for non-directed bundle edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create a new EdgeId from any string-like value.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for EdgeId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Edge attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeData {
    /// Display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Spring rest length. Defaults to 1.0 when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    /// Presentation weight (stroke width etc.); not read by the physics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    /// Whether the edge is rendered with a direction arrow.
    pub directional: bool,
    /// Edge category, serialized as `"type"`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Arbitrary caller attributes, carried opaquely.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A graph edge: identity, endpoints, attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier within the owning graph.
    pub id: EdgeId,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Attribute map.
    #[serde(default)]
    pub data: EdgeData,
    /// Insertion sequence within the owning graph, used to keep parallel
    /// edges in insertion order. Assigned on insertion.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Edge {
    /// Create an edge between two node ids.
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        data: EdgeData,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data,
            seq: 0,
        }
    }
}
