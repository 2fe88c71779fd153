//! Node identity and attribute data.
//!
//! Nodes are the vertices in the graph. Each node has:
//! - A stable string identifier, caller-supplied or engine-assigned
//! - An attribute map with the optional fields the layout reads
//!   (`mass`, `insulator`, `x`, `y`) plus arbitrary extra attributes

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier, unique within one [`Graph`](crate::graph::Graph).
///
/// Ids are strings so that callers can supply their own names and so that
/// undirected edge ids can be normalized by lexicographic endpoint order.
/// Engine-assigned ids are stringified monotonic counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new NodeId from any string-like value.
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Node attributes.
///
/// The layout reads the optional fields; everything else a caller attaches
/// rides along in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeData {
    /// Display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Point mass. Defaults to 1.0 when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f32>,
    /// Blocks excitement propagation through this node (but not from it
    /// when it is the selected origin).
    pub insulator: bool,
    /// Initial X position. Random placement when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Initial Y position. Random placement when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Arbitrary caller attributes, carried opaquely.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeData {
    /// Data with only a label set.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// A graph node: identity plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the owning graph.
    pub id: NodeId,
    /// Attribute map.
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Create a node from an id and attributes.
    pub fn new(id: impl Into<NodeId>, data: NodeData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}
