//! The graph store.
//!
//! `Graph` owns the authoritative node and edge sets. Topology lives in a
//! petgraph `StableGraph` with id↔index maps on both sides; the petgraph
//! adjacency lists double as the multi-edge index, and each edge carries a
//! monotonic insertion sequence so parallel edges come back in insertion
//! order.
//!
//! Structural mutations notify registered listeners synchronously, in
//! registration order. Lookups with unknown ids are tolerant no-ops: the
//! layout queries ids opportunistically while external code mutates the
//! graph between ticks. The only hard error is naming a missing node while
//! constructing an edge.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use thiserror::Error;

use super::edge::{Edge, EdgeData, EdgeId};
use super::node::{Node, NodeData, NodeId};

/// Errors from graph construction.
///
/// Everything else in the graph degrades gracefully (no-op, empty result);
/// only edge construction against a missing endpoint is fatal to the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge named a node id that is not in the graph.
    #[error("edge references unknown node id `{0}`")]
    InvalidReference(NodeId),
    /// A bundle edge referenced a node index outside the bundle's node list.
    #[error("edge references node index {index} outside the bundle ({len} nodes)")]
    InvalidIndex {
        /// The out-of-range index.
        index: usize,
        /// Length of the bundle's node list.
        len: usize,
    },
}

/// Observer notified after every structural mutation.
///
/// Notification is synchronous and ordered by registration; the callback
/// takes no arguments and its return value is ignored. Blanket-implemented
/// for closures, so `graph.add_graph_listener(Rc::new(|| ...))` works.
pub trait GraphListener {
    /// Called after a node or edge was added or removed.
    fn graph_changed(&self);
}

impl<F: Fn()> GraphListener for F {
    fn graph_changed(&self) {
        self()
    }
}

/// A mutable directed graph with parallel-edge support and change
/// notification.
pub struct Graph {
    /// Topology. Node weights are stable node ids, edge weights stable
    /// edge ids.
    topology: StableGraph<NodeId, EdgeId, Directed>,
    /// Map from stable node id to petgraph index.
    node_indices: HashMap<NodeId, NodeIndex>,
    /// Map from stable edge id to petgraph index.
    edge_indices: HashMap<EdgeId, EdgeIndex>,
    /// Identity map of nodes.
    nodes: HashMap<NodeId, Node>,
    /// Identity map of edges.
    edges: HashMap<EdgeId, Edge>,
    /// Node ids in insertion order, no duplicates.
    node_order: Vec<NodeId>,
    /// Edge ids in insertion order, no duplicates.
    edge_order: Vec<EdgeId>,
    /// Counter for engine-assigned node ids.
    next_node_id: u64,
    /// Counter for engine-assigned edge ids.
    next_edge_id: u64,
    /// Monotonic insertion sequence handed to edges.
    next_seq: u64,
    /// Registered change listeners, in registration order.
    listeners: Vec<Rc<dyn GraphListener>>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            topology: StableGraph::new(),
            node_indices: HashMap::new(),
            edge_indices: HashMap::new(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            node_order: Vec::new(),
            edge_order: Vec::new(),
            next_node_id: 0,
            next_edge_id: 0,
            next_seq: 0,
            listeners: Vec::new(),
        }
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            topology: StableGraph::with_capacity(node_capacity, edge_capacity),
            node_indices: HashMap::with_capacity(node_capacity),
            edge_indices: HashMap::with_capacity(edge_capacity),
            nodes: HashMap::with_capacity(node_capacity),
            edges: HashMap::with_capacity(edge_capacity),
            node_order: Vec::with_capacity(node_capacity),
            edge_order: Vec::with_capacity(edge_capacity),
            next_node_id: 0,
            next_edge_id: 0,
            next_seq: 0,
            listeners: Vec::new(),
        }
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Insert a node, idempotent by id.
    ///
    /// First insertion appends to the node order; re-adding an existing id
    /// replaces its data without duplicating it in the order. Listeners are
    /// notified either way. Returns the stored node's id.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        if let Some(existing) = self.nodes.get_mut(&id) {
            existing.data = node.data;
        } else {
            let index = self.topology.add_node(id.clone());
            self.node_indices.insert(id.clone(), index);
            self.node_order.push(id.clone());
            self.nodes.insert(id.clone(), node);
            debug!("added node {id}");
        }
        self.notify();
        id
    }

    /// Insert a node with an engine-assigned id.
    pub fn new_node(&mut self, data: NodeData) -> NodeId {
        let id = self.assign_node_id();
        self.add_node(Node { id, data })
    }

    /// Bulk-insert nodes by id, using the id as the label.
    pub fn add_nodes<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        for id in ids {
            let id = id.into();
            let data = NodeData::labeled(id.as_str());
            self.add_node(Node { id, data });
        }
    }

    /// Remove a node and every edge incident to it.
    ///
    /// Unknown ids are a no-op. Listeners are notified once per removed
    /// edge and once for the node itself.
    pub fn remove_node(&mut self, id: &NodeId) {
        if !self.nodes.contains_key(id) {
            return;
        }
        self.detach_node(id);
        if let Some(index) = self.node_indices.remove(id) {
            self.topology.remove_node(index);
        }
        self.nodes.remove(id);
        self.node_order.retain(|n| n != id);
        debug!("removed node {id}");
        self.notify();
    }

    /// Remove every edge where `id` is source or target, keeping the node.
    ///
    /// Edges are removed in insertion order, one notification each.
    pub fn detach_node(&mut self, id: &NodeId) {
        let Some(&index) = self.node_indices.get(id) else {
            return;
        };
        let mut incident: Vec<EdgeId> = self
            .topology
            .edges_directed(index, Direction::Outgoing)
            .chain(self.topology.edges_directed(index, Direction::Incoming))
            .map(|e| e.weight().clone())
            .collect();
        incident.sort_by_key(|eid| self.edges.get(eid).map_or(u64::MAX, |e| e.seq));
        // Self-loops show up in both directions
        incident.dedup();
        for eid in incident {
            self.remove_edge(&eid);
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Remove all nodes for which the predicate returns false.
    ///
    /// Operates over a snapshot of the node order, so the cascade removal of
    /// incident edges cannot skip or duplicate entries.
    pub fn filter_nodes(&mut self, predicate: impl Fn(&Node) -> bool) {
        let snapshot = self.node_order.clone();
        for id in snapshot {
            if let Some(node) = self.nodes.get(&id) {
                if !predicate(node) {
                    self.remove_node(&id);
                }
            }
        }
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Insert an edge, idempotent by id.
    ///
    /// Both endpoints must already exist; a missing endpoint is
    /// [`GraphError::InvalidReference`]. Re-adding an existing id replaces
    /// its data but keeps the original endpoints (the id is the identity).
    /// Returns the stored edge's id.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = edge.id.clone();
        if let Some(existing) = self.edges.get_mut(&id) {
            existing.data = edge.data;
            self.notify();
            return Ok(id);
        }
        let source = *self
            .node_indices
            .get(&edge.source)
            .ok_or_else(|| GraphError::InvalidReference(edge.source.clone()))?;
        let target = *self
            .node_indices
            .get(&edge.target)
            .ok_or_else(|| GraphError::InvalidReference(edge.target.clone()))?;

        let mut edge = edge;
        edge.seq = self.next_seq;
        self.next_seq += 1;

        let index = self.topology.add_edge(source, target, id.clone());
        self.edge_indices.insert(id.clone(), index);
        self.edge_order.push(id.clone());
        debug!("added edge {id} ({} -> {})", edge.source, edge.target);
        self.edges.insert(id.clone(), edge);
        self.notify();
        Ok(id)
    }

    /// Insert an edge with an engine-assigned id.
    pub fn new_edge(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        data: EdgeData,
    ) -> Result<EdgeId, GraphError> {
        let id = self.assign_edge_id();
        self.add_edge(Edge {
            id,
            source: source.into(),
            target: target.into(),
            data,
            seq: 0,
        })
    }

    /// Bulk-insert edges from (source, target) id pairs.
    ///
    /// Fails with [`GraphError::InvalidReference`] on the first pair naming
    /// an unknown node id; pairs before it are already inserted.
    pub fn add_edges<I, S, T>(&mut self, pairs: I) -> Result<Vec<EdgeId>, GraphError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<NodeId>,
        T: Into<NodeId>,
    {
        let mut ids = Vec::new();
        for (source, target) in pairs {
            ids.push(self.new_edge(source, target, EdgeData::default())?);
        }
        Ok(ids)
    }

    /// Remove an edge by id. Unknown ids are a no-op.
    pub fn remove_edge(&mut self, id: &EdgeId) {
        let Some(index) = self.edge_indices.remove(id) else {
            return;
        };
        self.edges.remove(id);
        self.edge_order.retain(|e| e != id);
        self.topology.remove_edge(index);
        debug!("removed edge {id}");
        self.notify();
    }

    /// Look up an edge by id.
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The edges from `source` to `target`, in insertion order.
    ///
    /// Unknown ids yield an empty sequence, never an error.
    pub fn get_edges(&self, source: &NodeId, target: &NodeId) -> Vec<&Edge> {
        let (Some(&s), Some(&t)) = (self.node_indices.get(source), self.node_indices.get(target))
        else {
            return Vec::new();
        };
        let mut found: Vec<&Edge> = self
            .topology
            .edges_connecting(s, t)
            .filter_map(|e| self.edges.get(e.weight()))
            .collect();
        found.sort_by_key(|e| e.seq);
        found
    }

    /// Remove all edges for which the predicate returns false.
    ///
    /// Operates over a snapshot of the edge order.
    pub fn filter_edges(&mut self, predicate: impl Fn(&Edge) -> bool) {
        let snapshot = self.edge_order.clone();
        for id in snapshot {
            if let Some(edge) = self.edges.get(&id) {
                if !predicate(edge) {
                    self.remove_edge(&id);
                }
            }
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a change listener.
    pub fn add_graph_listener(&mut self, listener: Rc<dyn GraphListener>) {
        self.listeners.push(listener);
    }

    /// Notify all listeners, in registration order.
    fn notify(&self) {
        for listener in &self.listeners {
            listener.graph_changed();
        }
    }

    // =========================================================================
    // Id assignment
    // =========================================================================

    fn assign_node_id(&mut self) -> NodeId {
        loop {
            let candidate = NodeId::new(self.next_node_id.to_string());
            self.next_node_id += 1;
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn assign_edge_id(&mut self) -> EdgeId {
        loop {
            let candidate = EdgeId::new(self.next_edge_id.to_string());
            self.next_edge_id += 1;
            if !self.edges.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Internal consistency check between the identity maps, the ordered
    /// sequences, and the topology. Exposed for tests.
    #[doc(hidden)]
    pub fn check_consistency(&self) -> bool {
        if self.node_order.len() != self.nodes.len()
            || self.edge_order.len() != self.edges.len()
            || self.topology.node_count() != self.nodes.len()
            || self.topology.edge_count() != self.edges.len()
        {
            return false;
        }
        self.edges.values().all(|e| {
            self.nodes.contains_key(&e.source)
                && self.nodes.contains_key(&e.target)
                && self
                    .get_edges(&e.source, &e.target)
                    .iter()
                    .any(|found| found.id == e.id)
        })
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
