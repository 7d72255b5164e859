//! Arena graph keyed by stable `NodeId`, backed by `petgraph::DiGraph`

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{GraphError, Result};
use crate::model::*;

/// The stack graph. Nodes keep insertion order; edges are unique per
/// (source, target, kind).
#[derive(Clone)]
pub struct Graph {
    inner: DiGraph<GraphNode, EdgeKind>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Register a node. Returns `true` if it was new, `false` if an identical
    /// node was already present.
    pub fn add_node(&mut self, node: GraphNode) -> Result<bool> {
        if let Some(&idx) = self.index.get(&node.id) {
            let existing = &self.inner[idx];
            if *existing == node {
                return Ok(false);
            }
            return Err(GraphError::DuplicateIdentity {
                id: node.id.clone(),
                detail: format!(
                    "'{}' conflicts with already registered '{}'",
                    node.name, existing.name
                ),
            });
        }
        let id = node.id.clone();
        let idx = self.inner.add_node(node);
        self.index.insert(id, idx);
        Ok(true)
    }

    /// Add an edge between two registered nodes. Returns `false` for a
    /// duplicate (source, target, kind).
    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> Result<bool> {
        let unknown = |missing: &NodeId| GraphError::UnknownNode {
            source_id: source.clone(),
            target_id: target.clone(),
            missing: missing.clone(),
        };
        let s = *self.index.get(source).ok_or_else(|| unknown(source))?;
        let t = *self.index.get(target).ok_or_else(|| unknown(target))?;

        if self.has_edge_indices(s, t, kind) {
            return Ok(false);
        }
        self.inner.add_edge(s, t, kind);
        Ok(true)
    }

    /// Get a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.inner[idx])
    }

    /// Get a mutable node by ID. Only metadata may change; the id is fixed.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
        let idx = *self.index.get(id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes in insertion order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner.node_indices().map(move |idx| &self.inner[idx])
    }

    /// Iterate over all edges in insertion order.
    pub fn all_edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.inner.edge_references().map(move |e| GraphEdge {
            source: self.inner[e.source()].id.clone(),
            target: self.inner[e.target()].id.clone(),
            kind: *e.weight(),
        })
    }

    /// Outgoing edges of a node as (kind, target) pairs.
    pub fn edges_from<'a>(
        &'a self,
        source: &NodeId,
    ) -> impl Iterator<Item = (EdgeKind, &'a GraphNode)> + use<'a> {
        self.directed(source, Direction::Outgoing)
    }

    /// Incoming edges of a node as (kind, source) pairs.
    pub fn edges_to<'a>(
        &'a self,
        target: &NodeId,
    ) -> impl Iterator<Item = (EdgeKind, &'a GraphNode)> + use<'a> {
        self.directed(target, Direction::Incoming)
    }

    fn directed<'a>(
        &'a self,
        id: &NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = (EdgeKind, &'a GraphNode)> + use<'a> {
        let idx = self.index.get(id).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner.edges_directed(idx, direction).map(move |e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (*e.weight(), &self.inner[other])
            })
        })
    }

    /// Check if an edge of a specific kind exists between two nodes.
    pub fn has_edge_between(&self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => self.has_edge_indices(s, t, kind),
            _ => false,
        }
    }

    fn has_edge_indices(&self, s: NodeIndex, t: NodeIndex, kind: EdgeKind) -> bool {
        self.inner
            .edges(s)
            .any(|e| e.target() == t && *e.weight() == kind)
    }

    /// Find a node by display name (first match in insertion order).
    pub fn find_node_by_name(&self, name: &str) -> Option<&GraphNode> {
        self.all_nodes().find(|n| n.name == name)
    }

    /// Find a node by fully qualified name.
    pub fn find_node_by_qualified(&self, qualified_name: &str) -> Option<&GraphNode> {
        self.all_nodes().find(|n| n.qualified_name == qualified_name)
    }

    /// Get all nodes of a specific kind, in insertion order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.all_nodes().filter(move |n| n.kind() == kind)
    }

    /// Insertion position of a node, used to keep derived listings stable.
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).map(|idx| idx.index())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
