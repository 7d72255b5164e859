//! Read-only query engine over a merged graph
//!
//! The engine owns the graph and never mutates it, so a single instance can
//! be shared behind an `Arc` and queried concurrently without locking. Every
//! operation is O(nodes + edges) or better.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::Serialize;

use crate::aggregation::{collapsed_view, ViewGraph};
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::model::{GraphNode, NodeId, NodeKind};

/// Result of an impact query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Impact {
    pub target: NodeId,
    /// Workflows with an edge straight to the target.
    pub direct_workflows: BTreeSet<NodeId>,
    /// Every workflow that depends on the target, direct ones included.
    pub workflows: BTreeSet<NodeId>,
    /// Functions crossed on the way to those workflows.
    pub via_functions: BTreeSet<NodeId>,
}

impl Impact {
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// In-memory index over an immutable [`Graph`].
#[derive(Debug, Clone)]
pub struct QueryEngine {
    graph: Graph,
    /// Lowercased display names in insertion order.
    folded_names: Vec<String>,
}

impl QueryEngine {
    pub fn new(graph: Graph) -> Self {
        let folded_names = graph.all_nodes().map(|n| n.name.to_lowercase()).collect();
        QueryEngine {
            graph,
            folded_names,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn node(&self, id: &NodeId) -> Result<&GraphNode> {
        self.graph
            .node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// Look a node up by id, then display name, then qualified name.
    pub fn find(&self, needle: &str) -> Option<&GraphNode> {
        self.graph
            .node(&NodeId::from(needle))
            .or_else(|| self.graph.find_node_by_name(needle))
            .or_else(|| self.graph.find_node_by_qualified(needle))
    }

    /// Nodes adjacent through outgoing or incoming edges, deduplicated and
    /// in insertion order.
    pub fn neighbors(&self, id: &NodeId) -> Result<Vec<&GraphNode>> {
        self.node(id)?;

        let mut seen = HashSet::new();
        let mut out: Vec<&GraphNode> = self
            .graph
            .edges_from(id)
            .chain(self.graph.edges_to(id))
            .map(|(_, node)| node)
            .filter(|&node| seen.insert(&node.id))
            .collect();
        out.sort_by_key(|n| self.graph.position(&n.id));
        Ok(out)
    }

    /// Partition every node by kind. All kinds are present, possibly empty,
    /// so category toggles stay stable across datasets.
    pub fn group_by_kind(&self) -> BTreeMap<NodeKind, Vec<&GraphNode>> {
        let mut groups: BTreeMap<NodeKind, Vec<&GraphNode>> =
            NodeKind::ALL.into_iter().map(|k| (k, Vec::new())).collect();
        for node in self.graph.all_nodes() {
            groups.entry(node.kind()).or_default().push(node);
        }
        groups
    }

    /// Case-insensitive substring match on display names. An empty or
    /// whitespace-only query matches everything.
    pub fn filter_by_text(&self, query: &str) -> Vec<&GraphNode> {
        let needle = query.trim().to_lowercase();
        self.graph
            .all_nodes()
            .zip(&self.folded_names)
            .filter(|(_, folded)| needle.is_empty() || folded.contains(&needle))
            .map(|(node, _)| node)
            .collect()
    }

    /// Every workflow that transitively depends on `id`.
    pub fn impact_of(&self, id: &NodeId) -> Result<BTreeSet<NodeId>> {
        Ok(self.impact(id)?.workflows)
    }

    /// Reverse reachability from `id` along `WorkflowUses` and
    /// `FunctionReads` edges.
    ///
    /// A visited set keyed by node id makes every node count once, so the
    /// walk terminates even if the data ever contains a cycle. The start node
    /// is never part of its own impact.
    pub fn impact(&self, id: &NodeId) -> Result<Impact> {
        let start = self.node(id)?;

        let mut impact = Impact {
            target: start.id.clone(),
            direct_workflows: BTreeSet::new(),
            workflows: BTreeSet::new(),
            via_functions: BTreeSet::new(),
        };
        let mut visited: HashSet<&NodeId> = HashSet::from([&start.id]);
        let mut queue: VecDeque<(&GraphNode, usize)> = VecDeque::from([(start, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            // Both edge kinds point from dependent to dependency.
            for (_, dependent) in self.graph.edges_to(&current.id) {
                if !visited.insert(&dependent.id) {
                    tracing::trace!("impact walk revisited {}", dependent.id);
                    continue;
                }
                match dependent.kind() {
                    NodeKind::Workflow => {
                        if depth == 0 {
                            impact.direct_workflows.insert(dependent.id.clone());
                        }
                        impact.workflows.insert(dependent.id.clone());
                    }
                    NodeKind::Function => {
                        impact.via_functions.insert(dependent.id.clone());
                    }
                    _ => {}
                }
                queue.push_back((dependent, depth + 1));
            }
        }

        Ok(impact)
    }

    /// Graph as displayed with the given categories folded into group nodes.
    pub fn collapsed_view(&self, collapsed: &BTreeSet<NodeKind>) -> ViewGraph {
        collapsed_view(&self.graph, collapsed)
    }
}
