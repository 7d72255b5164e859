//! Edge aggregation for collapsed categories

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::graph::Graph;
use crate::model::{AggregatedEdge, GraphNode, NodeId, NodeKind};

/// A node as displayed: either a real node or the group standing in for a
/// collapsed kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    /// Number of graph nodes represented (1 for expanded nodes).
    pub member_count: usize,
    pub collapsed: bool,
}

/// What the display layer draws for a given expand/collapse state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewGraph {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<AggregatedEdge>,
}

/// Fold every node of a collapsed kind into one group node and merge the
/// edges that now share endpoints. Group nodes take the position of their
/// first member.
pub fn collapsed_view(graph: &Graph, collapsed: &BTreeSet<NodeKind>) -> ViewGraph {
    let mut nodes: Vec<ViewNode> = Vec::new();
    let mut group_slots: HashMap<NodeKind, usize> = HashMap::new();

    for node in graph.all_nodes() {
        let kind = node.kind();
        if !collapsed.contains(&kind) {
            nodes.push(ViewNode {
                id: node.id.clone(),
                kind,
                name: node.name.clone(),
                member_count: 1,
                collapsed: false,
            });
            continue;
        }
        match group_slots.get(&kind) {
            Some(&slot) => nodes[slot].member_count += 1,
            None => {
                group_slots.insert(kind, nodes.len());
                nodes.push(ViewNode {
                    id: NodeId::group(kind),
                    kind,
                    name: kind.label().to_string(),
                    member_count: 1,
                    collapsed: true,
                });
            }
        }
    }

    ViewGraph {
        nodes,
        edges: aggregate_edges(graph, collapsed),
    }
}

/// Compute aggregated edges for the given collapsed kinds.
pub fn aggregate_edges(graph: &Graph, collapsed: &BTreeSet<NodeKind>) -> Vec<AggregatedEdge> {
    let mut agg_map: BTreeMap<(NodeId, NodeId), AggregatedEdge> = BTreeMap::new();

    for edge in graph.all_edges() {
        let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target))
        else {
            continue;
        };
        let visible_source = visible_id(source, collapsed);
        let visible_target = visible_id(target, collapsed);

        // Skip self-loops (both endpoints inside the same collapsed group)
        if visible_source == visible_target {
            continue;
        }

        let key = (visible_source.clone(), visible_target.clone());
        let agg = agg_map.entry(key).or_insert_with(|| AggregatedEdge {
            source: visible_source,
            target: visible_target,
            count: 0,
            kind_counts: BTreeMap::new(),
        });

        agg.count += 1;
        *agg.kind_counts.entry(edge.kind).or_insert(0) += 1;
    }

    agg_map.into_values().collect()
}

fn visible_id(node: &GraphNode, collapsed: &BTreeSet<NodeKind>) -> NodeId {
    let kind = node.kind();
    if collapsed.contains(&kind) {
        NodeId::group(kind)
    } else {
        node.id.clone()
    }
}
