//! Test utilities for stackmap-core

use crate::graph::Graph;
use crate::model::*;

pub fn q(name: &str) -> QualifiedName {
    QualifiedName::new("public", name)
}

/// A small stack:
///
/// ```text
/// wf1 "Sync users"    -> users
/// wf2 "Daily stats"   -> get_user_stats -> users, transactions
/// wf3 "Notion digest" -> Notion db-123
/// purge_legacy (unused) -> legacy_data
/// ```
pub fn sample_graph() -> Graph {
    let mut graph = Graph::new();

    for node in [
        GraphNode::workflow("wf1", "Sync users", true),
        GraphNode::workflow("wf2", "Daily stats", false),
        GraphNode::workflow("wf3", "Notion digest", true),
        GraphNode::table(&q("users"), true),
        GraphNode::table(&q("transactions"), true),
        GraphNode::table(&q("legacy_data"), true),
        GraphNode::function(&q("get_user_stats"), true),
        GraphNode::function(&q("purge_legacy"), true),
        GraphNode::external(Provider::Notion, "db-123"),
    ] {
        graph.add_node(node).unwrap();
    }

    let users = NodeId::table(&q("users"));
    let transactions = NodeId::table(&q("transactions"));
    let legacy = NodeId::table(&q("legacy_data"));
    let stats = NodeId::function(&q("get_user_stats"));
    let purge = NodeId::function(&q("purge_legacy"));

    let edges = [
        (NodeId::workflow("wf1"), users.clone(), EdgeKind::WorkflowUses),
        (NodeId::workflow("wf2"), stats.clone(), EdgeKind::WorkflowUses),
        (stats.clone(), users, EdgeKind::FunctionReads),
        (stats, transactions, EdgeKind::FunctionReads),
        (purge, legacy, EdgeKind::FunctionReads),
        (
            NodeId::workflow("wf3"),
            NodeId::external(Provider::Notion, "db-123"),
            EdgeKind::WorkflowUses,
        ),
    ];
    for (source, target, kind) in edges {
        graph.add_edge(&source, &target, kind).unwrap();
    }

    graph
}
