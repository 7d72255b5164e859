//! Unit tests for stackmap-core

use std::collections::BTreeSet;

use crate::test_utils::{q, sample_graph};
use crate::*;

fn names<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Vec<&'a str> {
    nodes.into_iter().map(|n| n.name.as_str()).collect()
}

fn wf(id: &str) -> NodeId {
    NodeId::workflow(id)
}

#[test]
fn test_node_id_is_derived_from_kind_and_name() {
    let users = QualifiedName::new("public", "users");
    assert_eq!(NodeId::table(&users), NodeId::table(&users.clone()));
    assert_eq!(NodeId::table(&users).as_str(), "table:public.users");

    // A table and a function may share a bare name but never an id
    assert_ne!(NodeId::table(&users), NodeId::function(&users));
    assert_eq!(NodeId::function(&users).as_str(), "function:public.users");
    assert_eq!(
        NodeId::external(Provider::Notion, "abc").as_str(),
        "external:notion:abc"
    );
    assert_eq!(NodeId::group(NodeKind::Table).as_str(), "group:table");
}

#[test]
fn test_node_kind_parsing() {
    assert_eq!("Tables".parse::<NodeKind>(), Ok(NodeKind::Table));
    assert_eq!("external".parse::<NodeKind>(), Ok(NodeKind::ExternalResource));
    assert!("column".parse::<NodeKind>().is_err());
}

#[test]
fn test_identical_registration_is_a_noop() {
    let mut graph = Graph::new();
    assert_eq!(graph.add_node(GraphNode::table(&q("users"), true)), Ok(true));
    assert_eq!(graph.add_node(GraphNode::table(&q("users"), true)), Ok(false));
    assert_eq!(graph.node_count(), 1);
}

#[test]
fn test_conflicting_registration_is_duplicate_identity() {
    let mut graph = Graph::new();
    graph
        .add_node(GraphNode::workflow("wf1", "Sync users", true))
        .unwrap();

    let err = graph
        .add_node(GraphNode::workflow("wf1", "Something else", true))
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateIdentity { ref id, .. } if *id == wf("wf1")));
}

#[test]
fn test_edge_to_unknown_node_is_rejected() {
    let mut graph = Graph::new();
    graph
        .add_node(GraphNode::workflow("wf1", "Sync users", true))
        .unwrap();

    let missing = NodeId::table(&q("ghost"));
    let err = graph
        .add_edge(&wf("wf1"), &missing, EdgeKind::WorkflowUses)
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownNode {
            source_id: wf("wf1"),
            target_id: missing.clone(),
            missing,
        }
    );
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_edges_deduplicate_by_triple() {
    let mut graph = sample_graph();
    let before = graph.edge_count();
    let users = NodeId::table(&q("users"));

    assert_eq!(
        graph.add_edge(&wf("wf1"), &users, EdgeKind::WorkflowUses),
        Ok(false)
    );
    assert_eq!(graph.edge_count(), before);

    // Same endpoints, different kind: a distinct edge
    assert_eq!(
        graph.add_edge(&wf("wf1"), &users, EdgeKind::FunctionReads),
        Ok(true)
    );
    assert!(graph.has_edge_between(&wf("wf1"), &users, EdgeKind::FunctionReads));
}

#[test]
fn test_every_edge_endpoint_exists() {
    let graph = sample_graph();
    for edge in graph.all_edges() {
        assert!(graph.contains(&edge.source), "missing {}", edge.source);
        assert!(graph.contains(&edge.target), "missing {}", edge.target);
    }
}

#[test]
fn test_nodes_keep_insertion_order() {
    let graph = sample_graph();
    let order = names(graph.all_nodes());
    assert_eq!(order[0], "Sync users");
    assert_eq!(order[3], "users");
    assert_eq!(order[8], "Notion: db-123");
}

#[test]
fn test_neighbors_cover_both_directions() {
    let engine = QueryEngine::new(sample_graph());
    let stats = NodeId::function(&q("get_user_stats"));

    let neighbors = engine.neighbors(&stats).unwrap();
    assert_eq!(names(neighbors), vec!["Daily stats", "users", "transactions"]);

    let users = NodeId::table(&q("users"));
    let neighbors = engine.neighbors(&users).unwrap();
    assert_eq!(names(neighbors), vec!["Sync users", "get_user_stats"]);
}

#[test]
fn test_neighbors_of_unknown_node() {
    let engine = QueryEngine::new(sample_graph());
    let err = engine.neighbors(&NodeId::from("table:public.nope")).unwrap_err();
    assert_eq!(err, GraphError::NodeNotFound("table:public.nope".to_string()));
}

#[test]
fn test_group_by_kind_partitions_all_nodes() {
    let engine = QueryEngine::new(sample_graph());
    let groups = engine.group_by_kind();

    assert_eq!(groups.len(), 4);
    assert_eq!(groups[&NodeKind::Workflow].len(), 3);
    assert_eq!(
        names(groups[&NodeKind::Table].iter().copied()),
        vec!["users", "transactions", "legacy_data"]
    );
    assert_eq!(groups[&NodeKind::Function].len(), 2);
    assert_eq!(groups[&NodeKind::ExternalResource].len(), 1);

    let total: usize = groups.values().map(Vec::len).sum();
    assert_eq!(total, engine.graph().node_count());
}

#[test]
fn test_group_by_kind_on_empty_graph_keeps_categories() {
    let engine = QueryEngine::new(Graph::new());
    let groups = engine.group_by_kind();
    assert_eq!(groups.len(), 4);
    assert!(groups.values().all(Vec::is_empty));
}

#[test]
fn test_filter_is_case_insensitive_substring() {
    let engine = QueryEngine::new(sample_graph());
    assert_eq!(
        names(engine.filter_by_text("USER")),
        vec!["Sync users", "users", "get_user_stats"]
    );
    assert!(engine.filter_by_text("no such thing").is_empty());
}

#[test]
fn test_empty_filter_returns_everything() {
    let engine = QueryEngine::new(sample_graph());
    assert_eq!(engine.filter_by_text("").len(), 9);
    assert_eq!(engine.filter_by_text("   ").len(), 9);
}

#[test]
fn test_impact_through_function() {
    let engine = QueryEngine::new(sample_graph());
    let transactions = NodeId::table(&q("transactions"));

    assert_eq!(
        engine.impact_of(&transactions).unwrap(),
        BTreeSet::from([wf("wf2")])
    );

    let impact = engine.impact(&NodeId::table(&q("users"))).unwrap();
    assert_eq!(impact.workflows, BTreeSet::from([wf("wf1"), wf("wf2")]));
    assert_eq!(impact.direct_workflows, BTreeSet::from([wf("wf1")]));
    assert_eq!(
        impact.via_functions,
        BTreeSet::from([NodeId::function(&q("get_user_stats"))])
    );
}

#[test]
fn test_impact_of_orphan_is_empty() {
    let engine = QueryEngine::new(sample_graph());
    let impact = engine.impact(&NodeId::table(&q("legacy_data"))).unwrap();
    assert!(impact.is_empty());
    // The unused function is still crossed, it just leads nowhere
    assert_eq!(
        impact.via_functions,
        BTreeSet::from([NodeId::function(&q("purge_legacy"))])
    );
}

#[test]
fn test_impact_of_workflow_excludes_itself() {
    let engine = QueryEngine::new(sample_graph());
    assert!(engine.impact_of(&wf("wf1")).unwrap().is_empty());
}

#[test]
fn test_impact_terminates_on_cycle() {
    let mut graph = sample_graph();
    let a = NodeId::function(&q("get_user_stats"));
    let b = NodeId::function(&q("purge_legacy"));
    graph.add_edge(&a, &b, EdgeKind::FunctionReads).unwrap();
    graph.add_edge(&b, &a, EdgeKind::FunctionReads).unwrap();

    let engine = QueryEngine::new(graph);
    let impact = engine.impact(&NodeId::table(&q("legacy_data"))).unwrap();
    assert_eq!(impact.workflows, BTreeSet::from([wf("wf2")]));
    assert_eq!(impact.via_functions, BTreeSet::from([a, b]));
}

#[test]
fn test_find_by_id_name_or_qualified_name() {
    let engine = QueryEngine::new(sample_graph());
    assert_eq!(engine.find("workflow:wf2").unwrap().name, "Daily stats");
    assert_eq!(engine.find("Daily stats").unwrap().id, wf("wf2"));
    assert_eq!(
        engine.find("public.users").unwrap().id,
        NodeId::table(&q("users"))
    );
    assert!(engine.find("nothing").is_none());
}

#[test]
fn test_collapsing_tables_aggregates_edges() {
    let engine = QueryEngine::new(sample_graph());
    let view = engine.collapsed_view(&BTreeSet::from([NodeKind::Table]));

    assert_eq!(view.nodes.len(), 7);
    let group = view
        .nodes
        .iter()
        .find(|n| n.id == NodeId::group(NodeKind::Table))
        .unwrap();
    assert_eq!(group.member_count, 3);
    assert!(group.collapsed);
    assert_eq!(group.name, "Tables");

    assert_eq!(view.edges.len(), 5);
    let stats_to_tables = view
        .edges
        .iter()
        .find(|e| e.source == NodeId::function(&q("get_user_stats")))
        .unwrap();
    assert_eq!(stats_to_tables.target, NodeId::group(NodeKind::Table));
    assert_eq!(stats_to_tables.count, 2);
    assert_eq!(stats_to_tables.kind_counts[&EdgeKind::FunctionReads], 2);
}

#[test]
fn test_collapsing_functions_and_tables() {
    let engine = QueryEngine::new(sample_graph());
    let view =
        engine.collapsed_view(&BTreeSet::from([NodeKind::Table, NodeKind::Function]));

    assert_eq!(view.edges.len(), 4);
    let reads = view
        .edges
        .iter()
        .find(|e| e.source == NodeId::group(NodeKind::Function))
        .unwrap();
    assert_eq!(reads.count, 3);
}

#[test]
fn test_expanded_view_mirrors_graph() {
    let engine = QueryEngine::new(sample_graph());
    let view = engine.collapsed_view(&BTreeSet::new());
    assert_eq!(view.nodes.len(), engine.graph().node_count());
    assert_eq!(view.edges.len(), engine.graph().edge_count());
    assert!(view.edges.iter().all(|e| e.count == 1));
}

#[test]
fn test_node_serialization_is_tagged_by_kind() {
    let node = GraphNode::table(&q("users"), true);
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["id"], "table:public.users");
    assert_eq!(json["data"]["kind"], "table");
    assert_eq!(json["data"]["used_by_workflows"], false);

    let back: GraphNode = serde_json::from_value(json).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_query_engine_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<QueryEngine>();
}
