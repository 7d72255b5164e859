//! Handler tests for stackmap-server

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::Query;
use chrono::{TimeZone, Utc};
use stackmap_core::{EdgeKind, Graph, GraphNode, NodeId, NodeKind, QualifiedName};
use stackmap_export::{to_interchange, ExportOptions};
use stackmap_merge::Summary;

use crate::handlers::*;
use crate::*;

fn q(name: &str) -> QualifiedName {
    QualifiedName::new("public", name)
}

/// wf1 -> users; wf2 -> get_user_stats -> users, transactions
fn state() -> Arc<ServerState> {
    let mut graph = Graph::new();
    for node in [
        GraphNode::workflow("wf1", "Sync users", true),
        GraphNode::workflow("wf2", "Daily stats", false),
        GraphNode::table(&q("users"), true),
        GraphNode::table(&q("transactions"), true),
        GraphNode::function(&q("get_user_stats"), true),
    ] {
        graph.add_node(node).unwrap();
    }
    let stats = NodeId::function(&q("get_user_stats"));
    let users = NodeId::table(&q("users"));
    let transactions = NodeId::table(&q("transactions"));
    graph
        .add_edge(&NodeId::workflow("wf1"), &users, EdgeKind::WorkflowUses)
        .unwrap();
    graph
        .add_edge(&NodeId::workflow("wf2"), &stats, EdgeKind::WorkflowUses)
        .unwrap();
    graph.add_edge(&stats, &users, EdgeKind::FunctionReads).unwrap();
    graph
        .add_edge(&stats, &transactions, EdgeKind::FunctionReads)
        .unwrap();

    let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let interchange = to_interchange(
        &graph,
        &Summary::default(),
        &[],
        generated_at,
        &ExportOptions::default(),
    );
    Arc::new(ServerState::new(graph, interchange))
}

#[test]
fn test_router_creation() {
    let _router = create_router(state());
}

#[tokio::test]
async fn test_health_reports_graph_size() {
    let response = health_check(State(state())).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stack_returns_interchange() {
    let state = state();
    let stack = get_stack(State(state.clone())).await;
    assert_eq!(stack.0, state.interchange);
    assert_eq!(stack.0.metadata.generated_at, "2024-05-01T00:00:00Z");
}

#[tokio::test]
async fn test_graph_collapses_requested_kinds() {
    let query = GraphQuery {
        collapsed: vec!["tables".to_string()],
    };
    let view = get_graph(State(state()), Query(query)).await.unwrap().0;

    assert_eq!(view.nodes.len(), 4);
    let reads = view
        .edges
        .iter()
        .find(|e| e.source == NodeId::function(&q("get_user_stats")))
        .unwrap();
    assert_eq!(reads.target, NodeId::group(NodeKind::Table));
    assert_eq!(reads.count, 2);
}

#[tokio::test]
async fn test_graph_rejects_unknown_kind() {
    let query = GraphQuery {
        collapsed: vec!["columns".to_string()],
    };
    let err = get_graph(State(state()), Query(query)).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_groups_cover_every_kind() {
    let groups = get_groups(State(state())).await.0;
    assert_eq!(groups.len(), 4);
    assert_eq!(groups[&NodeKind::Table].nodes.len(), 2);
    assert_eq!(groups[&NodeKind::Function].label, "Functions");
    assert!(groups[&NodeKind::ExternalResource].nodes.is_empty());
}

#[tokio::test]
async fn test_search() {
    let state = state();
    let hits = search(
        State(state.clone()),
        Query(SearchQuery {
            q: "stats".to_string(),
        }),
    )
    .await
    .0;
    let names: Vec<&str> = hits.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Daily stats", "get_user_stats"]);

    let all = search(State(state), Query(SearchQuery::default())).await.0;
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn test_neighbors_by_name() {
    let query = NodeQuery {
        id: "get_user_stats".to_string(),
    };
    let neighbors = get_neighbors(State(state()), Query(query)).await.unwrap().0;
    let names: Vec<&str> = neighbors.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Daily stats", "users", "transactions"]);
}

#[tokio::test]
async fn test_impact_and_missing_node() {
    let state = state();
    let impact = get_impact(
        State(state.clone()),
        Query(NodeQuery {
            id: "table:public.transactions".to_string(),
        }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(impact.workflows.len(), 1);
    assert!(impact.workflows.contains(&NodeId::workflow("wf2")));

    let err = get_impact(
        State(state),
        Query(NodeQuery {
            id: "nope".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}
