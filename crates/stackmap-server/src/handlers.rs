//! REST API handlers for the query server

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use stackmap_core::{GraphNode, Impact, NodeId, NodeKind, ViewGraph};
use stackmap_export::Interchange;

use crate::ServerState;

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Compact node representation for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub qualified_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by_workflows: Option<bool>,
}

impl From<&GraphNode> for NodeSummary {
    fn from(node: &GraphNode) -> Self {
        NodeSummary {
            id: node.id.clone(),
            kind: node.kind(),
            name: node.name.clone(),
            qualified_name: node.qualified_name.clone(),
            used_by_workflows: node.used_by_workflows(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub label: &'static str,
    pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    /// Kinds to fold into group nodes; repeatable.
    #[serde(default)]
    pub collapsed: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    /// Node id, display name or qualified name.
    pub id: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let graph = state.engine.graph();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
    })
}

/// The interchange document for this graph
pub async fn get_stack(State(state): State<Arc<ServerState>>) -> Json<Interchange> {
    Json(state.interchange.clone())
}

/// The graph as displayed, with the requested kinds collapsed
pub async fn get_graph(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<ViewGraph>, ApiError> {
    let collapsed = query
        .collapsed
        .iter()
        .map(|raw| raw.parse::<NodeKind>())
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(ApiError::BadRequest)?;
    Ok(Json(state.engine.collapsed_view(&collapsed)))
}

/// Every node grouped by kind; every kind is present
pub async fn get_groups(
    State(state): State<Arc<ServerState>>,
) -> Json<BTreeMap<NodeKind, GroupResponse>> {
    let groups = state
        .engine
        .group_by_kind()
        .into_iter()
        .map(|(kind, nodes)| {
            let group = GroupResponse {
                label: kind.label(),
                nodes: nodes.into_iter().map(NodeSummary::from).collect(),
            };
            (kind, group)
        })
        .collect();
    Json(groups)
}

/// Case-insensitive name search; an empty query lists every node
pub async fn search(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<NodeSummary>> {
    let nodes = state.engine.filter_by_text(&query.q);
    Json(nodes.into_iter().map(NodeSummary::from).collect())
}

pub async fn get_neighbors(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<Vec<NodeSummary>>, ApiError> {
    let id = resolve(&state, &query.id)?;
    let neighbors = state
        .engine
        .neighbors(&id)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    Ok(Json(neighbors.into_iter().map(NodeSummary::from).collect()))
}

/// Workflows affected by a change to the given node
pub async fn get_impact(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<Impact>, ApiError> {
    let id = resolve(&state, &query.id)?;
    state
        .engine
        .impact(&id)
        .map(Json)
        .map_err(|e| ApiError::NotFound(e.to_string()))
}

fn resolve(state: &ServerState, needle: &str) -> Result<NodeId, ApiError> {
    state
        .engine
        .find(needle)
        .map(|node| node.id.clone())
        .ok_or_else(|| ApiError::NotFound(format!("node not found: {needle}")))
}
