//! Axum router setup for the query API

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::{
    handlers::{get_graph, get_groups, get_impact, get_neighbors, get_stack, health_check, search},
    ServerState,
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Interchange document, as written to disk
        .route("/api/stack", get(get_stack))
        .route("/api/graph", get(get_graph))
        .route("/api/groups", get(get_groups))
        .route("/api/search", get(search))
        .route("/api/neighbors", get(get_neighbors))
        .route("/api/impact", get(get_impact))
        // The display layer may be served from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
