//! HTTP query API over a merged stack graph

pub mod handlers;
pub mod router;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use stackmap_core::{Graph, QueryEngine};
use stackmap_export::Interchange;
use tracing::info;

pub use router::create_router;

/// Shared, read-only server state. The graph never changes after startup,
/// so handlers query it without locking.
#[derive(Debug)]
pub struct ServerState {
    pub engine: QueryEngine,
    pub interchange: Interchange,
}

impl ServerState {
    pub fn new(graph: Graph, interchange: Interchange) -> Self {
        ServerState {
            engine: QueryEngine::new(graph),
            interchange,
        }
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: Arc<ServerState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
