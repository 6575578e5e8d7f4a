//! HTTP server lifecycle: bind, log, serve.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Bind the listener and serve the API until the process stops.
pub async fn serve(core: Arc<CoreState>, addr: SocketAddr) -> std::io::Result<()> {
    let router = api_router(core);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await
}
