//! Streamable HTTP transport: JSON-RPC messages POSTed to a single path.

use super::server::McpServer;
use crate::error::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Build the router serving MCP at `path`.
pub fn router(server: Arc<McpServer>, path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(path, post(handle))
        .route("/health", get(health))
        .layer(cors)
        .with_state(server)
}

/// Serve MCP over HTTP on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, server: Arc<McpServer>, path: &str) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("MCP server listening on http://{}{}", addr, path);
    }
    axum::serve(listener, router(server, path)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let line = String::from_utf8_lossy(&body);
    match server.handle_line(&line).await {
        Some(response) => Json(response).into_response(),
        // Notifications are acknowledged without a body.
        None => StatusCode::ACCEPTED.into_response(),
    }
}
