//! MCP command implementation.

use crate::config::Settings;
use crate::mcp::{http, McpServer};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Run the MCP server over HTTP, or stdio when asked.
pub async fn run_mcp(
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    stdio: bool,
    settings: &Settings,
) -> Result<()> {
    let server = McpServer::from_settings(&settings.mcp)?;

    if stdio {
        server.run_stdio().await?;
        return Ok(());
    }

    let host = host.unwrap_or_else(|| settings.mcp.host.clone());
    let port = port.unwrap_or(settings.mcp.port);
    let path = path.unwrap_or_else(|| settings.mcp.path.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting MCP server on {}", addr);

    http::serve(listener, Arc::new(server), &path).await?;
    Ok(())
}
