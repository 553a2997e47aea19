//! Card command implementation.

use crate::a2a::client::build_http_client;
use crate::a2a::CardResolver;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Fetch and print an agent's card.
pub async fn run_card(url: &str, settings: &Settings) -> Result<()> {
    let http = build_http_client(settings.mcp.request_timeout(), settings.mcp.connect_timeout())?;
    let card = CardResolver::new(http, url)?.get_agent_card().await?;
    Output::card(&card);
    Ok(())
}
