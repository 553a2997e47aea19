//! Send command: a small A2A test client.

use crate::a2a::client::build_http_client;
use crate::a2a::{extract_text, A2AClient, CardResolver, Message};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::{Context, Result};
use futures::StreamExt;

/// Send `text` to the agent at `url` and print the reply.
pub async fn run_send(url: &str, text: &str, stream: bool, settings: &Settings) -> Result<()> {
    let http = build_http_client(settings.mcp.request_timeout(), settings.mcp.connect_timeout())?;
    let card = CardResolver::new(http.clone(), url)?
        .get_agent_card()
        .await
        .with_context(|| format!("Failed to fetch agent card from {}", url))?;
    Output::info(&format!("Connected to {} at {}", card.name, card.url));

    let client = A2AClient::new(http, &card)?;
    let message = Message::user_text(text);

    if stream {
        if !card.capabilities.streaming {
            Output::warning("Agent does not advertise streaming; the reply arrives in one piece.");
        }
        let mut events = client.send_message_streaming(message).await?;
        while let Some(event) = events.next().await {
            Output::event(&event?);
        }
        return Ok(());
    }

    let spinner = Output::spinner("Waiting for the agent...");
    let result = client.send_message(message).await;
    spinner.finish_and_clear();

    let event = result?;
    match extract_text(&event) {
        Ok(answer) => println!("{}", answer),
        Err(e) => {
            // A failed task carries its reason in the status message.
            Output::event(&event);
            return Err(e.into());
        }
    }
    Ok(())
}
