//! relay CLI entry point.

use agent_relay::cli::{commands, Cli, Commands};
use agent_relay::config::Settings;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging; stdout belongs to the stdio MCP transport.
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("agent_relay={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Execute command
    match cli.command {
        Commands::Serve { agent, host, port } => {
            commands::run_serve(agent, host, port, &settings).await?;
        }

        Commands::Mcp {
            host,
            port,
            path,
            stdio,
        } => {
            commands::run_mcp(host, port, path, stdio, &settings).await?;
        }

        Commands::Chat { mcp_url, model } => {
            commands::run_chat(mcp_url, model, &settings).await?;
        }

        Commands::Send { url, text, stream } => {
            commands::run_send(&url, &text, stream, &settings).await?;
        }

        Commands::Card { url } => {
            commands::run_card(&url, &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, &settings)?;
        }
    }

    Ok(())
}
