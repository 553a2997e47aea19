//! CLI module for agent-relay.

pub mod commands;
mod output;

pub use output::Output;

use crate::executors::AgentKind;
use clap::{Parser, Subcommand};

/// Agent-relay: A2A agents behind an MCP orchestrator
///
/// Serves the calculator, RAG and web search agents over A2A, exposes them as
/// MCP tools, and chats with them from the terminal.
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve one agent over A2A
    Serve {
        /// Which agent to serve
        #[arg(value_enum)]
        agent: AgentKind,

        /// Host to bind to (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default depends on the agent)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start the MCP server exposing the agents as tools
    Mcp {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// HTTP path serving MCP
        #[arg(long)]
        path: Option<String>,

        /// Speak MCP over stdin/stdout instead of HTTP
        #[arg(long)]
        stdio: bool,
    },

    /// Start an interactive chat session using the MCP tools
    Chat {
        /// MCP server URL
        #[arg(long)]
        mcp_url: Option<String>,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Send a message to an A2A agent
    Send {
        /// Agent base URL (e.g. http://localhost:9999)
        url: String,

        /// Text to send
        text: String,

        /// Stream events as they arrive
        #[arg(short, long)]
        stream: bool,
    },

    /// Show an A2A agent's card
    Card {
        /// Agent base URL
        url: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["relay", "-vv", "serve", "web", "--port", "7000"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve { agent, host, port } => {
                assert_eq!(agent, AgentKind::Web);
                assert_eq!(host, None);
                assert_eq!(port, Some(7000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_send_and_mcp() {
        let cli =
            Cli::try_parse_from(["relay", "send", "http://localhost:9998", "hi", "--stream"]).unwrap();
        assert!(matches!(cli.command, Commands::Send { stream: true, .. }));

        let cli = Cli::try_parse_from(["relay", "-c", "/tmp/c.toml", "mcp", "--stdio"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(cli.command, Commands::Mcp { stdio: true, .. }));
    }

    #[test]
    fn test_unknown_agent_rejected() {
        assert!(Cli::try_parse_from(["relay", "serve", "weather"]).is_err());
    }
}
