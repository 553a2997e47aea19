//! agent-relay - A2A agents behind an MCP orchestrator
//!
//! Hosted AI capabilities wrapped as Agent-to-Agent (A2A) servers, exposed to a
//! tool-calling model through a Model Context Protocol (MCP) server.
//!
//! # Architecture
//!
//! - `a2a` - A2A protocol types, JSON-RPC server with SSE streaming, client
//! - `agent` - Agents wrapping hosted backends (Foundry threads, OpenAI tools)
//! - `executors` - Adapt A2A tasks into agent calls
//! - `mcp` - MCP server forwarding tool calls to the agents, and its client
//! - `conversation` - Terminal chat session using the MCP tools
//! - `config` - Settings and agent profiles
//! - `cli` - The `relay` command line
//!
//! Control flow: user → conversation → MCP `tools/call` → A2A `message/send`
//! → executor → hosted backend, with the answer propagated back up.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_relay::a2a::{client::build_http_client, AgentProxy, RemoteAgent};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http = build_http_client(Duration::from_secs(200), Duration::from_secs(10))?;
//!     let rag = AgentProxy::new(http, "http://localhost:9998");
//!
//!     println!("{}", rag.ask("What is Astro Events?").await?);
//!     Ok(())
//! }
//! ```

pub mod a2a;
pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod executors;
pub mod jsonrpc;
pub mod mcp;
pub mod openai;

pub use error::{RelayError, Result};
