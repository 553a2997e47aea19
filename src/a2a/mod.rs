//! Agent-to-Agent (A2A) protocol: types, server, client.
//!
//! Agents publish a card at a well-known path and accept JSON-RPC 2.0 calls
//! at their root URL, either as a single response or as an SSE stream.

pub mod client;
pub mod events;
pub mod executor;
pub mod registry;
pub mod server;
pub mod sse;
pub mod types;

pub use client::{extract_text, A2AClient, AgentProxy, CardResolver, RemoteAgent};
pub use events::{EventQueue, EventReceiver, TaskUpdater};
pub use executor::{AgentExecutor, RequestContext};
pub use registry::TaskRegistry;
pub use server::RequestHandler;
pub use types::*;

/// Where agent cards are published.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const AGENT_CARD_ALIAS_PATH: &str = "/.well-known/agent-card.json";

pub const METHOD_SEND_MESSAGE: &str = "message/send";
pub const METHOD_SEND_STREAMING_MESSAGE: &str = "message/stream";
pub const METHOD_GET_TASK: &str = "tasks/get";
pub const METHOD_CANCEL_TASK: &str = "tasks/cancel";
