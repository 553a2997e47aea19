//! MCP (Model Context Protocol) orchestrator.
//!
//! Exposes the RAG and web agents as tools. Implements JSON-RPC 2.0 over
//! streamable HTTP or stdio, plus a client used by the chat front end.

pub mod client;
pub mod http;
pub mod protocol;
mod server;
pub mod tools;

pub use client::McpClient;
pub use protocol::{Tool, ToolCallResult};
pub use server::McpServer;
