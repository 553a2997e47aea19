//! CLI command implementations.

mod card;
mod chat;
mod config;
mod mcp;
mod send;
mod serve;

pub use card::run_card;
pub use chat::run_chat;
pub use config::run_config;
pub use mcp::run_mcp;
pub use send::run_send;
pub use serve::run_serve;
