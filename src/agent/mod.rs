//! Agents: hosted capabilities behind a common invoke / invoke_stream seam.
//!
//! - `calculator` - placeholder agent that never computes anything
//! - `rag` - question answering over a managed thread/run backend
//! - `foundry` - Azure AI Foundry implementation of that backend
//! - `web` - tool-calling model with hosted web search
//! - `runner` - the tool-calling loop shared by the web agent and the chat front end

pub mod calculator;
pub mod foundry;
pub mod model;
pub mod rag;
pub mod runner;
pub mod tools;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use calculator::CalculatorAgent;
pub use foundry::FoundryClient;
pub use model::OpenAIChatModel;
pub use rag::{RagAgent, ThreadBackend};
pub use runner::{
    ChatMessage, ChatModel, ModelTurn, NoHooks, RunHooks, RunOutcome, Runner, ToolCallRecord,
    ToolInvocation, ToolSet, ToolSpec,
};
pub use tools::WebTools;
pub use web::WebAgent;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;

/// What an agent answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// The agent is a stub and did no work.
    NotImplemented { placeholder: String },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) => text,
            Reply::NotImplemented { placeholder } => placeholder,
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, Reply::Text(_))
    }
}

/// Progress reported by a streaming agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    AgentStart { agent: String },
    ToolStart { tool: String, arguments: String },
    ToolEnd { tool: String, output: String },
    AgentEnd { agent: String },
    /// Final answer.
    Response(String),
    Error(String),
}

impl AgentEvent {
    /// Exactly one terminal event ends every stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Response(_) | AgentEvent::Error(_))
    }

    /// Human-readable text for status updates.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentEvent::AgentStart { agent } => write!(f, "Agent '{}' is starting...", agent),
            AgentEvent::ToolStart { tool, .. } => write!(f, "Tool '{}' is starting", tool),
            AgentEvent::ToolEnd { tool, .. } => write!(f, "Tool '{}' completed", tool),
            AgentEvent::AgentEnd { agent } => write!(f, "Agent '{}' has completed", agent),
            AgentEvent::Response(text) => write!(f, "{}", text),
            AgentEvent::Error(error) => write!(f, "{}", error),
        }
    }
}

/// A hosted capability.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, query: &str) -> Result<Reply>;

    /// Stream progress events, ending with exactly one terminal event.
    ///
    /// The default runs `invoke` and reports its outcome as the only event.
    fn invoke_stream<'a>(&'a self, query: &'a str) -> BoxStream<'a, AgentEvent> {
        stream::once(async move {
            match self.invoke(query).await {
                Ok(reply) => AgentEvent::Response(reply.text().to_string()),
                Err(e) => AgentEvent::Error(e.to_string()),
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text_and_tag() {
        let reply = Reply::NotImplemented {
            placeholder: "nothing".to_string(),
        };
        assert_eq!(reply.text(), "nothing");
        assert!(!reply.is_implemented());
        assert!(Reply::Text("x".to_string()).is_implemented());
    }

    #[tokio::test]
    async fn test_default_stream_is_single_terminal_event() {
        let agent = CalculatorAgent::new();
        let events: Vec<AgentEvent> = agent.invoke_stream("1 + 1").collect().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
    }
}
