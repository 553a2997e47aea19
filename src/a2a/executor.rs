//! The seam between the A2A server and agent business logic.

use super::events::TaskUpdater;
use super::types::{Message, Task};
use crate::error::{RelayError, Result};
use async_trait::async_trait;

/// Everything an executor learns about one incoming call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Option<Message>,
    /// Set when the message continues a task the server already knows.
    pub current_task: Option<Task>,
}

impl RequestContext {
    /// Text of the user's message, parts joined by newlines.
    pub fn user_input(&self) -> String {
        self.message.as_ref().map(Message::text).unwrap_or_default()
    }

    /// Ensure ids and a message are present.
    pub fn validate(&self) -> Result<&Message> {
        if self.task_id.is_empty() || self.context_id.is_empty() {
            return Err(RelayError::InvalidInput(
                "RequestContext must have task_id and context_id".to_string(),
            ));
        }
        self.message
            .as_ref()
            .ok_or_else(|| RelayError::InvalidInput("RequestContext must have a message".to_string()))
    }
}

/// Agent logic behind an A2A server.
///
/// All output goes through the updater: zero or more intermediate events,
/// then exactly one terminal event.
#[async_trait]
pub trait AgentExecutor: Send + Sync + 'static {
    async fn execute(&self, context: RequestContext, updater: &TaskUpdater) -> Result<()>;

    async fn cancel(&self, context: RequestContext, updater: &TaskUpdater) -> Result<()>;
}
