//! Retrieval-augmented QA agent over a managed thread/run backend.

use super::{Agent, Reply};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const NO_RESPONSE: &str = "No response received from agent";

/// Status of a backend run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Completed
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (None, Some(message)) => write!(f, "{}", message),
            (Some(code), None) => write!(f, "{}", code),
            (None, None) => write!(f, "unknown error"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// A thread message reduced to its text contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    pub texts: Vec<String>,
}

/// Managed question-answering backend: threads, messages and runs.
#[async_trait]
pub trait ThreadBackend: Send + Sync {
    async fn create_thread(&self) -> Result<String>;

    async fn create_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()>;

    /// Start a run and wait until it reaches a terminal status.
    async fn create_and_process_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    async fn list_messages(&self, thread_id: &str, ascending: bool) -> Result<Vec<ThreadMessage>>;
}

/// Answers each question on a fresh backend thread.
pub struct RagAgent {
    backend: Arc<dyn ThreadBackend>,
    assistant_id: String,
}

impl RagAgent {
    pub fn new(backend: Arc<dyn ThreadBackend>, assistant_id: &str) -> Self {
        Self {
            backend,
            assistant_id: assistant_id.to_string(),
        }
    }

    async fn ask(&self, question: &str) -> Result<String> {
        let thread_id = self.backend.create_thread().await?;
        info!("Thread created, ID: {}", thread_id);

        self.backend
            .create_message(&thread_id, "user", question)
            .await?;

        debug!("Starting run on thread {}", thread_id);
        let run = self
            .backend
            .create_and_process_run(&thread_id, &self.assistant_id)
            .await?;

        if run.status == RunStatus::Failed {
            let reason = run
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            error!("Run {} failed: {}", run.id, reason);
            return Err(RelayError::Backend(format!("Run failed: {}", reason)));
        }

        let messages = self.backend.list_messages(&thread_id, true).await?;
        // The question itself is in the thread too; only the agent's side counts.
        let answer = messages
            .iter()
            .rev()
            .find(|message| message.role != "user")
            .and_then(|message| message.texts.last())
            .cloned();

        match answer {
            Some(answer) => {
                debug!("Answer length: {} characters", answer.len());
                Ok(answer)
            }
            None => {
                warn!("{}", NO_RESPONSE);
                Ok(NO_RESPONSE.to_string())
            }
        }
    }
}

#[async_trait]
impl Agent for RagAgent {
    fn name(&self) -> &str {
        "RAG Agent"
    }

    #[instrument(skip(self, query))]
    async fn invoke(&self, query: &str) -> Result<Reply> {
        info!("RAG question: {}", query);
        self.ask(query).await.map(Reply::Text)
    }
}
