//! Test doubles for models, tools and backends.

use super::rag::{Run, RunError, RunStatus, ThreadBackend, ThreadMessage};
use super::runner::{ChatMessage, ChatModel, ModelTurn, ToolInvocation, ToolSet, ToolSpec};
use super::tools::WebSearch;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed sequence of model turns.
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    next_call: Mutex<usize>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    offered: Mutex<Vec<Vec<String>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            next_call: Mutex::new(1),
            seen: Mutex::new(Vec::new()),
            offered: Mutex::new(Vec::new()),
        }
    }

    pub fn tool_call(self, name: &str, arguments: &str) -> Self {
        let id = {
            let mut next = self.next_call.lock().unwrap();
            let id = format!("call_{}", *next);
            *next += 1;
            id
        };
        self.turns.lock().unwrap().push_back(ModelTurn {
            content: None,
            tool_calls: vec![ToolInvocation {
                id,
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        });
        self
    }

    pub fn answer(self, text: &str) -> Self {
        self.turns.lock().unwrap().push_back(ModelTurn {
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
        });
        self
    }

    /// Conversations the model was called with, one per turn.
    pub fn seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }

    /// Tool names offered on each turn.
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelTurn> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.offered
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RelayError::OpenAI("script exhausted".to_string()))
    }
}

/// Tools that return canned output.
pub struct StaticTools {
    outputs: Vec<(String, String)>,
}

impl StaticTools {
    pub fn new(outputs: &[(&str, &str)]) -> Self {
        Self {
            outputs: outputs
                .iter()
                .map(|(n, o)| (n.to_string(), o.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ToolSet for StaticTools {
    fn specs(&self) -> Vec<ToolSpec> {
        self.outputs
            .iter()
            .map(|(name, _)| ToolSpec {
                name: name.clone(),
                description: format!("{} tool", name),
                parameters: json!({"type": "object", "properties": {}}),
            })
            .collect()
    }

    async fn call(&self, name: &str, _arguments: &str) -> Result<String> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, output)| output.clone())
            .ok_or_else(|| RelayError::Agent(format!("Unknown tool: {}", name)))
    }
}

/// Search that echoes the query.
pub struct EchoSearch;

#[async_trait]
impl WebSearch for EchoSearch {
    async fn search(&self, query: &str) -> Result<String> {
        Ok(format!("results for: {}", query))
    }
}

/// In-memory thread backend.
pub struct FakeThreadBackend {
    answer: Option<String>,
    failure: Option<RunError>,
    threads: Mutex<Vec<Vec<ThreadMessage>>>,
}

impl FakeThreadBackend {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            failure: None,
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: &str, message: &str) -> Self {
        Self {
            answer: None,
            failure: Some(RunError {
                code: Some(code.to_string()),
                message: Some(message.to_string()),
            }),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self {
            answer: None,
            failure: None,
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn threads_created(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    /// User messages, in the order they were posted.
    pub fn questions(&self) -> Vec<String> {
        self.threads
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .filter(|m| m.role == "user")
            .flat_map(|m| m.texts.clone())
            .collect()
    }

    fn index(thread_id: &str) -> Result<usize> {
        thread_id
            .strip_prefix("thread_")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| RelayError::Backend(format!("No thread {}", thread_id)))
    }
}

#[async_trait]
impl ThreadBackend for FakeThreadBackend {
    async fn create_thread(&self) -> Result<String> {
        let mut threads = self.threads.lock().unwrap();
        threads.push(Vec::new());
        Ok(format!("thread_{}", threads.len() - 1))
    }

    async fn create_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()> {
        let index = Self::index(thread_id)?;
        let mut threads = self.threads.lock().unwrap();
        let thread = threads
            .get_mut(index)
            .ok_or_else(|| RelayError::Backend(format!("No thread {}", thread_id)))?;
        thread.push(ThreadMessage {
            id: format!("msg_{}", thread.len()),
            role: role.to_string(),
            texts: vec![content.to_string()],
        });
        Ok(())
    }

    async fn create_and_process_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run> {
        if let Some(error) = &self.failure {
            return Ok(Run {
                id: "run_1".to_string(),
                status: RunStatus::Failed,
                last_error: Some(error.clone()),
            });
        }
        if let Some(answer) = &self.answer {
            self.create_message(thread_id, "assistant", answer).await?;
        }
        Ok(Run {
            id: "run_1".to_string(),
            status: RunStatus::Completed,
            last_error: None,
        })
    }

    async fn list_messages(&self, thread_id: &str, ascending: bool) -> Result<Vec<ThreadMessage>> {
        let index = Self::index(thread_id)?;
        let mut messages = self
            .threads
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .unwrap_or_default();
        if !ascending {
            messages.reverse();
        }
        Ok(messages)
    }
}
