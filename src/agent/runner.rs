//! Tool-calling loop over a chat model.

use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// A message in a model conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// A function tool offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

/// What the model produced in one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

/// A chat model that may answer or ask for tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelTurn>;
}

/// Tools the runner can execute.
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn specs(&self) -> Vec<ToolSpec>;

    async fn call(&self, name: &str, arguments: &str) -> Result<String>;
}

/// A tool set with no tools.
pub struct EmptyToolSet;

#[async_trait]
impl ToolSet for EmptyToolSet {
    fn specs(&self) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn call(&self, name: &str, _arguments: &str) -> Result<String> {
        Err(RelayError::Agent(format!("Unknown tool: {}", name)))
    }
}

/// Observer of tool activity during a run.
pub trait RunHooks: Send + Sync {
    fn on_tool_start(&self, _call: &ToolInvocation) {}

    fn on_tool_end(&self, _record: &ToolCallRecord) {}
}

/// Hooks that observe nothing.
pub struct NoHooks;

impl RunHooks for NoHooks {}

/// Runs a model against a tool set until it answers.
pub struct Runner {
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolSet>,
    max_turns: usize,
}

impl Runner {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<dyn ToolSet>) -> Self {
        Self {
            model,
            tools,
            max_turns: 10,
        }
    }

    /// Set the maximum number of model calls per run.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Continue the conversation in `messages` until the model gives a final answer.
    ///
    /// Assistant and tool messages are appended to `messages` as the run goes.
    pub async fn run(
        &self,
        messages: &mut Vec<ChatMessage>,
        hooks: &dyn RunHooks,
    ) -> Result<RunOutcome> {
        let specs = self.tools.specs();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_turns {
                return Err(RelayError::Agent(format!(
                    "Agent exceeded maximum turns ({})",
                    self.max_turns
                )));
            }

            debug!("Model turn {} with {}", iterations, self.model.model());
            let turn = self.model.complete(messages, &specs).await?;

            if turn.tool_calls.is_empty() {
                let content = turn.content.unwrap_or_default();
                messages.push(ChatMessage::Assistant {
                    content: Some(content.clone()),
                    tool_calls: Vec::new(),
                });
                return Ok(RunOutcome {
                    content,
                    tool_calls: tool_calls_made,
                    iterations,
                });
            }

            messages.push(ChatMessage::Assistant {
                content: turn.content,
                tool_calls: turn.tool_calls.clone(),
            });

            for call in &turn.tool_calls {
                hooks.on_tool_start(call);
                let record = self.execute_tool_call(call).await;
                messages.push(ChatMessage::Tool {
                    call_id: call.id.clone(),
                    content: record.result.clone(),
                });
                hooks.on_tool_end(&record);
                tool_calls_made.push(record);
            }
        }
    }

    async fn execute_tool_call(&self, call: &ToolInvocation) -> ToolCallRecord {
        info!("Calling tool: {} with args: {}", call.name, call.arguments);

        let (result, succeeded) = match self.tools.call(&call.name, &call.arguments).await {
            Ok(output) => (output, true),
            Err(e) => (format!("Tool error: {}", e), false),
        };

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
            succeeded,
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The final answer.
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
}

/// Record of a tool call made during a run.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    pub result: String,
    pub succeeded: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{ScriptedModel, StaticTools};

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "web_search".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "Found results".to_string(),
            succeeded: true,
        };
        assert_eq!(format!("{}", record), r#"web_search({"query": "test"})"#);
    }

    #[tokio::test]
    async fn test_tool_results_feed_the_next_turn() {
        let model = Arc::new(
            ScriptedModel::new()
                .tool_call("web_search", r#"{"query":"rust"}"#)
                .answer("Rust is a language."),
        );
        let tools = Arc::new(StaticTools::new(&[("web_search", "Rust results")]));
        let runner = Runner::new(model.clone(), tools);

        let mut messages = vec![ChatMessage::User("what is rust?".to_string())];
        let outcome = runner.run(&mut messages, &NoHooks).await.unwrap();

        assert_eq!(outcome.content, "Rust is a language.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert!(outcome.tool_calls[0].succeeded);
        assert!(messages.contains(&ChatMessage::Tool {
            call_id: "call_1".to_string(),
            content: "Rust results".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_failed_tool_is_reported_to_model() {
        let model = Arc::new(
            ScriptedModel::new()
                .tool_call("missing", "{}")
                .answer("Sorry."),
        );
        let runner = Runner::new(model, Arc::new(EmptyToolSet));

        let mut messages = vec![ChatMessage::User("hi".to_string())];
        let outcome = runner.run(&mut messages, &NoHooks).await.unwrap();
        assert!(!outcome.tool_calls[0].succeeded);
        assert!(outcome.tool_calls[0].result.starts_with("Tool error:"));
    }

    #[tokio::test]
    async fn test_max_turns_exceeded() {
        let model = Arc::new(
            ScriptedModel::new()
                .tool_call("web_search", "{}")
                .tool_call("web_search", "{}"),
        );
        let tools = Arc::new(StaticTools::new(&[("web_search", "results")]));
        let runner = Runner::new(model, tools).with_max_turns(2);

        let mut messages = vec![ChatMessage::User("loop".to_string())];
        let err = runner.run(&mut messages, &NoHooks).await.unwrap_err();
        assert!(err.to_string().contains("maximum turns (2)"));
    }
}
