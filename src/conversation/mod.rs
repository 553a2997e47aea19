//! Conversation front end: a tool-calling model whose tools live on an MCP server.

use crate::agent::runner::{
    ChatMessage, ChatModel, EmptyToolSet, RunHooks, Runner, ToolSet, ToolSpec,
};
use crate::config::ConversationSettings;
use crate::error::{RelayError, Result};
use crate::mcp::{McpClient, Tool};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// MCP tools offered to the chat model.
pub struct McpToolSet {
    client: Arc<McpClient>,
    tools: Vec<Tool>,
}

impl McpToolSet {
    /// Initialize a session with the server and fetch its tool list.
    pub async fn connect(client: Arc<McpClient>) -> Result<Self> {
        let init = client.initialize("agent-relay-chat").await?;
        info!(
            "Connected to MCP server {} {}",
            init.server_info.name, init.server_info.version
        );
        let tools = client.list_tools().await?;
        debug!("MCP tools: {:?}", tools.iter().map(|t| &t.name).collect::<Vec<_>>());
        Ok(Self { client, tools })
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

#[async_trait]
impl ToolSet for McpToolSet {
    fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            })
            .collect()
    }

    async fn call(&self, name: &str, arguments: &str) -> Result<String> {
        let arguments: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)?
        };
        let result = self.client.call_tool(name, arguments).await?;
        if result.is_error() {
            return Err(RelayError::Agent(result.joined_text()));
        }
        Ok(result.joined_text())
    }
}

/// One tool call shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub tool: String,
    pub arguments: String,
    pub succeeded: bool,
}

/// What one user message produced.
#[derive(Debug, Clone)]
pub struct Turn {
    pub steps: Vec<Step>,
    pub answer: String,
}

/// A chat with history.
pub struct ConversationSession {
    agent_name: String,
    runner: Runner,
    messages: Vec<ChatMessage>,
    max_history: usize,
    has_tools: bool,
}

impl ConversationSession {
    /// Without tools the session is plain chat.
    pub fn new(
        settings: &ConversationSettings,
        model: Arc<dyn ChatModel>,
        tools: Option<Arc<dyn ToolSet>>,
    ) -> Self {
        let has_tools = tools.is_some();
        let tools = match tools {
            Some(tools) => tools,
            None => Arc::new(EmptyToolSet) as Arc<dyn ToolSet>,
        };
        Self {
            agent_name: settings.agent_name.clone(),
            runner: Runner::new(model, tools).with_max_turns(settings.max_turns),
            messages: vec![ChatMessage::System(settings.instructions.clone())],
            max_history: settings.max_history.max(2),
            has_tools,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn has_tools(&self) -> bool {
        self.has_tools
    }

    pub fn history_len(&self) -> usize {
        self.messages.len()
    }

    /// Clear conversation history (keeps the instructions).
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    /// Send a user message and run the model until it answers.
    pub async fn send(&mut self, input: &str, hooks: &dyn RunHooks) -> Result<Turn> {
        let checkpoint = self.messages.len();
        self.messages.push(ChatMessage::User(input.to_string()));

        let outcome = match self.runner.run(&mut self.messages, hooks).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Leave history as it was before the failed turn.
                self.messages.truncate(checkpoint);
                return Err(e);
            }
        };

        self.trim_history();

        Ok(Turn {
            steps: outcome
                .tool_calls
                .into_iter()
                .map(|record| Step {
                    tool: record.name,
                    arguments: record.arguments,
                    succeeded: record.succeeded,
                })
                .collect(),
            answer: outcome.content,
        })
    }

    /// Drop the oldest turns once history is too long.
    ///
    /// Cuts only at user messages so tool results never lose their call.
    fn trim_history(&mut self) {
        if self.messages.len() <= self.max_history {
            return;
        }
        let excess = self.messages.len() - self.max_history;
        let cut = self
            .messages
            .iter()
            .enumerate()
            .skip(1 + excess)
            .find(|(_, m)| matches!(m, ChatMessage::User(_)))
            .map(|(i, _)| i);
        if let Some(cut) = cut {
            self.messages.drain(1..cut);
        }
    }
}
