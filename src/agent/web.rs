//! Web search agent: a tool-calling model driven by a profile.

use super::runner::{ChatMessage, ChatModel, RunHooks, RunOutcome, Runner, ToolCallRecord, ToolInvocation, ToolSet};
use super::{Agent, AgentEvent, Reply};
use crate::config::AgentProfile;
use crate::error::Result;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct WebAgent {
    name: String,
    instructions: String,
    runner: Runner,
}

impl WebAgent {
    pub fn new(profile: &AgentProfile, model: Arc<dyn ChatModel>, tools: Arc<dyn ToolSet>) -> Self {
        Self {
            name: profile.name.clone(),
            instructions: profile.instructions.clone(),
            runner: Runner::new(model, tools).with_max_turns(profile.max_turns),
        }
    }

    async fn run(&self, query: &str, hooks: &dyn RunHooks) -> Result<RunOutcome> {
        let mut messages = vec![
            ChatMessage::System(self.instructions.clone()),
            ChatMessage::User(query.to_string()),
        ];
        let outcome = self.runner.run(&mut messages, hooks).await?;
        info!(
            "Web agent finished after {} turn(s), {} tool call(s)",
            outcome.iterations,
            outcome.tool_calls.len()
        );
        Ok(outcome)
    }
}

/// Forwards tool activity into the event stream.
struct StreamHooks {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl RunHooks for StreamHooks {
    fn on_tool_start(&self, call: &ToolInvocation) {
        let _ = self.tx.unbounded_send(AgentEvent::ToolStart {
            tool: call.name.clone(),
            arguments: call.arguments.clone(),
        });
    }

    fn on_tool_end(&self, record: &ToolCallRecord) {
        let _ = self.tx.unbounded_send(AgentEvent::ToolEnd {
            tool: record.name.clone(),
            output: record.result.clone(),
        });
    }
}

#[async_trait]
impl Agent for WebAgent {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, query))]
    async fn invoke(&self, query: &str) -> Result<Reply> {
        let outcome = self.run(query, &super::runner::NoHooks).await?;
        Ok(Reply::Text(outcome.content))
    }

    fn invoke_stream<'a>(&'a self, query: &'a str) -> BoxStream<'a, AgentEvent> {
        let (tx, rx) = mpsc::unbounded();

        let driver = async move {
            let hooks = StreamHooks { tx };
            let _ = hooks.tx.unbounded_send(AgentEvent::AgentStart {
                agent: self.name.clone(),
            });
            let outcome = self.run(query, &hooks).await;
            let _ = hooks.tx.unbounded_send(AgentEvent::AgentEnd {
                agent: self.name.clone(),
            });
            let terminal = match outcome {
                Ok(outcome) => AgentEvent::Response(outcome.content),
                Err(e) => AgentEvent::Error(e.to_string()),
            };
            let _ = hooks.tx.unbounded_send(terminal);
        };

        // The driver yields nothing itself; it only has to be polled while
        // the receiver drains. The receiver ends once the driver drops `tx`.
        let driver = stream::once(driver).filter_map(|()| future::ready(None::<AgentEvent>));
        stream::select(rx, driver).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{ScriptedModel, StaticTools};

    fn profile(max_turns: usize) -> AgentProfile {
        AgentProfile {
            max_turns,
            ..AgentProfile::default_web()
        }
    }

    #[tokio::test]
    async fn test_stream_event_order() {
        let model = Arc::new(
            ScriptedModel::new()
                .tool_call("web_search", r#"{"query":"news"}"#)
                .answer("Today's news."),
        );
        let tools = Arc::new(StaticTools::new(&[("web_search", "headlines")]));
        let agent = WebAgent::new(&profile(3), model, tools);

        let events: Vec<AgentEvent> = agent.invoke_stream("news?").collect().await;
        assert!(matches!(events[0], AgentEvent::AgentStart { .. }));
        assert!(matches!(events[1], AgentEvent::ToolStart { ref tool, .. } if tool == "web_search"));
        assert!(matches!(events[2], AgentEvent::ToolEnd { ref output, .. } if output == "headlines"));
        assert!(matches!(events[3], AgentEvent::AgentEnd { .. }));
        assert_eq!(events[4], AgentEvent::Response("Today's news.".to_string()));
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_turn_limit_ends_with_error_event() {
        let model = Arc::new(
            ScriptedModel::new()
                .tool_call("web_search", "{}")
                .tool_call("web_search", "{}")
                .tool_call("web_search", "{}")
                .answer("too late"),
        );
        let tools = Arc::new(StaticTools::new(&[("web_search", "results")]));
        let agent = WebAgent::new(&profile(3), model, tools);

        let events: Vec<AgentEvent> = agent.invoke_stream("loop").collect().await;
        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(events.last(), Some(AgentEvent::Error(msg)) if msg.contains("maximum turns (3)")));
    }

    #[tokio::test]
    async fn test_invoke_returns_text() {
        let model = Arc::new(ScriptedModel::new().answer("plain answer"));
        let agent = WebAgent::new(&profile(3), model, Arc::new(StaticTools::new(&[])));
        assert_eq!(
            agent.invoke("q").await.unwrap(),
            Reply::Text("plain answer".to_string())
        );
    }
}
