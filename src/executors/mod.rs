//! Agent executors: adapt A2A requests into agent calls.

pub mod calculator;
pub mod rag;
pub mod web;

pub use calculator::CalculatorExecutor;
pub use rag::RagExecutor;
pub use web::WebExecutor;

use crate::a2a::{AgentCard, AgentSkill, RequestContext, TaskUpdater};
use crate::config::AgentServerSettings;
use crate::error::{RelayError, Result};
use clap::ValueEnum;
use std::fmt;
use tracing::{debug, info, warn};

pub const CANCEL_NOT_SUPPORTED: &str = "Cancel not supported";

/// The agents this crate can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    Calculator,
    Rag,
    Web,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Calculator => write!(f, "calculator"),
            AgentKind::Rag => write!(f, "rag"),
            AgentKind::Web => write!(f, "web"),
        }
    }
}

impl AgentKind {
    /// Port the agent listens on, unless INTERNAL_PORT overrides it.
    pub fn port(self, settings: &AgentServerSettings) -> u16 {
        settings.internal_port.unwrap_or(match self {
            AgentKind::Calculator => settings.calculator_port,
            AgentKind::Rag => settings.rag_port,
            AgentKind::Web => settings.web_port,
        })
    }

    /// The card this agent publishes at `url`.
    pub fn card(self, url: &str) -> AgentCard {
        match self {
            AgentKind::Calculator => AgentCard::new(
                "Calculator Agent",
                "A simple agent that calculates the result of a mathematical expression",
                url,
            )
            .with_streaming(true)
            .with_skill(skill(
                "calculator",
                "Calculator",
                "Calculate the result of a mathematical expression",
                &["calculator", "math", "expression"],
                "What is 2 + 2?",
            )),
            AgentKind::Rag => AgentCard::new(
                "RAG Agent",
                "Answers questions about Contoso projects from the project knowledge base",
                url,
            )
            .with_skill(skill(
                "rag",
                "Project knowledge",
                "Answer questions about Contoso projects and events",
                &["rag", "projects", "knowledge"],
                "What is Astro Events?",
            )),
            AgentKind::Web => AgentCard::new(
                "Web Search Agent",
                "A simple agent that searches the web for information",
                url,
            )
            .with_streaming(true)
            .with_skill(skill(
                "web_search",
                "Web Search",
                "Search the web for information",
                &["web", "search", "information"],
                "What happened in the world last week?",
            )),
        }
    }
}

fn skill(id: &str, name: &str, description: &str, tags: &[&str], example: &str) -> AgentSkill {
    AgentSkill {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        examples: vec![example.to_string()],
    }
}

/// URL advertised on a card: base URL plus port, with a trailing slash.
pub fn card_url(base_url: &str, port: u16) -> String {
    format!("{}:{}/", base_url.trim_end_matches('/'), port)
}

/// Common preamble of task-based executors.
///
/// Validates the context, submits the task when it is new and moves it to
/// `working`. Returns the user's query.
pub(crate) fn begin(context: &RequestContext, updater: &TaskUpdater) -> Result<String> {
    let message = context.validate()?;
    info!(
        "Task ID: {}, Context ID: {}",
        context.task_id, context.context_id
    );

    if context.current_task.is_none() {
        debug!("Submitting new task");
        updater.submit(message.clone())?;
    }
    updater.start_work()?;

    let query = context.user_input();
    info!("User query: {}", query);
    Ok(query)
}

pub(crate) fn cancel_not_supported(agent: &str) -> RelayError {
    warn!("Cancel not supported for {}", agent);
    RelayError::Unsupported(CANCEL_NOT_SUPPORTED.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::a2a::events::{channel, EventReceiver};
    use crate::a2a::{Event, Message};

    /// A context for a brand new task plus an updater wired to a receiver.
    pub(crate) fn new_task(text: &str) -> (RequestContext, TaskUpdater, EventReceiver) {
        let (queue, receiver) = channel();
        let context = RequestContext {
            task_id: "task-1".to_string(),
            context_id: "ctx-1".to_string(),
            message: Some(Message::user_text(text)),
            current_task: None,
        };
        let updater = TaskUpdater::new(queue, &context.task_id, &context.context_id);
        (context, updater, receiver)
    }

    pub(crate) async fn drain(receiver: &mut EventReceiver) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = receiver.next().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_ports_and_urls() {
        let mut settings = AgentServerSettings::default();
        assert_eq!(AgentKind::Rag.port(&settings), 9998);
        settings.internal_port = Some(80);
        assert_eq!(AgentKind::Web.port(&settings), 80);
        assert_eq!(card_url("http://localhost/", 9999), "http://localhost:9999/");
    }

    #[test]
    fn test_cards() {
        let card = AgentKind::Web.card("http://localhost:9999/");
        assert_eq!(card.name, "Web Search Agent");
        assert!(card.capabilities.streaming);
        assert_eq!(card.skills[0].id, "web_search");
        assert!(!AgentKind::Rag.card("http://x/").capabilities.streaming);
    }

    #[tokio::test]
    async fn test_begin_skips_submit_for_known_task() {
        let (mut context, updater, mut receiver) = new_task("again");
        context.current_task = Some(crate::a2a::Task::submitted(
            "task-1",
            "ctx-1",
            Message::user_text("first"),
        ));
        assert_eq!(begin(&context, &updater).unwrap(), "again");
        drop(updater);

        let events = drain(&mut receiver).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::StatusUpdate(_)));
    }
}
