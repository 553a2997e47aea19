//! Web executor: relays the web agent's progress as working updates.

use super::{begin, cancel_not_supported};
use crate::a2a::{AgentExecutor, Part, RequestContext, TaskState, TaskUpdater};
use crate::agent::{Agent, AgentEvent, WebAgent};
use crate::error::Result;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error, info, instrument};

/// Name of the artifact holding the answer.
pub const WEB_RESULT_ARTIFACT: &str = "web_result";

pub struct WebExecutor {
    agent: WebAgent,
}

impl WebExecutor {
    pub fn new(agent: WebAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl AgentExecutor for WebExecutor {
    #[instrument(skip_all, fields(task_id = %context.task_id))]
    async fn execute(&self, context: RequestContext, updater: &TaskUpdater) -> Result<()> {
        let query = begin(&context, updater)?;

        let mut events = self.agent.invoke_stream(&query);
        while let Some(event) = events.next().await {
            match event {
                AgentEvent::Response(text) => {
                    info!("Web agent answered ({} characters)", text.len());
                    updater.add_artifact(vec![Part::text(text)], Some(WEB_RESULT_ARTIFACT))?;
                    return updater.complete();
                }
                AgentEvent::Error(e) => {
                    error!("Error invoking web agent: {}", e);
                    return updater.failed(&e);
                }
                progress => {
                    debug!("{}", progress);
                    updater.update_status(
                        TaskState::Working,
                        Some(updater.agent_message(&progress.message())),
                    )?;
                }
            }
        }
        // The server fails the task if the stream ended without an answer.
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, _updater: &TaskUpdater) -> Result<()> {
        Err(cancel_not_supported(self.agent.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::Event;
    use crate::agent::testing::{ScriptedModel, StaticTools};
    use crate::config::AgentProfile;
    use crate::executors::tests::{drain, new_task};
    use crate::executors::CANCEL_NOT_SUPPORTED;
    use std::sync::Arc;

    fn executor(model: ScriptedModel) -> WebExecutor {
        let tools = Arc::new(StaticTools::new(&[("web_search", "headlines")]));
        WebExecutor::new(WebAgent::new(&AgentProfile::default_web(), Arc::new(model), tools))
    }

    #[tokio::test]
    async fn test_progress_then_named_artifact() {
        let executor = executor(
            ScriptedModel::new()
                .tool_call("web_search", r#"{"query":"news"}"#)
                .answer("The news."),
        );
        let (context, updater, mut receiver) = new_task("news?");
        executor.execute(context, &updater).await.unwrap();
        let events = drain(&mut receiver).await;

        let progress: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                Event::StatusUpdate(u) if u.status.state == TaskState::Working => {
                    u.status.message.as_ref().map(|m| m.text())
                }
                _ => None,
            })
            .collect();
        // start_work carries no message; four agent events do.
        assert_eq!(progress.len(), 4);
        assert_eq!(progress[1], "Tool 'web_search' is starting");

        let artifact = events.iter().find_map(|e| match e {
            Event::ArtifactUpdate(u) => Some(&u.artifact),
            _ => None,
        });
        let artifact = artifact.unwrap();
        assert_eq!(artifact.name.as_deref(), Some(WEB_RESULT_ARTIFACT));
        assert_eq!(artifact.parts[0].as_text(), Some("The news."));
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_agent_error_fails_task() {
        let executor = executor(ScriptedModel::new());
        let (context, updater, mut receiver) = new_task("news?");
        executor.execute(context, &updater).await.unwrap();
        let events = drain(&mut receiver).await;

        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(terminal[0], Event::StatusUpdate(u) if u.status.state == TaskState::Failed));
    }

    #[tokio::test]
    async fn test_cancel_fails() {
        let executor = executor(ScriptedModel::new());
        let (context, updater, _receiver) = new_task("x");
        let err = executor.cancel(context, &updater).await.unwrap_err();
        assert_eq!(err.to_string(), CANCEL_NOT_SUPPORTED);
    }
}
