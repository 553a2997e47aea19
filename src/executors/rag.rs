//! RAG executor: one question in, one text artifact out.

use super::{begin, cancel_not_supported};
use crate::a2a::{AgentExecutor, Part, RequestContext, TaskUpdater};
use crate::agent::{Agent, RagAgent};
use crate::error::Result;
use async_trait::async_trait;
use tracing::{error, info, instrument};

pub struct RagExecutor {
    agent: RagAgent,
}

impl RagExecutor {
    pub fn new(agent: RagAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl AgentExecutor for RagExecutor {
    #[instrument(skip_all, fields(task_id = %context.task_id))]
    async fn execute(&self, context: RequestContext, updater: &TaskUpdater) -> Result<()> {
        let query = begin(&context, updater)?;

        match self.agent.invoke(&query).await {
            Ok(reply) => {
                info!("RAG agent answered");
                updater.add_artifact(vec![Part::text(reply.text())], None)?;
                updater.complete()
            }
            Err(e) => {
                error!("Error invoking RAG agent: {}", e);
                updater.failed(&e.to_string())
            }
        }
    }

    async fn cancel(&self, _context: RequestContext, _updater: &TaskUpdater) -> Result<()> {
        Err(cancel_not_supported(self.agent.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::{Event, TaskState};
    use crate::agent::testing::FakeThreadBackend;
    use crate::executors::tests::{drain, new_task};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_answer_becomes_artifact() {
        let backend = Arc::new(FakeThreadBackend::answering("Astro Events is a space fair."));
        let executor = RagExecutor::new(RagAgent::new(backend, "asst_1"));
        let (context, updater, mut receiver) = new_task("What is Astro Events?");

        executor.execute(context, &updater).await.unwrap();
        let events = drain(&mut receiver).await;

        assert!(matches!(events[0], Event::Task(_)));
        assert!(matches!(&events[1], Event::StatusUpdate(u) if u.status.state == TaskState::Working));
        match &events[2] {
            Event::ArtifactUpdate(update) => assert_eq!(
                update.artifact.parts[0].as_text(),
                Some("Astro Events is a space fair.")
            ),
            other => panic!("Expected artifact, got {:?}", other),
        }
        assert!(matches!(&events[3], Event::StatusUpdate(u) if u.status.state == TaskState::Completed));
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_backend_failure_fails_task() {
        let backend = Arc::new(FakeThreadBackend::failing("server_error", "boom"));
        let executor = RagExecutor::new(RagAgent::new(backend, "asst_1"));
        let (context, updater, mut receiver) = new_task("anything");

        executor.execute(context, &updater).await.unwrap();
        let events = drain(&mut receiver).await;

        match events.last() {
            Some(Event::StatusUpdate(update)) => {
                assert_eq!(update.status.state, TaskState::Failed);
                let text = update.status.message.as_ref().unwrap().text();
                assert!(text.contains("Run failed: server_error: boom"));
            }
            other => panic!("Expected failed status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_message_is_rejected() {
        let backend = Arc::new(FakeThreadBackend::silent());
        let executor = RagExecutor::new(RagAgent::new(backend.clone(), "asst_1"));
        let (mut context, updater, _receiver) = new_task("x");
        context.message = None;

        assert!(executor.execute(context, &updater).await.is_err());
        assert_eq!(backend.threads_created(), 0);
    }
}
