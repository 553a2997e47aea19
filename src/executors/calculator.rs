//! Calculator executor: answers with a single direct message.

use super::cancel_not_supported;
use crate::a2a::{AgentExecutor, RequestContext, TaskUpdater};
use crate::agent::{Agent, CalculatorAgent};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Default)]
pub struct CalculatorExecutor {
    agent: CalculatorAgent,
}

impl CalculatorExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentExecutor for CalculatorExecutor {
    async fn execute(&self, context: RequestContext, updater: &TaskUpdater) -> Result<()> {
        let query = context.user_input();
        info!("Calculator query: {}", query);

        let reply = self.agent.invoke(&query).await?;
        updater.reply(reply.text())
    }

    async fn cancel(&self, _context: RequestContext, _updater: &TaskUpdater) -> Result<()> {
        Err(cancel_not_supported(self.agent.name()))
    }
}
