//! Calculator agent. Unimplemented: every question gets the same placeholder.

use super::{Agent, Reply};
use crate::error::Result;
use async_trait::async_trait;

pub const CALCULATOR_PLACEHOLDER: &str = "I did not do anything";

#[derive(Debug, Default)]
pub struct CalculatorAgent;

impl CalculatorAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for CalculatorAgent {
    fn name(&self) -> &str {
        "Calculator Agent"
    }

    async fn invoke(&self, _query: &str) -> Result<Reply> {
        Ok(Reply::NotImplemented {
            placeholder: CALCULATOR_PLACEHOLDER.to_string(),
        })
    }
}
