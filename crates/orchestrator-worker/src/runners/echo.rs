//! `sample-echo`: returns its payload.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::registry::{AgentRunner, RunContext, RunnerError};

/// Agent id of the echo runner.
pub const ECHO_AGENT_ID: &str = "sample-echo";

/// Runner that echoes the payload back as its result.
#[derive(Debug, Default)]
pub struct EchoRunner;

impl EchoRunner {
    /// Create the runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentRunner for EchoRunner {
    fn agent_id(&self) -> &str {
        ECHO_AGENT_ID
    }

    async fn execute(&self, payload: &Value, ctx: &RunContext) -> Result<Value, RunnerError> {
        Ok(json!({
            "ok": true,
            "agent_id": ctx.agent_id,
            "echo": payload,
        }))
    }
}
