//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// `POST /v1/run-agent` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RunAgentRequest {
    /// Runner selector. Falls back to the configured default when absent.
    #[validate(length(min = 1, message = "agent_id must not be empty"))]
    pub agent_id: Option<String>,
    /// Runner input. `task` is accepted as an alias.
    #[serde(default, alias = "task")]
    pub payload: Map<String, Value>,
}

impl RunAgentRequest {
    /// The agent to run, or `default_agent_id` when none was given.
    pub fn agent_id_or<'a>(&'a self, default_agent_id: &'a str) -> &'a str {
        self.agent_id.as_deref().unwrap_or(default_agent_id)
    }
}
