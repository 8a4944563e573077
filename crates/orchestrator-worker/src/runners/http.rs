//! Runners that delegate execution to an HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use orchestrator_core::config::HttpRunnerConfig;
use orchestrator_core::error::{AppError, ErrorKind};
use orchestrator_core::AppResult;

use crate::registry::{AgentRunner, RunContext, RunnerError};

/// Posts `{payload, context}` to a configured URL and returns the response body.
#[derive(Debug, Clone)]
pub struct HttpRunner {
    agent_id: String,
    url: String,
    client: reqwest::Client,
}

impl HttpRunner {
    /// Create a runner from configuration.
    pub fn new(config: &HttpRunnerConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build HTTP client for agent '{}'", config.agent_id),
                    e,
                )
            })?;

        Ok(Self {
            agent_id: config.agent_id.clone(),
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl AgentRunner for HttpRunner {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn execute(&self, payload: &Value, ctx: &RunContext) -> Result<Value, RunnerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "payload": payload, "context": ctx }))
            .send()
            .await
            .map_err(|e| RunnerError::upstream(format!("request to {} failed", self.url), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(512).collect();
            return Err(RunnerError::Failed(format!(
                "agent endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RunnerError::upstream("agent endpoint returned invalid JSON", e))
    }
}
