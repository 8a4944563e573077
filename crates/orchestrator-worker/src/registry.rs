//! Runner registry: dispatches jobs to the runner registered for their `agent_id`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use orchestrator_core::error::AppError;
use orchestrator_core::{AppResult, JobId};
use orchestrator_entity::job::FailureReason;

/// Context handed to a runner next to the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunContext {
    /// Job being executed.
    pub job_id: JobId,
    /// Runner selector the job was submitted with.
    pub agent_id: String,
    /// Set when the queued payload failed to decode and `{}` was substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_decode_error: Option<String>,
}

/// Trait for task runner implementations.
#[async_trait]
pub trait AgentRunner: Send + Sync + std::fmt::Debug {
    /// The `agent_id` this runner handles.
    fn agent_id(&self) -> &str;

    /// Execute a job. The result must be a JSON object.
    async fn execute(&self, payload: &Value, ctx: &RunContext) -> Result<Value, RunnerError>;
}

/// Error from runner execution.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The runner reported a failure.
    #[error("{0}")]
    Failed(String),

    /// No runner is registered for the agent.
    #[error("no runner registered for agent '{0}'")]
    UnknownAgent(String),

    /// The runner returned a non-object value.
    #[error("runner returned {0}, expected a JSON object")]
    InvalidResult(&'static str),

    /// The runner panicked.
    #[error("runner panicked: {0}")]
    Panicked(String),

    /// A dependency of the runner failed.
    #[error("{message}")]
    Upstream {
        /// What the runner was doing.
        message: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RunnerError {
    /// Wrap a dependency error.
    pub fn upstream(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Failure reason recorded on the job.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Failed(_) | Self::Upstream { .. } => FailureReason::RunnerError,
            Self::UnknownAgent(_) => FailureReason::UnknownAgent,
            Self::InvalidResult(_) => FailureReason::InvalidResult,
            Self::Panicked(_) => FailureReason::RunnerPanic,
        }
    }
}

/// Static mapping from `agent_id` to runner, built once at startup.
#[derive(Debug, Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn AgentRunner>>,
}

impl RunnerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runner. Each `agent_id` may be registered once.
    pub fn register(&mut self, runner: Arc<dyn AgentRunner>) -> AppResult<()> {
        let agent_id = runner.agent_id().to_string();
        if agent_id.trim().is_empty() {
            return Err(AppError::configuration("Runner agent_id must not be empty"));
        }
        if self.runners.contains_key(&agent_id) {
            return Err(AppError::conflict(format!(
                "A runner is already registered for agent '{agent_id}'"
            )));
        }
        tracing::info!(agent_id = %agent_id, "Registered runner");
        self.runners.insert(agent_id, runner);
        Ok(())
    }

    /// Registered agent ids, sorted.
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runners.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Resolve the runner and execute it, turning panics and non-object
    /// results into errors.
    pub async fn execute(
        &self,
        agent_id: &str,
        payload: &Value,
        ctx: &RunContext,
    ) -> Result<Value, RunnerError> {
        let runner = self
            .runners
            .get(agent_id)
            .ok_or_else(|| RunnerError::UnknownAgent(agent_id.to_string()))?;

        let result = AssertUnwindSafe(runner.execute(payload, ctx))
            .catch_unwind()
            .await
            .map_err(|panic| RunnerError::Panicked(panic_message(panic.as_ref())))??;

        match result {
            Value::Object(_) => Ok(result),
            Value::Null => Err(RunnerError::InvalidResult("null")),
            Value::Bool(_) => Err(RunnerError::InvalidResult("a boolean")),
            Value::Number(_) => Err(RunnerError::InvalidResult("a number")),
            Value::String(_) => Err(RunnerError::InvalidResult("a string")),
            Value::Array(_) => Err(RunnerError::InvalidResult("an array")),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct Fixed(&'static str, Value);

    #[async_trait]
    impl AgentRunner for Fixed {
        fn agent_id(&self) -> &str {
            self.0
        }

        async fn execute(&self, _payload: &Value, _ctx: &RunContext) -> Result<Value, RunnerError> {
            Ok(self.1.clone())
        }
    }

    #[derive(Debug)]
    struct Panics;

    #[async_trait]
    impl AgentRunner for Panics {
        fn agent_id(&self) -> &str {
            "panics"
        }

        async fn execute(&self, _payload: &Value, _ctx: &RunContext) -> Result<Value, RunnerError> {
            panic!("runner blew up");
        }
    }

    fn ctx(agent_id: &str) -> RunContext {
        RunContext {
            job_id: JobId::new(),
            agent_id: agent_id.to_string(),
            payload_decode_error: None,
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = RunnerRegistry::new();
        registry
            .register(Arc::new(Fixed("echo", json!({}))))
            .expect("first registration");
        let err = registry
            .register(Arc::new(Fixed("echo", json!({}))))
            .unwrap_err();
        assert!(err.message.contains("already registered"));
        assert_eq!(registry.agent_ids(), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let registry = RunnerRegistry::new();
        let err = registry
            .execute("missing", &json!({}), &ctx("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), FailureReason::UnknownAgent);
    }

    #[tokio::test]
    async fn test_non_object_result_is_invalid() {
        let mut registry = RunnerRegistry::new();
        registry.register(Arc::new(Fixed("list", json!([1, 2])))).unwrap();
        let err = registry
            .execute("list", &json!({}), &ctx("list"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), FailureReason::InvalidResult);
        assert_eq!(err.to_string(), "runner returned an array, expected a JSON object");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut registry = RunnerRegistry::new();
        registry.register(Arc::new(Panics)).unwrap();
        let err = registry
            .execute("panics", &json!({}), &ctx("panics"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), FailureReason::RunnerPanic);
        assert!(err.to_string().contains("runner blew up"));
    }
}
