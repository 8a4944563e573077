//! Shared test helpers for integration tests.
//!
//! Every test runs against the in-memory store and queue, so no external
//! services are needed.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use orchestrator_api::{AppState, build_router};
use orchestrator_core::JobId;
use orchestrator_core::config::AppConfig;
use orchestrator_database::MemoryJobStore;
use orchestrator_queue::WorkQueue;
use orchestrator_queue::memory::MemoryStreamQueue;
use orchestrator_worker::runners::build_registry;
use orchestrator_worker::{AgentRunner, RunContext, RunnerError, RunnerRegistry, WorkerRunner};

/// Consumer identity used by the test worker.
pub const CONSUMER: &str = "worker-test";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Job store shared with the router
    pub store: Arc<MemoryJobStore>,
    /// Queue shared with the router
    pub queue: Arc<MemoryStreamQueue>,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application with its consumer group in place
    pub async fn new() -> Self {
        let config = test_config();
        Self::with_queue(config, Arc::new(MemoryStreamQueue::new("agent-jobs", "workers", 1000)))
            .await
    }

    /// Create a test application over a specific queue
    pub async fn with_queue(config: AppConfig, queue: Arc<MemoryStreamQueue>) -> Self {
        queue.ensure_group().await.expect("Failed to create group");

        let store = Arc::new(MemoryJobStore::new());
        let state = AppState::new(config.clone(), store.clone(), queue.clone());

        Self {
            router: build_router(state),
            store,
            queue,
            config,
        }
    }

    /// Execution loop over this app's store and queue with the test runners
    /// plus the built-in ones.
    pub fn worker(&self) -> WorkerRunner {
        let mut registry = build_registry(&self.config.runners).expect("Failed to build registry");
        registry
            .register(Arc::new(StaticRunner("echo", json!({ "ok": true }))))
            .expect("register echo");
        registry
            .register(Arc::new(FailingRunner))
            .expect("register boom");

        self.worker_with(registry)
    }

    /// Execution loop with a specific registry
    pub fn worker_with(&self, registry: RunnerRegistry) -> WorkerRunner {
        let mut worker_config = self.config.worker.clone();
        worker_config.consumer_name = CONSUMER.to_string();
        WorkerRunner::new(
            self.store.clone(),
            self.queue.clone(),
            Arc::new(registry),
            worker_config,
        )
    }

    /// Submit through the HTTP surface and return the job id
    pub async fn submit(&self, body: Value) -> JobId {
        let response = self.request("POST", "/v1/run-agent", Some(body)).await;
        assert_eq!(response.status, StatusCode::OK, "submit failed: {}", response.text);
        response.body["job_id"]
            .as_str()
            .expect("job_id in response")
            .parse()
            .expect("job_id is a UUID")
    }

    /// Fetch a job's status document
    pub async fn status(&self, job_id: JobId) -> TestResponse {
        self.request("GET", &format!("/v1/jobs/{job_id}"), None).await
    }

    /// Make a request to the router
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        send(&self.router, req).await
    }
}

/// Send a prepared request to a router
pub async fn send(router: &Router, req: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("Failed to read body");

    let text = String::from_utf8_lossy(&body_bytes).to_string();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        content_type,
        body,
        text,
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: String,
    /// Parsed JSON body (`Null` when not JSON)
    pub body: Value,
    /// Raw body
    pub text: String,
}

/// Configuration for tests: in-memory backends and a short poll.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.provider = "memory".to_string();
    config.queue.provider = "memory".to_string();
    config.worker.block_timeout_ms = 50;
    config.worker.error_backoff_ms = 10;
    config.runners.load_test.min_sleep_ms = 1;
    config.runners.load_test.max_sleep_ms = 5;
    config
}

/// Poll until `check` holds or the deadline passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Runner that always returns the same value
#[derive(Debug)]
pub struct StaticRunner(pub &'static str, pub Value);

#[async_trait]
impl AgentRunner for StaticRunner {
    fn agent_id(&self) -> &str {
        self.0
    }

    async fn execute(&self, _payload: &Value, _ctx: &RunContext) -> Result<Value, RunnerError> {
        Ok(self.1.clone())
    }
}

/// Runner that always fails
#[derive(Debug)]
pub struct FailingRunner;

#[async_trait]
impl AgentRunner for FailingRunner {
    fn agent_id(&self) -> &str {
        "boom"
    }

    async fn execute(&self, _payload: &Value, _ctx: &RunContext) -> Result<Value, RunnerError> {
        Err(RunnerError::Failed("agent exploded".to_string()))
    }
}
