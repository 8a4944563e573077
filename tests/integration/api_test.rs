//! Integration tests for the HTTP surface.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use orchestrator_api::{AppState, build_router};
use orchestrator_core::AppResult;
use orchestrator_core::error::AppError;
use orchestrator_database::{JobStore, MemoryJobStore};
use orchestrator_entity::queue::{Delivery, QueueEntry, StreamStats};
use orchestrator_queue::WorkQueue;

#[tokio::test]
async fn test_status_right_after_submit_is_queued() {
    let app = helpers::TestApp::new().await;
    let job_id = app
        .submit(json!({ "agent_id": "echo", "payload": { "task": "x" } }))
        .await;

    let response = app.status(job_id).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["job_id"], job_id.to_string());
    assert_eq!(response.body["agent_id"], "echo");
    assert_eq!(response.body["status"], "QUEUED");
    assert!(response.body.get("result").is_none());
    assert!(response.body.get("error").is_none());
}

#[tokio::test]
async fn test_empty_agent_id_is_bad_request() {
    let app = helpers::TestApp::new().await;
    for agent_id in ["", "   "] {
        let response = app
            .request("POST", "/v1/run-agent", Some(json!({ "agent_id": agent_id })))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "agent_id {agent_id:?}");
        assert_eq!(response.body["error"], "VALIDATION_ERROR");
    }
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_non_object_payload_is_bad_request() {
    let app = helpers::TestApp::new().await;
    let response = app
        .request("POST", "/v1/run-agent", Some(json!({ "payload": "text" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.request("POST", "/v1/run-agent", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", "/v1/jobs/9f6c2f0e-3a43-4c7e-8d1a-0c0b7f2b7e11", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "job_id not found");

    let response = app.request("GET", "/v1/jobs/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "job_id not found");
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/healthz", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "ok": true }));

    let response = app.request("GET", "/readyz", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["database"], true);
    assert_eq!(response.body["queue"], true);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = helpers::TestApp::new().await;
    app.submit(json!({ "agent_id": "echo" })).await;
    app.submit(json!({ "agent_id": "echo" })).await;

    let response = app.request("GET", "/metrics", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.starts_with("text/plain"));
    assert!(response.content_type.contains("version=0.0.4"));

    let text = &response.text;
    assert!(text.contains("orchestrator_stream_length{stream=\"agent-jobs\"} 2"));
    assert!(text.contains("orchestrator_jobs{status=\"QUEUED\"} 2"));
    assert!(text.contains("orchestrator_jobs{status=\"FAILED\"} 0"));
    assert!(text.contains("orchestrator_stream_group_lag{"));
    assert!(text.contains("orchestrator_stream_group_pending{"));
}

/// Queue whose introspection always fails.
#[derive(Debug)]
struct BrokenQueue;

#[async_trait]
impl WorkQueue for BrokenQueue {
    fn stream_key(&self) -> &str {
        "agent-jobs"
    }

    fn consumer_group(&self) -> &str {
        "workers"
    }

    async fn append(&self, _entry: &QueueEntry) -> AppResult<String> {
        Err(AppError::queue("connection refused"))
    }

    async fn ensure_group(&self) -> AppResult<()> {
        Err(AppError::queue("connection refused"))
    }

    async fn read_next(&self, _consumer: &str, _block: Duration) -> AppResult<Option<Delivery>> {
        Err(AppError::queue("connection refused"))
    }

    async fn ack(&self, _entry_id: &str) -> AppResult<u64> {
        Err(AppError::queue("connection refused"))
    }

    async fn pending_count(&self, _consumer: &str) -> AppResult<u64> {
        Err(AppError::queue("connection refused"))
    }

    async fn stats(&self) -> AppResult<StreamStats> {
        Err(AppError::queue("connection refused"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_backend_failures() {
    let store = Arc::new(MemoryJobStore::new());
    let state = AppState::new(helpers::test_config(), store.clone(), Arc::new(BrokenQueue));
    let router = build_router(state);

    let get = |path: &str| {
        axum::http::Request::builder()
            .uri(path)
            .body(axum::body::Body::empty())
            .expect("request")
    };

    let response = helpers::send(&router, get("/metrics")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text.starts_with("exporter_error "));
    assert!(response.text.contains("connection refused"));

    let response = helpers::send(&router, get("/readyz")).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["queue"], false);

    let submit = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/run-agent")
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from(r#"{"agent_id":"echo"}"#))
        .expect("request");
    let response = helpers::send(&router, submit).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    // The record was written before the append failed and stays QUEUED.
    assert_eq!(store.count_by_status().await.unwrap().queued, 1);
}
