//! End-to-end tests: HTTP submission, the execution loop, and status reads.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use tokio::sync::watch;

use orchestrator_entity::job::FailureReason;
use orchestrator_queue::WorkQueue;
use orchestrator_worker::JobOutcome;

#[tokio::test]
async fn test_round_trip_succeeds() {
    let app = helpers::TestApp::new().await;
    let worker = app.worker();

    let job_id = app
        .submit(json!({ "agent_id": "echo", "payload": { "task": "x" } }))
        .await;

    let outcome = worker.poll_once().await.expect("poll");
    assert_eq!(outcome, JobOutcome::Succeeded { job_id });

    let response = app.status(job_id).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "SUCCEEDED");
    assert_eq!(response.body["result"], json!({ "ok": true }));
    assert!(response.body.get("error").is_none());
}

#[tokio::test]
async fn test_default_agent_echoes_task() {
    let app = helpers::TestApp::new().await;
    let worker = app.worker();

    let job_id = app.submit(json!({ "task": { "prompt": "hello" } })).await;
    worker.poll_once().await.expect("poll");

    let response = app.status(job_id).await;
    assert_eq!(response.body["agent_id"], "sample-echo");
    assert_eq!(response.body["status"], "SUCCEEDED");
    assert_eq!(response.body["result"]["echo"], json!({ "prompt": "hello" }));
}

#[tokio::test]
async fn test_failure_is_isolated_and_acknowledged() {
    let app = helpers::TestApp::new().await;
    let worker = app.worker();

    let failing = app.submit(json!({ "agent_id": "boom" })).await;
    let healthy = app.submit(json!({ "agent_id": "echo" })).await;

    assert_eq!(
        worker.poll_once().await.expect("poll"),
        JobOutcome::Failed {
            job_id: failing,
            reason: FailureReason::RunnerError,
        }
    );
    assert_eq!(
        app.queue.pending_count(helpers::CONSUMER).await.unwrap(),
        0
    );
    assert_eq!(
        worker.poll_once().await.expect("poll"),
        JobOutcome::Succeeded { job_id: healthy }
    );

    let failed = app.status(failing).await.body;
    assert_eq!(failed["status"], "FAILED");
    assert_eq!(failed["error"]["reason"], "runner_error");
    assert_eq!(failed["error"]["message"], "agent exploded");
    assert!(failed["error"]["trace"].is_string());
    assert!(failed.get("result").is_none());

    assert_eq!(app.status(healthy).await.body["status"], "SUCCEEDED");
    assert_eq!(
        app.queue.pending_count(helpers::CONSUMER).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_unknown_agent_fails_the_job() {
    let app = helpers::TestApp::new().await;
    let worker = app.worker();

    let job_id = app.submit(json!({ "agent_id": "nobody" })).await;
    worker.poll_once().await.expect("poll");

    let body = app.status(job_id).await.body;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["error"]["reason"], "unknown_agent");
}

#[tokio::test]
async fn test_run_loop_processes_in_order_and_stops_on_shutdown() {
    let app = helpers::TestApp::new().await;
    let worker = app.worker();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let mut job_ids = Vec::new();
    for i in 0..5 {
        let agent_id = if i % 2 == 0 { "echo" } else { "load-test" };
        job_ids.push(app.submit(json!({ "agent_id": agent_id })).await);
    }

    let done = helpers::eventually(|| {
        let app = &app;
        let job_ids = &job_ids;
        async move {
            for job_id in job_ids {
                if app.status(*job_id).await.body["status"] != "SUCCEEDED" {
                    return false;
                }
            }
            true
        }
    })
    .await;
    assert!(done, "all jobs should succeed");

    // Every terminal job carries exactly one of result / error.
    for job_id in &job_ids {
        let body = app.status(*job_id).await.body;
        assert!(body.get("result").is_some() != body.get("error").is_some());
    }

    shutdown_tx.send(true).expect("send shutdown");
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("loop stops")
        .expect("task joins");
    assert!(result.is_ok());
    assert_eq!(app.queue.stats().await.unwrap().pending, 0);
}
