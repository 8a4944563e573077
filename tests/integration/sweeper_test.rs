//! Integration tests for the reconciliation sweeper against the HTTP view.

mod helpers;

use std::time::Duration as StdDuration;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use orchestrator_database::JobStore;
use orchestrator_entity::job::{Job, JobStatus, NewJob};
use orchestrator_queue::WorkQueue;
use orchestrator_worker::Sweeper;

fn sweeper(app: &helpers::TestApp) -> Sweeper {
    Sweeper::new(app.store.clone(), app.config.sweeper.clone())
}

#[tokio::test]
async fn test_orphaned_queued_job_expires() {
    let app = helpers::TestApp::new().await;

    // A record whose queue append never happened.
    let job = Job::queued(
        &NewJob::new("echo", json!({})),
        Utc::now() - Duration::hours(25),
    );
    assert_eq!(job.status, JobStatus::Queued);
    let job_id = job.job_id;
    app.store.put(job).await;

    let report = sweeper(&app).run_once().await.expect("sweep");
    assert_eq!(report.expired, vec![job_id]);

    let body = app.status(job_id).await.body;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["error"]["reason"], "expired");
}

#[tokio::test]
async fn test_crashed_job_times_out_but_entry_stays_pending() {
    let app = helpers::TestApp::new().await;
    let job_id = app.submit(json!({ "agent_id": "echo" })).await;

    // Simulate a crash between the RUNNING write and the acknowledgement.
    let delivery = app
        .queue
        .read_next(helpers::CONSUMER, StdDuration::from_millis(50))
        .await
        .expect("read")
        .expect("delivered");
    assert_eq!(delivery.job_id().expect("job id"), job_id);
    assert!(app.store.mark_running(job_id).await.expect("mark running"));

    let sweeper = sweeper(&app);
    assert!(sweeper.run_once().await.expect("sweep").timed_out.is_empty());

    let later = Utc::now() + Duration::seconds(1801);
    let report = sweeper.run_at(later).await.expect("sweep");
    assert_eq!(report.timed_out, vec![job_id]);

    let body = app.status(job_id).await.body;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["error"]["reason"], "timeout");

    // Idempotent, and the queue side is never touched.
    assert!(sweeper.run_at(later).await.expect("sweep").timed_out.is_empty());
    assert_eq!(app.queue.pending_count(helpers::CONSUMER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_finished_jobs_are_purged_after_retention() {
    let app = helpers::TestApp::new().await;
    let worker = app.worker();
    let job_id = app.submit(json!({ "agent_id": "echo" })).await;
    worker.poll_once().await.expect("poll");
    assert_eq!(app.status(job_id).await.body["status"], "SUCCEEDED");

    let sweeper = sweeper(&app);
    assert_eq!(sweeper.run_once().await.expect("sweep").deleted, 0);

    let report = sweeper
        .run_at(Utc::now() + Duration::days(8))
        .await
        .expect("sweep");
    assert_eq!(report.deleted, 1);
    assert_eq!(app.status(job_id).await.status, StatusCode::NOT_FOUND);
}
