//! Job entity model.

use chrono::{DateTime, Utc};
use orchestrator_core::JobId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::error::{FailureReason, JobError};
use super::status::JobStatus;

/// A job record, the source of truth for a job's outcome.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier, shared with the job's queue entry.
    pub job_id: JobId,
    /// Selects which runner executes the job.
    pub agent_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Opaque payload passed to the runner.
    pub payload: serde_json::Value,
    /// Runner result, present only when SUCCEEDED.
    pub result: Option<serde_json::Value>,
    /// Structured failure, present only when FAILED.
    pub error: Option<serde_json::Value>,
    /// When the gateway accepted the job.
    pub created_at: DateTime<Utc>,
    /// When the execution loop last moved the job to RUNNING.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh QUEUED record from a submission.
    pub fn queued(new: &NewJob, now: DateTime<Utc>) -> Self {
        Self {
            job_id: new.job_id,
            agent_id: new.agent_id.clone(),
            status: JobStatus::Queued,
            payload: new.payload.clone(),
            result: None,
            error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
            updated_at: now,
        }
    }

    /// The failure reason recorded on a FAILED job, if it parses.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.error
            .as_ref()
            .and_then(|e| serde_json::from_value::<JobError>(e.clone()).ok())
            .map(|e| e.reason)
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Identifier generated by the gateway.
    pub job_id: JobId,
    /// Target runner.
    pub agent_id: String,
    /// Runner payload.
    pub payload: serde_json::Value,
}

impl NewJob {
    /// Create a submission with a freshly generated identifier.
    pub fn new(agent_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            job_id: JobId::new(),
            agent_id: agent_id.into(),
            payload,
        }
    }
}

/// The caller-facing projection of a job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    /// Job identifier.
    pub job_id: JobId,
    /// Target runner.
    pub agent_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Runner result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Structured failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl From<Job> for JobStatusView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            agent_id: job.agent_id,
            status: job.status,
            result: job.result,
            error: job.error,
        }
    }
}
