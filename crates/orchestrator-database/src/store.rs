//! The job store seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orchestrator_core::{AppResult, JobId};
use orchestrator_entity::job::{Job, JobError, JobStatus, NewJob};

/// Durable storage for job records and their status machine.
///
/// Every write is a single conditional statement: the status predicate is
/// checked in the same operation that changes the row, so concurrent writers
/// never observe a half-applied transition. Writes that set `result` clear
/// `error` and vice versa.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a QUEUED record for a new submission.
    async fn insert_queued(&self, job: &NewJob) -> AppResult<Job>;

    /// Fetch a record by id.
    async fn find_by_id(&self, job_id: JobId) -> AppResult<Option<Job>>;

    /// Move a job to RUNNING whatever its current status, clearing any
    /// previous outcome. Returns `false` when the record does not exist.
    async fn mark_running(&self, job_id: JobId) -> AppResult<bool>;

    /// Move a job to RUNNING only if it is currently QUEUED.
    async fn mark_running_if_queued(&self, job_id: JobId) -> AppResult<bool>;

    /// Record a successful result on a RUNNING job.
    async fn mark_succeeded(&self, job_id: JobId, result: &serde_json::Value) -> AppResult<bool>;

    /// Record a failure on a QUEUED or RUNNING job.
    async fn mark_failed(&self, job_id: JobId, error: &JobError) -> AppResult<bool>;

    /// Fail every RUNNING job started before `started_before`, merging
    /// `error` into any existing error object. Returns the affected ids.
    async fn fail_stale_running(
        &self,
        started_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>>;

    /// Fail every QUEUED job created before `created_before`.
    async fn expire_stale_queued(
        &self,
        created_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>>;

    /// Delete terminal jobs that finished before `finished_before`.
    async fn purge_finished(&self, finished_before: DateTime<Utc>) -> AppResult<u64>;

    /// Count records per status.
    async fn count_by_status(&self) -> AppResult<JobCounts>;

    /// Check store connectivity.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Number of job records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobCounts {
    /// QUEUED records.
    pub queued: u64,
    /// RUNNING records.
    pub running: u64,
    /// SUCCEEDED records.
    pub succeeded: u64,
    /// FAILED records.
    pub failed: u64,
}

impl JobCounts {
    /// Count for one status.
    pub fn get(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Running => self.running,
            JobStatus::Succeeded => self.succeeded,
            JobStatus::Failed => self.failed,
        }
    }

    /// Add `n` records of `status`.
    pub fn add(&mut self, status: JobStatus, n: u64) {
        match status {
            JobStatus::Queued => self.queued += n,
            JobStatus::Running => self.running += n,
            JobStatus::Succeeded => self.succeeded += n,
            JobStatus::Failed => self.failed += n,
        }
    }

    /// Total across all statuses.
    pub fn total(&self) -> u64 {
        self.queued + self.running + self.succeeded + self.failed
    }
}

/// Merge `patch` into an existing error object, `patch` winning on conflicts.
///
/// Mirrors `COALESCE(error, '{}'::jsonb) || patch` in PostgreSQL.
pub fn merge_error(
    existing: Option<&serde_json::Value>,
    patch: &serde_json::Value,
) -> serde_json::Value {
    let mut merged = match existing {
        Some(serde_json::Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let serde_json::Value::Object(patch) = patch {
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
    }
    serde_json::Value::Object(merged)
}
