//! PostgreSQL job store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use orchestrator_core::error::{AppError, ErrorKind};
use orchestrator_core::{AppResult, JobId};
use orchestrator_entity::job::{Job, JobError, JobStatus, NewJob};

use crate::store::{JobCounts, JobStore};

/// Job store backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a new job store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_queued(&self, job: &NewJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (job_id, agent_id, status, payload) \
             VALUES ($1, $2, 'QUEUED', $3) RETURNING *",
        )
        .bind(job.job_id)
        .bind(&job.agent_id)
        .bind(&job.payload)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to insert job"))
    }

    async fn find_by_id(&self, job_id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find job"))
    }

    async fn mark_running(&self, job_id: JobId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'RUNNING', result = NULL, error = NULL, \
             started_at = NOW(), finished_at = NULL, updated_at = NOW() \
             WHERE job_id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark job running"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_running_if_queued(&self, job_id: JobId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'RUNNING', started_at = NOW(), updated_at = NOW() \
             WHERE job_id = $1 AND status = 'QUEUED'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark job running"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_succeeded(&self, job_id: JobId, result: &serde_json::Value) -> AppResult<bool> {
        let done = sqlx::query(
            "UPDATE jobs SET status = 'SUCCEEDED', result = $2, error = NULL, \
             finished_at = NOW(), updated_at = NOW() \
             WHERE job_id = $1 AND status = 'RUNNING'",
        )
        .bind(job_id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark job succeeded"))?;
        Ok(done.rows_affected() > 0)
    }

    async fn mark_failed(&self, job_id: JobId, error: &JobError) -> AppResult<bool> {
        let done = sqlx::query(
            "UPDATE jobs SET status = 'FAILED', error = $2, result = NULL, \
             finished_at = NOW(), updated_at = NOW() \
             WHERE job_id = $1 AND status IN ('QUEUED', 'RUNNING')",
        )
        .bind(job_id)
        .bind(error.to_value())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark job failed"))?;
        Ok(done.rows_affected() > 0)
    }

    async fn fail_stale_running(
        &self,
        started_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>> {
        sqlx::query_scalar::<_, JobId>(
            "UPDATE jobs SET status = 'FAILED', result = NULL, \
             error = COALESCE(error, '{}'::jsonb) || $2, \
             finished_at = NOW(), updated_at = NOW() \
             WHERE status = 'RUNNING' AND started_at < $1 \
             RETURNING job_id",
        )
        .bind(started_before)
        .bind(error.to_value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to time out running jobs"))
    }

    async fn expire_stale_queued(
        &self,
        created_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>> {
        sqlx::query_scalar::<_, JobId>(
            "UPDATE jobs SET status = 'FAILED', result = NULL, \
             error = COALESCE(error, '{}'::jsonb) || $2, \
             finished_at = NOW(), updated_at = NOW() \
             WHERE status = 'QUEUED' AND created_at < $1 \
             RETURNING job_id",
        )
        .bind(created_before)
        .bind(error.to_value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to expire queued jobs"))
    }

    async fn purge_finished(&self, finished_before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs \
             WHERE status IN ('SUCCEEDED', 'FAILED') \
             AND finished_at IS NOT NULL AND finished_at < $1",
        )
        .bind(finished_before)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to purge finished jobs"))?;
        Ok(result.rows_affected())
    }

    async fn count_by_status(&self) -> AppResult<JobCounts> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to count jobs"))?;

        let mut counts = JobCounts::default();
        for (status, n) in rows {
            counts.add(status, n.max(0) as u64);
        }
        Ok(counts)
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_err("Health check failed"))
    }
}
