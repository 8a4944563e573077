//! Store manager that dispatches to the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use orchestrator_core::config::DatabaseConfig;
use orchestrator_core::error::AppError;
use orchestrator_core::{AppResult, JobId};
use orchestrator_entity::job::{Job, JobError, NewJob};

use crate::connection::DatabasePool;
use crate::memory::MemoryJobStore;
use crate::migration::run_migrations;
use crate::repositories::PgJobStore;
use crate::store::{JobCounts, JobStore};

/// Job store selected from configuration at startup.
#[derive(Debug, Clone)]
pub struct StoreManager {
    inner: Arc<dyn JobStore>,
    pool: Option<DatabasePool>,
}

impl StoreManager {
    /// Connect the backend named by `config.provider`.
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider.as_str() {
            "postgres" => {
                info!("Initializing PostgreSQL job store");
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self {
                    inner: Arc::new(PgJobStore::new(pool.pool().clone())),
                    pool: Some(pool),
                })
            }
            "memory" => {
                info!("Initializing in-memory job store");
                Ok(Self::from_store(Arc::new(MemoryJobStore::new())))
            }
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'. Supported: postgres, memory"
            ))),
        }
    }

    /// Wrap an existing store (for testing).
    pub fn from_store(store: Arc<dyn JobStore>) -> Self {
        Self {
            inner: store,
            pool: None,
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.inner)
    }

    /// Close the connection pool, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

#[async_trait]
impl JobStore for StoreManager {
    async fn insert_queued(&self, job: &NewJob) -> AppResult<Job> {
        self.inner.insert_queued(job).await
    }

    async fn find_by_id(&self, job_id: JobId) -> AppResult<Option<Job>> {
        self.inner.find_by_id(job_id).await
    }

    async fn mark_running(&self, job_id: JobId) -> AppResult<bool> {
        self.inner.mark_running(job_id).await
    }

    async fn mark_running_if_queued(&self, job_id: JobId) -> AppResult<bool> {
        self.inner.mark_running_if_queued(job_id).await
    }

    async fn mark_succeeded(&self, job_id: JobId, result: &serde_json::Value) -> AppResult<bool> {
        self.inner.mark_succeeded(job_id, result).await
    }

    async fn mark_failed(&self, job_id: JobId, error: &JobError) -> AppResult<bool> {
        self.inner.mark_failed(job_id, error).await
    }

    async fn fail_stale_running(
        &self,
        started_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>> {
        self.inner.fail_stale_running(started_before, error).await
    }

    async fn expire_stale_queued(
        &self,
        created_before: DateTime<Utc>,
        error: &JobError,
    ) -> AppResult<Vec<JobId>> {
        self.inner.expire_stale_queued(created_before, error).await
    }

    async fn purge_finished(&self, finished_before: DateTime<Utc>) -> AppResult<u64> {
        self.inner.purge_finished(finished_before).await
    }

    async fn count_by_status(&self) -> AppResult<JobCounts> {
        self.inner.count_by_status().await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
