//! Reconciliation sweeper.
//!
//! Repairs job records the execution loop could not finish. Three passes
//! run in order, each a single conditional bulk write against the store:
//!
//! 1. **timeout**: RUNNING jobs started before `now - job_timeout` become FAILED
//! 2. **expiry**: QUEUED jobs created before `now - queued_expiry` become FAILED
//! 3. **retention**: terminal jobs finished before `now - retention` are deleted
//!
//! The sweeper never touches the queue. A failing pass aborts the sweep.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use orchestrator_core::config::SweeperConfig;
use orchestrator_core::error::AppError;
use orchestrator_core::{AppResult, JobId};
use orchestrator_database::JobStore;
use orchestrator_entity::job::JobError;

const SECONDS_PER_DAY: u64 = 86_400;

/// What one sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Jobs failed by the timeout pass.
    pub timed_out: Vec<JobId>,
    /// Jobs failed by the expiry pass.
    pub expired: Vec<JobId>,
    /// Records deleted by the retention pass.
    pub deleted: u64,
}

impl SweepReport {
    /// Whether the sweep changed nothing.
    pub fn is_empty(&self) -> bool {
        self.timed_out.is_empty() && self.expired.is_empty() && self.deleted == 0
    }
}

/// Periodic batch repair of the job store.
#[derive(Debug, Clone)]
pub struct Sweeper {
    store: Arc<dyn JobStore>,
    config: SweeperConfig,
}

impl Sweeper {
    /// Create a sweeper.
    pub fn new(store: Arc<dyn JobStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// Run all passes against the current time.
    pub async fn run_once(&self) -> AppResult<SweepReport> {
        self.run_at(Utc::now()).await
    }

    /// Run all passes with cut-offs computed from `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let timeout_cutoff = cutoff(now, self.config.job_timeout_seconds)?;
        let expiry_cutoff = cutoff(now, self.config.queued_expire_seconds)?;
        let retention_cutoff = cutoff(
            now,
            self.config.retention_days.saturating_mul(SECONDS_PER_DAY),
        )?;

        let timed_out = self
            .store
            .fail_stale_running(
                timeout_cutoff,
                &JobError::timeout(self.config.job_timeout_seconds),
            )
            .await?;
        for job_id in &timed_out {
            warn!(job_id = %job_id, reason = "timeout", "Job timed out");
        }

        let expired = self
            .store
            .expire_stale_queued(
                expiry_cutoff,
                &JobError::expired(self.config.queued_expire_seconds),
            )
            .await?;
        for job_id in &expired {
            warn!(job_id = %job_id, reason = "expired", "Job expired");
        }

        let deleted = self.store.purge_finished(retention_cutoff).await?;

        info!(
            timed_out = timed_out.len(),
            expired = expired.len(),
            deleted,
            "Sweep finished"
        );

        Ok(SweepReport {
            timed_out,
            expired,
            deleted,
        })
    }
}

fn cutoff(now: DateTime<Utc>, seconds: u64) -> AppResult<DateTime<Utc>> {
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| AppError::configuration(format!("Sweep threshold of {seconds}s is out of range")))
}
