//! Cron scheduler for the reconciliation sweep.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use orchestrator_core::error::AppError;

use crate::sweeper::Sweeper;

/// Runs [`Sweeper::run_once`] on a cron schedule inside the server process.
pub struct SweepScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Sweeper invoked on every tick
    sweeper: Arc<Sweeper>,
    /// Held while a sweep runs; a tick that finds it taken is skipped
    running: Arc<Mutex<()>>,
}

impl std::fmt::Debug for SweepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepScheduler").finish()
    }
}

impl SweepScheduler {
    /// Create a new sweep scheduler
    pub async fn new(sweeper: Arc<Sweeper>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            sweeper,
            running: Arc::new(Mutex::new(())),
        })
    }

    /// Register the sweep on a six-field cron expression
    pub async fn register(&self, schedule: &str) -> Result<(), AppError> {
        let sweeper = Arc::clone(&self.sweeper);
        let running = Arc::clone(&self.running);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let sweeper = Arc::clone(&sweeper);
            let running = Arc::clone(&running);
            Box::pin(async move {
                let Ok(_guard) = running.try_lock() else {
                    tracing::warn!("Previous sweep still running, skipping this tick");
                    return;
                };
                tracing::debug!("Running scheduled sweep");
                if let Err(e) = sweeper.run_once().await {
                    tracing::error!(error = %e, "Scheduled sweep failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid sweep schedule '{}': {}", schedule, e))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sweep schedule: {}", e)))?;

        tracing::info!(schedule = %schedule, "Registered: sweep");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Sweep scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Sweep scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use orchestrator_core::config::SweeperConfig;
    use orchestrator_core::error::ErrorKind;
    use orchestrator_database::MemoryJobStore;

    use super::*;

    fn sweeper() -> Arc<Sweeper> {
        Arc::new(Sweeper::new(
            Arc::new(MemoryJobStore::new()),
            SweeperConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_a_configuration_error() {
        let scheduler = SweepScheduler::new(sweeper()).await.unwrap();
        let err = scheduler.register("every five minutes").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_default_schedule_registers() {
        let scheduler = SweepScheduler::new(sweeper()).await.unwrap();
        scheduler
            .register(&SweeperConfig::default().schedule)
            .await
            .expect("default schedule is valid");
    }
}
