//! Execution loop: the single consumer that turns queue entries into job outcomes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use orchestrator_core::config::WorkerConfig;
use orchestrator_core::error::{AppError, error_chain};
use orchestrator_core::{AppResult, JobId};
use orchestrator_database::JobStore;
use orchestrator_entity::job::{FailureReason, JobError};
use orchestrator_entity::queue::Delivery;
use orchestrator_queue::WorkQueue;

use crate::registry::{RunContext, RunnerRegistry};

/// What one poll of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// No entry arrived within the block timeout.
    Idle,
    /// The runner returned a result.
    Succeeded {
        /// Job that ran.
        job_id: JobId,
    },
    /// The job was recorded as FAILED.
    Failed {
        /// Job that failed.
        job_id: JobId,
        /// Why it failed.
        reason: FailureReason,
    },
    /// The job was not QUEUED and the running guard is enabled.
    Skipped {
        /// Job that was left alone.
        job_id: JobId,
    },
    /// The entry could not be correlated with a job.
    Malformed {
        /// Entry that was acknowledged and dropped.
        entry_id: String,
    },
}

/// The execution loop for one consumer identity.
///
/// Jobs are processed strictly one at a time. Every delivered entry is
/// acknowledged once its outcome has been written, whatever that outcome is;
/// nothing is retried.
#[derive(Debug)]
pub struct WorkerRunner {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    registry: Arc<RunnerRegistry>,
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new execution loop.
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
        registry: Arc<RunnerRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            registry,
            config,
        }
    }

    /// Consumer identity of this loop.
    pub fn consumer_name(&self) -> &str {
        &self.config.consumer_name
    }

    /// Run until the cancel signal is raised.
    ///
    /// The signal is only observed between polls; a job that has been read
    /// always runs to completion and is acknowledged before the loop exits.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> AppResult<()> {
        if self.config.concurrency != 1 {
            return Err(AppError::configuration(format!(
                "worker.concurrency must be 1 (got {})",
                self.config.concurrency
            )));
        }

        let backoff = Duration::from_millis(self.config.error_backoff_ms);

        while let Err(e) = self.queue.ensure_group().await {
            error!(error = %e, "Failed to create consumer group");
            if wait_or_cancel(&mut cancel, backoff).await {
                return Ok(());
            }
        }

        info!(
            stream = %self.queue.stream_key(),
            group = %self.queue.consumer_group(),
            consumer = %self.config.consumer_name,
            agents = ?self.registry.agent_ids(),
            "Worker listening"
        );

        while !*cancel.borrow() {
            if let Err(e) = self.poll_once().await {
                error!(consumer = %self.config.consumer_name, error = %e, "Queue read failed");
                if wait_or_cancel(&mut cancel, backoff).await {
                    break;
                }
            }
        }

        info!(consumer = %self.config.consumer_name, "Worker stopped");
        Ok(())
    }

    /// Block for at most one entry and process it.
    ///
    /// Only the queue read can fail; everything after delivery is recorded
    /// in the returned outcome.
    pub async fn poll_once(&self) -> AppResult<JobOutcome> {
        let block = Duration::from_millis(self.config.block_timeout_ms);
        match self
            .queue
            .read_next(&self.config.consumer_name, block)
            .await?
        {
            Some(delivery) => Ok(self.process(delivery).await),
            None => Ok(JobOutcome::Idle),
        }
    }

    /// Process one delivered entry and acknowledge it.
    pub async fn process(&self, delivery: Delivery) -> JobOutcome {
        let entry_id = delivery.entry_id.clone();

        let job_id = match delivery.job_id() {
            Ok(job_id) => job_id,
            Err(e) => {
                warn!(entry_id = %entry_id, reason = "malformed_entry", error = %e, "Dropping entry");
                self.ack(&entry_id, None).await;
                return JobOutcome::Malformed { entry_id };
            }
        };
        let agent_id = delivery.agent_id().to_string();

        let (payload, decode_error) = match delivery.payload() {
            Ok(payload) => (payload, None),
            Err(msg) => {
                warn!(
                    job_id = %job_id,
                    entry_id = %entry_id,
                    reason = "payload_decode_error",
                    error = %msg,
                    "Payload could not be decoded"
                );
                (json!({}), Some(msg))
            }
        };

        if let Some(msg) = decode_error.as_ref().filter(|_| self.config.strict_payload_decoding) {
            let error = JobError::new(
                FailureReason::PayloadDecodeError,
                format!("payload could not be decoded: {msg}"),
            )
            .with_payload_decode_error(Some(msg.clone()));
            self.record_failure(job_id, &error).await;
            self.ack(&entry_id, Some(job_id)).await;
            return JobOutcome::Failed {
                job_id,
                reason: FailureReason::PayloadDecodeError,
            };
        }

        if !self.start(job_id).await {
            self.ack(&entry_id, Some(job_id)).await;
            return JobOutcome::Skipped { job_id };
        }

        info!(job_id = %job_id, agent_id = %agent_id, entry_id = %entry_id, "Job started");
        let started = Instant::now();
        let ctx = RunContext {
            job_id,
            agent_id: agent_id.clone(),
            payload_decode_error: decode_error.clone(),
        };

        let outcome = match self.registry.execute(&agent_id, &payload, &ctx).await {
            Ok(result) => {
                self.record_success(job_id, &result).await;
                info!(
                    job_id = %job_id,
                    agent_id = %agent_id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Job SUCCEEDED"
                );
                JobOutcome::Succeeded { job_id }
            }
            Err(err) => {
                let reason = err.reason();
                let error = JobError::new(reason, err.to_string())
                    .with_trace(error_chain(&err))
                    .with_payload_decode_error(decode_error);
                warn!(
                    job_id = %job_id,
                    agent_id = %agent_id,
                    reason = %reason,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Job FAILED"
                );
                self.record_failure(job_id, &error).await;
                JobOutcome::Failed { job_id, reason }
            }
        };

        self.ack(&entry_id, Some(job_id)).await;
        outcome
    }

    /// Move the job to RUNNING. Returns `false` when the job must not run.
    async fn start(&self, job_id: JobId) -> bool {
        if self.config.guard_running_transition {
            return match self.store.mark_running_if_queued(job_id).await {
                Ok(true) => true,
                Ok(false) => {
                    info!(job_id = %job_id, reason = "not_queued", "Skipping job that is not QUEUED");
                    false
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Failed to mark job RUNNING; skipping");
                    false
                }
            };
        }

        match self.store.mark_running(job_id).await {
            Ok(true) => {}
            Ok(false) => warn!(job_id = %job_id, "No job record for entry; running anyway"),
            Err(e) => error!(job_id = %job_id, error = %e, "Failed to mark job RUNNING"),
        }
        true
    }

    async fn record_success(&self, job_id: JobId, result: &Value) {
        match self.store.mark_succeeded(job_id, result).await {
            Ok(true) => {}
            Ok(false) => warn!(
                job_id = %job_id,
                "Job was no longer RUNNING; result discarded"
            ),
            Err(e) => error!(job_id = %job_id, error = %e, "Failed to record job result"),
        }
    }

    async fn record_failure(&self, job_id: JobId, error: &JobError) {
        match self.store.mark_failed(job_id, error).await {
            Ok(true) => {}
            Ok(false) => warn!(
                job_id = %job_id,
                "Job was already terminal or missing; failure not recorded"
            ),
            Err(e) => error!(job_id = %job_id, error = %e, "Failed to record job failure"),
        }
    }

    async fn ack(&self, entry_id: &str, job_id: Option<JobId>) {
        match self.queue.ack(entry_id).await {
            Ok(_) => debug!(entry_id = %entry_id, job_id = ?job_id, "Entry acknowledged"),
            Err(e) => error!(
                entry_id = %entry_id,
                job_id = ?job_id,
                error = %e,
                "Failed to acknowledge entry; it stays pending"
            ),
        }
    }
}

/// Sleep for `backoff`, returning `true` early if cancellation is raised.
async fn wait_or_cancel(cancel: &mut watch::Receiver<bool>, backoff: Duration) -> bool {
    tokio::select! {
        changed = cancel.changed() => changed.is_err() || *cancel.borrow(),
        _ = tokio::time::sleep(backoff) => *cancel.borrow(),
    }
}
