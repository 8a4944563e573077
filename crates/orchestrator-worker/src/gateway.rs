//! Enqueue gateway and status query.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use orchestrator_core::error::AppError;
use orchestrator_core::{AppResult, JobId};
use orchestrator_database::JobStore;
use orchestrator_entity::job::{JobStatusView, NewJob};
use orchestrator_entity::queue::QueueEntry;
use orchestrator_queue::WorkQueue;

/// Accepts submissions and answers status queries.
///
/// A submission is two independent writes: the QUEUED record first, then
/// the queue entry. If the append fails the record stays QUEUED with no
/// entry until the sweeper's expiry pass fails it.
#[derive(Debug, Clone)]
pub struct JobGateway {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
}

impl JobGateway {
    /// Create a gateway over a store and a queue.
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Submit a job and return its id.
    pub async fn submit(&self, agent_id: &str, payload: Value) -> AppResult<JobId> {
        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            return Err(AppError::validation("agent_id must not be empty"));
        }

        let job = NewJob::new(agent_id, payload);
        self.store.insert_queued(&job).await?;

        let entry = QueueEntry::new(job.job_id, agent_id, &job.payload);
        match self.queue.append(&entry).await {
            Ok(entry_id) => {
                info!(job_id = %job.job_id, agent_id = %agent_id, entry_id = %entry_id, "Job queued");
                Ok(job.job_id)
            }
            Err(e) => {
                error!(
                    job_id = %job.job_id,
                    agent_id = %agent_id,
                    error = %e,
                    "Queue append failed; record stays QUEUED until expiry"
                );
                Err(e)
            }
        }
    }

    /// Current status of a job, `None` when it does not exist.
    pub async fn get_status(&self, job_id: JobId) -> AppResult<Option<JobStatusView>> {
        Ok(self.store.find_by_id(job_id).await?.map(JobStatusView::from))
    }
}
