//! Point-in-time view of the queue and the store, shared by `/metrics` and
//! `worker status`.

use serde::Serialize;

use orchestrator_core::AppResult;
use orchestrator_database::{JobCounts, JobStore};
use orchestrator_entity::queue::StreamStats;
use orchestrator_queue::WorkQueue;

/// Queue and job counts read together.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorSnapshot {
    /// Stream length, group lag and group pending count.
    pub stream: StreamStats,
    /// Jobs per status.
    pub jobs: JobCounts,
    /// Pending entries for one consumer, when one was asked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_pending: Option<u64>,
}

/// Read the snapshot. A missing consumer group is reported through
/// `stream.group_exists` rather than as an error.
pub async fn snapshot(
    store: &dyn JobStore,
    queue: &dyn WorkQueue,
    consumer: Option<&str>,
) -> AppResult<OrchestratorSnapshot> {
    let stream = queue.stats().await?;
    let jobs = store.count_by_status().await?;
    let consumer_pending = match consumer {
        Some(name) if stream.group_exists => Some(queue.pending_count(name).await?),
        Some(_) => Some(0),
        None => None,
    };

    Ok(OrchestratorSnapshot {
        stream,
        jobs,
        consumer_pending,
    })
}
