//! The work queue seam.

use std::time::Duration;

use async_trait::async_trait;

use orchestrator_core::AppResult;
use orchestrator_entity::queue::{Delivery, QueueEntry, StreamStats};

/// An append-only log partitioned by a single consumer group.
///
/// Entries are delivered to at most one consumer of the group and stay in
/// the group's pending set until acknowledged. Nothing is redelivered
/// automatically.
#[async_trait]
pub trait WorkQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Stream key this queue appends to.
    fn stream_key(&self) -> &str;

    /// Consumer group this queue reads through.
    fn consumer_group(&self) -> &str;

    /// Append an entry, trimming the stream to its maximum length.
    /// Returns the queue-assigned entry id.
    async fn append(&self, entry: &QueueEntry) -> AppResult<String>;

    /// Create the consumer group at the start of the stream if it does not exist.
    ///
    /// Entries already in the stream when the group is created are delivered,
    /// so work submitted before the first consumer starts is not lost.
    async fn ensure_group(&self) -> AppResult<()>;

    /// Wait up to `block` for the next undelivered entry and assign it to `consumer`.
    async fn read_next(&self, consumer: &str, block: Duration) -> AppResult<Option<Delivery>>;

    /// Acknowledge an entry, removing it from the pending set.
    /// Returns the number of entries acknowledged (0 or 1).
    async fn ack(&self, entry_id: &str) -> AppResult<u64>;

    /// Number of entries delivered to `consumer` and not yet acknowledged.
    async fn pending_count(&self, consumer: &str) -> AppResult<u64>;

    /// Stream length, group lag, and group pending count.
    async fn stats(&self) -> AppResult<StreamStats>;

    /// Check queue connectivity.
    async fn health_check(&self) -> AppResult<bool>;
}
