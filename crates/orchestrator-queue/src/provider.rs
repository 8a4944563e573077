//! Queue manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use orchestrator_core::config::QueueConfig;
use orchestrator_core::error::AppError;
use orchestrator_core::result::AppResult;
use orchestrator_entity::queue::{Delivery, QueueEntry, StreamStats};

use crate::queue::WorkQueue;

/// Work queue selected from configuration at startup.
#[derive(Debug, Clone)]
pub struct QueueManager {
    inner: Arc<dyn WorkQueue>,
}

impl QueueManager {
    /// Create a queue manager from configuration.
    ///
    /// `max_block` is the longest blocking read the caller will issue; the
    /// Redis blocking connection's response timeout is sized from it.
    pub async fn new(config: &QueueConfig, max_block: Duration) -> AppResult<Self> {
        let inner: Arc<dyn WorkQueue> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!(stream = %config.stream_key, group = %config.consumer_group, "Initializing Redis Streams queue");
                let client =
                    crate::redis::RedisClient::connect(&config.redis_url, max_block).await?;
                Arc::new(crate::redis::RedisStreamQueue::new(
                    client,
                    &config.stream_key,
                    &config.consumer_group,
                    config.max_len,
                ))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(stream = %config.stream_key, group = %config.consumer_group, "Initializing in-memory queue");
                Arc::new(crate::memory::MemoryStreamQueue::new(
                    &config.stream_key,
                    &config.consumer_group,
                    config.max_len,
                ))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a queue manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn WorkQueue>) -> Self {
        Self { inner: provider }
    }

    /// Shared handle to the underlying queue.
    pub fn queue(&self) -> Arc<dyn WorkQueue> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl WorkQueue for QueueManager {
    fn stream_key(&self) -> &str {
        self.inner.stream_key()
    }

    fn consumer_group(&self) -> &str {
        self.inner.consumer_group()
    }

    async fn append(&self, entry: &QueueEntry) -> AppResult<String> {
        self.inner.append(entry).await
    }

    async fn ensure_group(&self) -> AppResult<()> {
        self.inner.ensure_group().await
    }

    async fn read_next(&self, consumer: &str, block: Duration) -> AppResult<Option<Delivery>> {
        self.inner.read_next(consumer, block).await
    }

    async fn ack(&self, entry_id: &str) -> AppResult<u64> {
        self.inner.ack(entry_id).await
    }

    async fn pending_count(&self, consumer: &str) -> AppResult<u64> {
        self.inner.pending_count(consumer).await
    }

    async fn stats(&self) -> AppResult<StreamStats> {
        self.inner.stats().await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
