//! Redis Streams work queue.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::streams::{StreamInfoGroupsReply, StreamMaxlen, StreamReadReply};
use tracing::{debug, info};

use orchestrator_core::error::{AppError, ErrorKind};
use orchestrator_core::result::AppResult;
use orchestrator_entity::queue::{Delivery, QueueEntry, StreamStats};

use super::client::RedisClient;
use crate::queue::WorkQueue;

/// Work queue on a Redis stream with one consumer group.
#[derive(Debug, Clone)]
pub struct RedisStreamQueue {
    client: RedisClient,
    stream_key: String,
    group: String,
    max_len: usize,
}

impl RedisStreamQueue {
    /// Create a queue over an existing client.
    pub fn new(
        client: RedisClient,
        stream_key: impl Into<String>,
        group: impl Into<String>,
        max_len: usize,
    ) -> Self {
        Self {
            client,
            stream_key: stream_key.into(),
            group: group.into(),
            max_len,
        }
    }

    fn map_err(command: &'static str) -> impl FnOnce(redis::RedisError) -> AppError {
        move |e| AppError::with_source(ErrorKind::Queue, format!("{command} failed: {e}"), e)
    }
}

#[async_trait]
impl WorkQueue for RedisStreamQueue {
    fn stream_key(&self) -> &str {
        &self.stream_key
    }

    fn consumer_group(&self) -> &str {
        &self.group
    }

    async fn append(&self, entry: &QueueEntry) -> AppResult<String> {
        let mut conn = self.client.conn_mut();
        let fields = entry.fields();
        let entry_id: String = conn
            .xadd_maxlen(
                &self.stream_key,
                StreamMaxlen::Approx(self.max_len),
                "*",
                &fields,
            )
            .await
            .map_err(Self::map_err("XADD"))?;

        debug!(stream = %self.stream_key, entry_id = %entry_id, job_id = %entry.job_id, "Appended queue entry");
        Ok(entry_id)
    }

    /// Creates the group at id `0`. On a stream that already holds entries,
    /// every entry still in the stream is delivered to the group, including
    /// those appended before any worker started.
    async fn ensure_group(&self) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => {
                info!(stream = %self.stream_key, group = %self.group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(Self::map_err("XGROUP CREATE")(e)),
        }
    }

    async fn read_next(&self, consumer: &str, block: Duration) -> AppResult<Option<Delivery>> {
        let mut conn = self.client.blocking_conn();
        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(consumer)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err("XREADGROUP"))?;

        let Some(reply) = reply else {
            return Ok(None);
        };

        let delivery = reply
            .keys
            .into_iter()
            .flat_map(|key| key.ids)
            .next()
            .map(|id| {
                let fields: HashMap<String, String> = id
                    .map
                    .keys()
                    .filter_map(|field| id.get::<String>(field).map(|v| (field.clone(), v)))
                    .collect();
                Delivery::new(id.id.clone(), fields)
            });
        Ok(delivery)
    }

    async fn ack(&self, entry_id: &str) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        conn.xack(&self.stream_key, &self.group, &[entry_id])
            .await
            .map_err(Self::map_err("XACK"))
    }

    async fn pending_count(&self, consumer: &str) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        let entries: Vec<(String, String, u64, u64)> = redis::cmd("XPENDING")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg("-")
            .arg("+")
            .arg(self.max_len.max(1))
            .arg(consumer)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err("XPENDING"))?;
        Ok(entries.len() as u64)
    }

    async fn stats(&self) -> AppResult<StreamStats> {
        let mut conn = self.client.conn_mut();
        let mut stats = StreamStats {
            stream: self.stream_key.clone(),
            group: self.group.clone(),
            ..StreamStats::default()
        };

        let exists: bool = conn
            .exists(&self.stream_key)
            .await
            .map_err(Self::map_err("EXISTS"))?;
        if !exists {
            return Ok(stats);
        }

        stats.length = conn
            .xlen(&self.stream_key)
            .await
            .map_err(Self::map_err("XLEN"))?;

        let groups: StreamInfoGroupsReply = conn
            .xinfo_groups(&self.stream_key)
            .await
            .map_err(Self::map_err("XINFO GROUPS"))?;

        if let Some(group) = groups.groups.iter().find(|g| g.name == self.group) {
            stats.group_exists = true;
            stats.pending = group.pending as u64;
            stats.lag = group.lag.map(|lag| lag as u64);
        }
        Ok(stats)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err("PING"))?;
        Ok(pong == "PONG")
    }
}
