//! In-process stream with consumer-group semantics.
//!
//! Entry ids are `<seq>-0` with a strictly increasing sequence. The group
//! keeps a last-delivered cursor and a pending map; evicting an entry on
//! append does not remove it from the pending map, matching Redis.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use orchestrator_core::error::AppError;
use orchestrator_core::result::AppResult;
use orchestrator_entity::queue::{Delivery, QueueEntry, StreamStats};

use crate::queue::WorkQueue;

#[derive(Debug, Default)]
struct GroupState {
    last_delivered: u64,
    pending: BTreeMap<u64, String>,
}

#[derive(Debug, Default)]
struct StreamState {
    entries: VecDeque<(u64, HashMap<String, String>)>,
    next_seq: u64,
    group: Option<GroupState>,
}

/// Work queue held in process memory.
#[derive(Debug, Clone)]
pub struct MemoryStreamQueue {
    stream_key: String,
    group: String,
    max_len: usize,
    state: Arc<Mutex<StreamState>>,
    appended: Arc<Notify>,
}

impl MemoryStreamQueue {
    /// Create an empty stream.
    pub fn new(stream_key: impl Into<String>, group: impl Into<String>, max_len: usize) -> Self {
        Self {
            stream_key: stream_key.into(),
            group: group.into(),
            max_len: max_len.max(1),
            state: Arc::new(Mutex::new(StreamState {
                next_seq: 1,
                ..StreamState::default()
            })),
            appended: Arc::new(Notify::new()),
        }
    }

    /// Append raw fields, bypassing [`QueueEntry`] encoding.
    pub async fn append_fields<I, K, V>(&self, fields: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push_back((seq, fields));
        while state.entries.len() > self.max_len {
            state.entries.pop_front();
        }
        drop(state);

        self.appended.notify_waiters();
        entry_id(seq)
    }
}

fn entry_id(seq: u64) -> String {
    format!("{seq}-0")
}

fn parse_seq(entry_id: &str) -> Option<u64> {
    entry_id.split_once('-').map_or(entry_id, |(seq, _)| seq).parse().ok()
}

#[async_trait]
impl WorkQueue for MemoryStreamQueue {
    fn stream_key(&self) -> &str {
        &self.stream_key
    }

    fn consumer_group(&self) -> &str {
        &self.group
    }

    async fn append(&self, entry: &QueueEntry) -> AppResult<String> {
        Ok(self.append_fields(entry.fields()).await)
    }

    async fn ensure_group(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.group.is_none() {
            state.group = Some(GroupState::default());
        }
        Ok(())
    }

    async fn read_next(&self, consumer: &str, block: Duration) -> AppResult<Option<Delivery>> {
        let deadline = Instant::now() + block;
        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                let StreamState { entries, group, .. } = &mut *state;
                let group = group.as_mut().ok_or_else(|| {
                    AppError::queue(format!(
                        "NOGROUP: consumer group '{}' does not exist on '{}'",
                        self.group, self.stream_key
                    ))
                })?;

                if let Some((seq, fields)) = entries
                    .iter()
                    .find(|(seq, _)| *seq > group.last_delivered)
                {
                    group.last_delivered = *seq;
                    group.pending.insert(*seq, consumer.to_string());
                    return Ok(Some(Delivery::new(entry_id(*seq), fields.clone())));
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ack(&self, entry_id: &str) -> AppResult<u64> {
        let Some(seq) = parse_seq(entry_id) else {
            return Err(AppError::queue(format!("Invalid stream ID: '{entry_id}'")));
        };
        let mut state = self.state.lock().await;
        let removed = state
            .group
            .as_mut()
            .and_then(|group| group.pending.remove(&seq))
            .is_some();
        Ok(u64::from(removed))
    }

    async fn pending_count(&self, consumer: &str) -> AppResult<u64> {
        let state = self.state.lock().await;
        Ok(state.group.as_ref().map_or(0, |group| {
            group.pending.values().filter(|c| *c == consumer).count() as u64
        }))
    }

    async fn stats(&self) -> AppResult<StreamStats> {
        let state = self.state.lock().await;
        let mut stats = StreamStats {
            stream: self.stream_key.clone(),
            group: self.group.clone(),
            length: state.entries.len() as u64,
            ..StreamStats::default()
        };
        if let Some(group) = &state.group {
            stats.group_exists = true;
            stats.pending = group.pending.len() as u64;
            stats.lag = Some(
                state
                    .entries
                    .iter()
                    .filter(|(seq, _)| *seq > group.last_delivered)
                    .count() as u64,
            );
        }
        Ok(stats)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
