//! Redis connection management.
//!
//! Two multiplexed connections are kept. Redis serves the commands of one
//! connection in order, so a pending `XREADGROUP ... BLOCK` would hold up every
//! command queued behind it. Blocking reads get their own connection; appends,
//! acknowledgements, stats and pings share the other.

use std::time::Duration;

use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tracing::info;

use orchestrator_core::error::{AppError, ErrorKind};
use orchestrator_core::result::AppResult;
use orchestrator_core::types::redact::mask_password;

/// Response timeout for non-blocking commands.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis client wrapper with connection management.
#[derive(Debug, Clone)]
pub struct RedisClient {
    /// Connection for short commands.
    conn: ConnectionManager,
    /// Connection reserved for blocking reads.
    blocking: ConnectionManager,
}

impl RedisClient {
    /// Connect to Redis.
    ///
    /// `max_block` is the longest blocking read issued on this client; the
    /// blocking connection's response timeout is sized above it.
    pub async fn connect(url: &str, max_block: Duration) -> AppResult<Self> {
        info!(url = %mask_password(url), "Connecting to Redis");

        let client = Client::open(url).map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to create Redis client", e)
        })?;

        let conn = Self::manager(&client, COMMAND_TIMEOUT).await?;
        let blocking = Self::manager(&client, max_block + COMMAND_TIMEOUT).await?;

        info!("Connected to Redis");
        Ok(Self { conn, blocking })
    }

    async fn manager(client: &Client, response_timeout: Duration) -> AppResult<ConnectionManager> {
        let config = ConnectionManagerConfig::new().set_response_timeout(Some(response_timeout));
        ConnectionManager::new_with_config(client.clone(), config)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Queue, "Failed to connect to Redis", e))
    }

    /// Get a mutable clone of the command connection.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Get a mutable clone of the blocking-read connection.
    pub fn blocking_conn(&self) -> ConnectionManager {
        self.blocking.clone()
    }
}
