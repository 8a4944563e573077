//! # orchestrator-queue
//!
//! Work queue implementations for the agent orchestrator. The queue only
//! distributes work; job outcome lives in the job store.
//!
//! - **redis**: Redis Streams with a consumer group (`XADD` / `XREADGROUP` / `XACK`)
//! - **memory**: an in-process stream with the same consumer-group semantics
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
pub mod queue;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::QueueManager;
pub use queue::WorkQueue;
