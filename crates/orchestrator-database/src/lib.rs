//! # orchestrator-database
//!
//! The durable job store. [`JobStore`] is the seam the gateway, the
//! execution loop, and the sweeper talk to; [`PgJobStore`] backs it with
//! PostgreSQL and [`MemoryJobStore`] keeps everything in process.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryJobStore;
pub use provider::StoreManager;
pub use repositories::PgJobStore;
pub use store::{JobCounts, JobStore};
