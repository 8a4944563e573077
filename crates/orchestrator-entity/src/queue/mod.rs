//! Work-queue wire types.

pub mod entry;
pub mod stats;

pub use entry::{Delivery, MalformedEntry, QueueEntry};
pub use stats::StreamStats;
