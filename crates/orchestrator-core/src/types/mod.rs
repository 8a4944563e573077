//! Shared value types.

pub mod id;
pub mod redact;

pub use id::JobId;
