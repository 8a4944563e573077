//! In-process job store.

pub mod store;

pub use store::MemoryJobStore;
