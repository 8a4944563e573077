//! In-process queue provider.

pub mod stream;

pub use stream::MemoryStreamQueue;
