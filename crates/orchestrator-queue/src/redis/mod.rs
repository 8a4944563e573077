//! Redis Streams queue provider.

pub mod client;
pub mod stream;

pub use client::RedisClient;
pub use stream::RedisStreamQueue;
