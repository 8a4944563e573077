//! # orchestrator-entity
//!
//! Domain entity models for the agent orchestrator. [`job`] holds the
//! durable job record and its status machine; [`queue`] holds the wire
//! shape of work-queue entries and stream statistics.

pub mod job;
pub mod queue;
