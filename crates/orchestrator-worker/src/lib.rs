//! The job coordination path of the agent orchestrator.
//!
//! This crate provides:
//! - [`JobGateway`]: writes a QUEUED record, then appends the queue entry
//! - [`WorkerRunner`]: the single-consumer execution loop
//! - [`RunnerRegistry`]: static `agent_id` to runner mapping, plus built-in runners
//! - [`Sweeper`] and [`SweepScheduler`]: periodic store reconciliation
//! - [`status`]: backlog and job-count snapshots for operators

pub mod gateway;
pub mod registry;
pub mod runner;
pub mod runners;
pub mod scheduler;
pub mod status;
pub mod sweeper;

pub use gateway::JobGateway;
pub use registry::{AgentRunner, RunContext, RunnerError, RunnerRegistry};
pub use runner::{JobOutcome, WorkerRunner};
pub use scheduler::SweepScheduler;
pub use status::{OrchestratorSnapshot, snapshot};
pub use sweeper::{SweepReport, Sweeper};
