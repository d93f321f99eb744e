//! Batch encode pipeline
//!
//! `orchestrator` plans jobs and drives the run, `pool` schedules them
//! across workers, `job` executes one track, and `report` aggregates
//! every terminal outcome into the final tally.

pub mod job;
pub mod orchestrator;
pub mod pool;
pub mod report;

pub use job::EncodeJob;
pub use orchestrator::{run, run_with_tools};
pub use report::{BatchReport, FailureRecord, OutcomeCollector};
