//! Scheduled, resumable backups of a hosted issue tracker and wiki into blob
//! storage.
//!
//! Each invocation is stateless: it loads the workflow record, runs at most
//! one phase of the cycle, and persists the outcome before returning.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod remote;
pub mod state_machine;
pub mod storage;
pub mod telemetry;
pub mod ui;
