//! Scheduler layer for the runner
//!
//! Polls the orchestrator for pending jobs and drives each one from claim
//! to completion.

pub mod poller;

pub use poller::JobPoller;
