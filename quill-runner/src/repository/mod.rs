//! Repository layer
//!
//! Abstracts the runner's side of the orchestrator protocol behind a trait
//! so the scheduler can be tested without a server.

mod jobs;

pub use jobs::{HttpJobRepository, JobRepository};
