//! Data Transfer Objects for inter-service communication
//!
//! DTOs exchanged between Quill services (orchestrator, runner, CLI).
//! They are lightweight representations of domain entities optimized for
//! network transfer.

pub mod job;
pub mod project;
pub mod storage;
pub mod trigger;
