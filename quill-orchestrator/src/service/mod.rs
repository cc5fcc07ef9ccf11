//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between the registry, storage and the callers.

pub mod job;
pub mod project;
pub mod storage;

// Re-export for convenience
pub use job as job_service;
pub use project as project_service;
pub use storage as storage_service;
