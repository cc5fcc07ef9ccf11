//! Repository Module
//!
//! Data access layer for the orchestrator. The job and project registries
//! have a Postgres backend for deployments and an in-memory one for local
//! runs and tests.

pub mod job;
pub mod memory;
pub mod project;

pub use job::{JobRegistry, PgJobRegistry, RegistryError};
pub use memory::{InMemoryJobRegistry, InMemoryProjectRegistry};
pub use project::{PgProjectRegistry, ProjectRegistry, ProjectRegistryError};
