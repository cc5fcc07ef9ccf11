//! Core domain types
//!
//! This module contains the core domain structures used across Quill services.
//! These types represent the fundamental business entities and are shared between
//! orchestrator (for persistence) and runner (for execution).

pub mod job;
pub mod pipeline;
pub mod project;
pub mod storage;
pub mod trigger;
