//! Quill Core
//!
//! Core types and abstractions for the Quill notes-to-code system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, Project, TriggerContext, StorageFile, PipelineResult)
//! - DTOs: Data transfer objects for inter-service communication
//! - Layout: The storage addressing scheme shared by every service

pub mod domain;
pub mod dto;
pub mod layout;
