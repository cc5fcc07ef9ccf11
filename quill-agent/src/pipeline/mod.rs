//! Pipeline variants
//!
//! Each pipeline is a fixed sequence of phases over the engine's
//! capabilities, returning the success payload or the error that stopped it.

pub mod create_project;
pub mod infer_action;
pub mod modify_project;
pub mod summarize;
