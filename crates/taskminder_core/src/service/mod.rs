//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and scheduler calls into use-case level APIs.
//! - Keep UI layers decoupled from storage and notification details.

pub mod snapshot;
pub mod task_cache;
