//! Task domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by repository, scheduler and
//!   cache.
//! - Own date parsing so every layer agrees on what a valid timestamp is.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard delete; ids are never recycled.

pub mod date;
pub mod task;
