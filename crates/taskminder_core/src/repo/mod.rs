//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the `TaskRepository` capability used by the cache.
//! - Provide swappable strategies: SQLite (durable), memory, unavailable.
//!
//! # Invariants
//! - Repository writes validate input before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   storage errors.

pub mod memory_repo;
pub mod task_repo;
