//! Reminder scheduling.
//!
//! # Responsibility
//! - Map task recurrence to platform triggers (`trigger`).
//! - Keep exactly one reminder slot per task (`scheduler`).
//! - Abstract the platform notification facility (`center`).
//! - Carry routing data back from a user interaction (`payload`).

pub mod center;
pub mod payload;
pub mod scheduler;
pub mod trigger;
