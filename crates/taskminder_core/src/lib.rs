//! Core task lifecycle and reminder scheduling for Taskminder.
//! This crate is the single source of truth for task and reminder invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig, DatabaseLocation, ReschedulePolicy};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{NewTask, Repeat, Task, TaskId, TaskPatch, TaskValidationError};
pub use reminder::center::{
    InMemoryNotificationCenter, NotificationCenter, NotificationError, ReminderContent,
    ReminderRequest,
};
pub use reminder::payload::{route_notification_response, ReminderPayload};
pub use reminder::scheduler::{
    reminder_identifier, NotificationPermission, ReminderScheduler, ScheduleOutcome,
    SchedulingError,
};
pub use reminder::trigger::ReminderTrigger;
pub use repo::memory_repo::{MemoryTaskRepository, UnavailableTaskRepository};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::snapshot::{Subscription, TaskSnapshot};
pub use service::task_cache::{CacheError, CacheResult, TaskCache};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
