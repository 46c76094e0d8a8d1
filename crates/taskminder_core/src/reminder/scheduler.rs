//! Recurrence-aware reminder scheduler.
//!
//! # Responsibility
//! - Translate a task's recurrence into a platform trigger.
//! - Own the reminder identifier namespace and the schedule/cancel
//!   lifecycle.
//!
//! # Invariants
//! - The reminder identifier depends on the task id only, so at most one
//!   registration per task is ever live.
//! - `schedule` always cancels before deciding whether to register.
//! - Done or non-recurring tasks never end up with a registration.
//! - Scheduling failures are logged and reported as `false`, never raised.

use crate::model::task::{Task, TaskId};
use crate::reminder::center::{
    NotificationCenter, NotificationError, ReminderContent, ReminderRequest,
};
use crate::reminder::payload::ReminderPayload;
use crate::reminder::trigger::ReminderTrigger;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Prefix of every task reminder identifier.
pub const REMINDER_ID_PREFIX: &str = "task-reminder-";

const REMINDER_TITLE: &str = "Task reminder";

/// Returns the reminder identifier owned by one task.
pub fn reminder_identifier(task_id: &str) -> String {
    format!("{REMINDER_ID_PREFIX}{task_id}")
}

/// Notification permission as detected once at setup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
}

/// Result of a successful scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A registration is now live with this trigger.
    Scheduled(ReminderTrigger),
    /// The task is done or does not recur; nothing is registered.
    NotEligible,
}

/// Reasons a reminder could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    PermissionDenied,
    InvalidDate { task_id: TaskId, value: String },
    Backend(NotificationError),
}

impl Display for SchedulingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission not granted"),
            Self::InvalidDate { task_id, value } => {
                write!(f, "task {task_id} has an unparsable date `{value}`")
            }
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SchedulingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::PermissionDenied | Self::InvalidDate { .. } => None,
        }
    }
}

/// Scheduler over one notification facility.
pub struct ReminderScheduler<N: NotificationCenter> {
    center: N,
    permission: NotificationPermission,
}

impl<N: NotificationCenter> ReminderScheduler<N> {
    pub fn new(center: N, permission: NotificationPermission) -> Self {
        Self { center, permission }
    }

    pub fn center(&self) -> &N {
        &self.center
    }

    pub fn permission(&self) -> NotificationPermission {
        self.permission
    }

    /// Replaces any reminder for `task` and reports whether one is active.
    ///
    /// A `true` result means the facility accepted the registration; on a
    /// platform that silently accepts without permission it does not prove
    /// delivery.
    pub fn schedule(&self, task: &Task) -> bool {
        match self.try_schedule(task) {
            Ok(ScheduleOutcome::Scheduled(trigger)) => {
                info!(
                    "event=reminder_schedule module=reminder status=ok task_id={} repeat={} hour={} minute={}",
                    task.id,
                    task.repeat,
                    trigger.hour(),
                    trigger.minute()
                );
                true
            }
            Ok(ScheduleOutcome::NotEligible) => {
                debug!(
                    "event=reminder_schedule module=reminder status=skip task_id={} done={} repeat={}",
                    task.id, task.done, task.repeat
                );
                false
            }
            Err(SchedulingError::PermissionDenied) => {
                info!(
                    "event=reminder_schedule module=reminder status=skip task_id={} reason=permission_denied",
                    task.id
                );
                false
            }
            Err(err @ SchedulingError::InvalidDate { .. }) => {
                warn!(
                    "event=reminder_schedule module=reminder status=skip task_id={} reason=invalid_date error={err}",
                    task.id
                );
                false
            }
            Err(err) => {
                error!(
                    "event=reminder_schedule module=reminder status=error task_id={} error={err}",
                    task.id
                );
                false
            }
        }
    }

    /// Scheduling pass with the failure reason exposed.
    ///
    /// The existing registration is cancelled first in every case.
    pub fn try_schedule(&self, task: &Task) -> Result<ScheduleOutcome, SchedulingError> {
        self.cancel(&task.id);

        if !task.is_reminder_eligible() {
            return Ok(ScheduleOutcome::NotEligible);
        }
        if self.permission == NotificationPermission::Denied {
            return Err(SchedulingError::PermissionDenied);
        }

        let due = task.due_at().ok_or_else(|| SchedulingError::InvalidDate {
            task_id: task.id.clone(),
            value: task.date.clone(),
        })?;
        let Some(trigger) = ReminderTrigger::for_recurrence(task.repeat, due.naive_local()) else {
            return Ok(ScheduleOutcome::NotEligible);
        };

        self.center
            .register(build_request(task, trigger))
            .map_err(SchedulingError::Backend)?;
        Ok(ScheduleOutcome::Scheduled(trigger))
    }

    /// Removes any registration for `task_id`. Missing registrations are
    /// ignored.
    pub fn cancel(&self, task_id: &str) {
        let identifier = reminder_identifier(task_id);
        match self.center.cancel(&identifier) {
            Ok(()) => {
                info!("event=reminder_cancel module=reminder status=ok task_id={task_id}");
            }
            Err(NotificationError::NotFound(_)) => {
                debug!(
                    "event=reminder_cancel module=reminder status=skip task_id={task_id} reason=not_registered"
                );
            }
            Err(err) => {
                warn!(
                    "event=reminder_cancel module=reminder status=error task_id={task_id} error={err}"
                );
            }
        }
    }
}

fn build_request(task: &Task, trigger: ReminderTrigger) -> ReminderRequest {
    ReminderRequest {
        identifier: reminder_identifier(&task.id),
        content: ReminderContent {
            title: REMINDER_TITLE.to_string(),
            body: task.title.clone(),
            subtitle: task
                .repeat
                .is_recurring()
                .then(|| format!("({})", task.repeat)),
            payload: ReminderPayload::for_task(&task.id),
        },
        trigger,
    }
}
