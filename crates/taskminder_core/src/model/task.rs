//! Task domain model.
//!
//! # Responsibility
//! - Define the task record shared by repository, scheduler and cache.
//! - Validate creation input and partial updates before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `title` is non-empty after trimming.
//! - Validated `date` values are stored in canonical UTC form.
//! - A task is reminder-eligible only when it is not done and recurs.

use crate::model::date::{normalize_task_date, parse_task_date};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Opaque stable task identifier.
pub type TaskId = String;

/// Recurrence policy of a task reminder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// One-off task, never reminded.
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Repeat {
    /// Stable string id used in storage and payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl Display for Repeat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Repeat {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(TaskValidationError::InvalidRepeat(other.to_string())),
        }
    }
}

/// Validation errors for task input and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    InvalidDate(String),
    InvalidRepeat(String),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::InvalidDate(value) => write!(f, "task date is not a valid timestamp: `{value}`"),
            Self::InvalidRepeat(value) => {
                write!(f, "unsupported repeat `{value}`; expected none|daily|weekly|monthly")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    /// ISO-8601 text. Canonical UTC for every record written by this crate.
    pub date: String,
    pub repeat: Repeat,
    pub done: bool,
    /// Set once a reminder for this task has been delivered.
    pub notified: bool,
    pub created_at: String,
}

impl Task {
    /// Due timestamp in local time, or `None` when the stored text is
    /// unparsable.
    pub fn due_at(&self) -> Option<DateTime<Local>> {
        parse_task_date(&self.date).map(|instant| instant.with_timezone(&Local))
    }

    /// Returns whether the due timestamp falls on `day` in local time.
    pub fn falls_on(&self, day: NaiveDate) -> bool {
        self.due_at()
            .is_some_and(|due| due.date_naive() == day)
    }

    /// Returns whether a reminder may be active for this task.
    pub fn is_reminder_eligible(&self) -> bool {
        !self.done && self.repeat.is_recurring()
    }

    /// Merges the provided fields into this record.
    ///
    /// The patch is expected to be normalized already.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(date) = &patch.date {
            self.date = date.clone();
        }
        if let Some(repeat) = patch.repeat {
            self.repeat = repeat;
        }
        if let Some(done) = patch.done {
            self.done = done;
        }
        if let Some(notified) = patch.notified {
            self.notified = notified;
        }
    }
}

/// Creation input for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Any accepted date input; normalized on validation.
    pub date: String,
    pub repeat: Repeat,
}

impl NewTask {
    /// Creates a one-off task input.
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            date: date.into(),
            repeat: Repeat::None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Returns a copy with trimmed title and canonical date.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank.
    /// - `InvalidDate` when the date does not parse.
    pub fn normalized(&self) -> Result<Self, TaskValidationError> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            description: self.description.clone(),
            date: normalize_date(&self.date)?,
            repeat: self.repeat,
        })
    }
}

/// Partial update for one task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub date: Option<String>,
    pub repeat: Option<Repeat>,
    pub done: Option<bool>,
    pub notified: Option<bool>,
}

impl TaskPatch {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    pub fn with_notified(mut self, notified: bool) -> Self {
        self.notified = Some(notified);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.repeat.is_none()
            && self.done.is_none()
            && self.notified.is_none()
    }

    /// Returns whether this patch changes what a reminder trigger is built
    /// from (`date` or `repeat`).
    pub fn touches_schedule(&self) -> bool {
        self.date.is_some() || self.repeat.is_some()
    }

    /// Returns a copy with trimmed title and canonical date.
    pub fn normalized(&self) -> Result<Self, TaskValidationError> {
        let mut normalized = self.clone();
        if let Some(title) = &self.title {
            normalized.title = Some(normalize_title(title)?);
        }
        if let Some(date) = &self.date {
            normalized.date = Some(normalize_date(date)?);
        }
        Ok(normalized)
    }
}

fn normalize_title(title: &str) -> Result<String, TaskValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_date(date: &str) -> Result<String, TaskValidationError> {
    normalize_task_date(date).ok_or_else(|| TaskValidationError::InvalidDate(date.to_string()))
}
