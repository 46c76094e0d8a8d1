//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where tasks are stored, how logging is set up, and which
//!   reschedule policy the cache follows.
//! - Load overrides from environment variables or a JSON document.
//!
//! # Invariants
//! - Every field has a usable default; loading never panics.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB: &str = "TASKMINDER_DB";
pub const ENV_LOG_LEVEL: &str = "TASKMINDER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKMINDER_LOG_DIR";
pub const ENV_RESCHEDULE: &str = "TASKMINDER_RESCHEDULE";
pub const ENV_NOTIFICATIONS: &str = "TASKMINDER_NOTIFICATIONS";

const DEFAULT_DB_FILE_NAME: &str = "taskminder.sqlite3";
const IN_MEMORY_MARKER: &str = ":memory:";

/// When the cache re-runs reminder scheduling after a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReschedulePolicy {
    /// Reschedule only when `date` or `repeat` changed; toggling back to
    /// not-done leaves the task without a reminder.
    #[default]
    ChangedFields,
    /// Reschedule after every toggle and update.
    Always,
}

impl ReschedulePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "changed_fields" | "changed-fields" => Some(Self::ChangedFields),
            "always" => Some(Self::Always),
            _ => None,
        }
    }
}

/// Backing store location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

impl Default for DatabaseLocation {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_DB_FILE_NAME))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::Parse(err) => write!(f, "invalid configuration document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseLocation,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub reschedule_policy: ReschedulePolicy,
    /// Whether the platform granted notification rights at setup.
    pub notifications_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseLocation::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            reschedule_policy: ReschedulePolicy::default(),
            notifications_enabled: true,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON configuration document; missing keys keep defaults.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(document).map_err(ConfigError::Parse)
    }

    /// Default configuration overlaid with `TASKMINDER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_DB) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::InvalidValue { key: ENV_DB, value });
            }
            self.database = if trimmed == IN_MEMORY_MARKER {
                DatabaseLocation::InMemory
            } else {
                DatabaseLocation::File(PathBuf::from(trimmed))
            };
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            let trimmed = value.trim();
            self.log_dir = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }
        if let Some(value) = lookup(ENV_RESCHEDULE) {
            self.reschedule_policy =
                ReschedulePolicy::parse(&value).ok_or(ConfigError::InvalidValue {
                    key: ENV_RESCHEDULE,
                    value,
                })?;
        }
        if let Some(value) = lookup(ENV_NOTIFICATIONS) {
            self.notifications_enabled = match value.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_NOTIFICATIONS,
                        value,
                    })
                }
            };
        }
        Ok(self)
    }
}
