//! Platform notification facility contract and in-process implementation.
//!
//! # Responsibility
//! - Define the seam the scheduler registers and cancels reminders through.
//! - Provide an in-memory center that records pending registrations and can
//!   simulate a delivery.
//!
//! # Invariants
//! - Registering an identifier that is already pending replaces it.
//! - Cancelling an unknown identifier reports `NotificationError::NotFound`.

use crate::reminder::payload::ReminderPayload;
use crate::reminder::trigger::ReminderTrigger;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// User-visible content of one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderContent {
    pub title: String,
    pub body: String,
    pub subtitle: Option<String>,
    pub payload: ReminderPayload,
}

/// One registration handed to the notification facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub identifier: String,
    pub content: ReminderContent,
    pub trigger: ReminderTrigger,
}

/// Errors reported by a notification facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// No registration exists for the identifier.
    NotFound(String),
    /// The facility refused the registration or cancellation.
    Rejected(String),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(identifier) => write!(f, "no reminder registered as `{identifier}`"),
            Self::Rejected(message) => write!(f, "notification facility rejected request: {message}"),
        }
    }
}

impl Error for NotificationError {}

/// Platform-level reminder registry.
pub trait NotificationCenter: Send + Sync {
    fn register(&self, request: ReminderRequest) -> Result<(), NotificationError>;
    fn cancel(&self, identifier: &str) -> Result<(), NotificationError>;
}

/// In-process notification center keyed by reminder identifier.
#[derive(Debug, Default)]
pub struct InMemoryNotificationCenter {
    pending: Mutex<BTreeMap<String, ReminderRequest>>,
}

impl InMemoryNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending registrations sorted by identifier.
    pub fn pending(&self) -> Vec<ReminderRequest> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, identifier: &str) -> Option<ReminderRequest> {
        self.lock().get(identifier).cloned()
    }

    pub fn is_pending(&self, identifier: &str) -> bool {
        self.lock().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Simulates the platform firing a pending reminder.
    ///
    /// Returns the payload data the platform would route back, or `None` when
    /// nothing is registered under `identifier`. Recurring registrations stay
    /// pending after delivery.
    pub fn deliver(&self, identifier: &str) -> Option<Value> {
        let pending = self.lock();
        let data = pending.get(identifier)?.content.payload.to_value();
        debug!("event=reminder_deliver module=reminder status=ok identifier={identifier}");
        Some(data)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ReminderRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationCenter for InMemoryNotificationCenter {
    fn register(&self, request: ReminderRequest) -> Result<(), NotificationError> {
        self.lock().insert(request.identifier.clone(), request);
        Ok(())
    }

    fn cancel(&self, identifier: &str) -> Result<(), NotificationError> {
        self.lock()
            .remove(identifier)
            .map(|_| ())
            .ok_or_else(|| NotificationError::NotFound(identifier.to_string()))
    }
}
