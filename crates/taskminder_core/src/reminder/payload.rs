//! Reminder payload routed back to the app on user interaction.
//!
//! Wire shape: `{ "taskId": "...", "route": "task", "params": { "id": "..." } }`.

use crate::model::task::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Route name carried by every task reminder.
pub const TASK_ROUTE: &str = "task";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRouteParams {
    pub id: TaskId,
}

/// Opaque data attached to a reminder registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub task_id: TaskId,
    pub route: String,
    pub params: ReminderRouteParams,
}

impl ReminderPayload {
    pub fn for_task(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            route: TASK_ROUTE.to_string(),
            params: ReminderRouteParams {
                id: task_id.to_string(),
            },
        }
    }

    /// JSON form handed to the platform.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "taskId": self.task_id,
            "route": self.route,
            "params": { "id": self.params.id },
        })
    }
}

/// Extracts the task id from notification data returned by the platform.
///
/// Accepts a full payload or a partial one carrying only `taskId` or only
/// `params.id`. Returns `None` when no non-empty id is present.
pub fn route_notification_response(data: &Value) -> Option<TaskId> {
    let from_task_id = data.get("taskId").and_then(Value::as_str);
    let from_params = data
        .get("params")
        .and_then(|params| params.get("id"))
        .and_then(Value::as_str);

    from_task_id
        .or(from_params)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
