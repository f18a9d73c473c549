//! Typed payloads for the push types the office UI consumes.
//!
//! Use with `ConnectionManager::subscribe_typed`.

use serde::{Deserialize, Serialize};

/// Payload of `task.update`, `task.created` and `task.completed`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdatePayload {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    /// Percent complete (0-100)
    pub progress: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    #[serde(untagged)]
    Other(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Payload of `employee.update`, `employee.online` and `employee.offline`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmployeeUpdatePayload {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<String>,
}

/// Payload of `chat.message` and `chat.response`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub session_id: String,
    pub content: String,
    pub role: ChatRole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Payload of `notification`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}
