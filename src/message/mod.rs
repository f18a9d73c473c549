use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

mod decode;
pub mod payload;
#[cfg(test)]
mod tests;

pub use decode::{decode, DecodeError};
pub use payload::{
    ChatMessagePayload, ChatRole, EmployeeUpdatePayload, NotificationLevel, NotificationPayload,
    TaskStatus, TaskUpdatePayload,
};

/// WsMessage is the envelope pushed in both directions over the socket.
///
/// The envelope is fixed; `payload` is opaque to the connection layer and
/// only interpreted by subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    /// Sender-assigned identifier. Client messages use UUIDv4; server ids
    /// are passed through unchecked.
    pub id: String,

    #[serde(rename = "type")]
    pub msg_type: MessageType,

    pub payload: Value,

    /// ISO-8601 send time, passed through as sent
    pub timestamp: String,
}

impl WsMessage {
    /// Build a client-originated message with a fresh id and the current time.
    pub fn new(msg_type: MessageType, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            msg_type,
            payload,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Heartbeat message
    pub fn ping() -> Self {
        Self::new(MessageType::Ping, Value::Object(Default::default()))
    }

    /// The timestamp as UTC, when it is RFC 3339 with an offset
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Message type tag.
///
/// Tags the client does not know about are kept verbatim in `Other` so they
/// still decode and simply reach no subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    TaskUpdate,
    TaskCreated,
    TaskCompleted,
    EmployeeUpdate,
    EmployeeOnline,
    EmployeeOffline,
    ChatMessage,
    ChatResponse,
    Notification,
    Ping,
    Pong,
    Other(String),
}

impl MessageType {
    /// Types the server pushes to clients
    pub const INBOUND: [MessageType; 10] = [
        MessageType::TaskUpdate,
        MessageType::TaskCreated,
        MessageType::TaskCompleted,
        MessageType::EmployeeUpdate,
        MessageType::EmployeeOnline,
        MessageType::EmployeeOffline,
        MessageType::ChatMessage,
        MessageType::ChatResponse,
        MessageType::Notification,
        MessageType::Pong,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MessageType::TaskUpdate => "task.update",
            MessageType::TaskCreated => "task.created",
            MessageType::TaskCompleted => "task.completed",
            MessageType::EmployeeUpdate => "employee.update",
            MessageType::EmployeeOnline => "employee.online",
            MessageType::EmployeeOffline => "employee.offline",
            MessageType::ChatMessage => "chat.message",
            MessageType::ChatResponse => "chat.response",
            MessageType::Notification => "notification",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
            MessageType::Other(tag) => tag,
        }
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        match tag {
            "task.update" => MessageType::TaskUpdate,
            "task.created" => MessageType::TaskCreated,
            "task.completed" => MessageType::TaskCompleted,
            "employee.update" => MessageType::EmployeeUpdate,
            "employee.online" => MessageType::EmployeeOnline,
            "employee.offline" => MessageType::EmployeeOffline,
            "chat.message" => MessageType::ChatMessage,
            "chat.response" => MessageType::ChatResponse,
            "notification" => MessageType::Notification,
            "ping" => MessageType::Ping,
            "pong" => MessageType::Pong,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match MessageType::from(tag.as_str()) {
            MessageType::Other(_) => MessageType::Other(tag),
            known => known,
        }
    }
}

impl From<MessageType> for String {
    fn from(msg_type: MessageType) -> Self {
        match msg_type {
            MessageType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
