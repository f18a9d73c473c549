use super::WsMessage;
use serde_json::error::Category;
use std::fmt;

/// Reasons an inbound frame is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Not parseable as JSON
    Malformed(String),
    /// Valid JSON, but not a message envelope (missing or mistyped fields)
    InvalidShape(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(e) => write!(f, "malformed JSON: {}", e),
            DecodeError::InvalidShape(e) => write!(f, "invalid message envelope: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            Category::Data => DecodeError::InvalidShape(e.to_string()),
            Category::Io | Category::Syntax | Category::Eof => DecodeError::Malformed(e.to_string()),
        }
    }
}

/// Decode a text frame into a message envelope.
///
/// Requires `id`, `type`, `payload` (may be `null`) and `timestamp`. Neither
/// the id nor the timestamp is otherwise validated.
pub fn decode(text: &str) -> Result<WsMessage, DecodeError> {
    Ok(serde_json::from_str(text)?)
}
