// Configuration loading and env overrides
pub mod config;

// Connection lifecycle, heartbeat and reconnect
pub mod connection;

// Wire envelope, message types and typed payloads
pub mod message;

// Per-type handler registry
pub mod subscription;

// Socket abstraction and the tokio-tungstenite implementation
pub mod transport;

pub use config::{AppConfig, WebSocketConfig};
pub use connection::{global, install_global, ConnectionManager, ConnectionState, StatusSnapshot};
pub use message::{MessageType, WsMessage};
pub use subscription::Subscription;
