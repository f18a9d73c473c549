// Transport seam between the connection manager and a real socket

mod websocket;

pub use websocket::WsTransport;

use tokio::sync::mpsc;

/// Close code for an intentional, clean shutdown
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when a close frame carried no status
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the connection dropped without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Lifecycle events emitted by an open link.
///
/// A link emits at most one `Opened`, any number of `Message`/`Error`, and
/// always finishes with exactly one `Closed`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed { code: u16, reason: String },
    Error(String),
}

/// Commands accepted by an open link
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// Both ends of a transport as seen by the manager.
///
/// Dropping `outbound` asks the transport to close with 1000.
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports. Called from within the manager's Tokio runtime, so
/// implementations may spawn tasks; `open` itself must not block.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, url: &str) -> TransportLink;
}
