use super::{
    Outbound, Transport, TransportEvent, TransportLink, CLOSE_ABNORMAL, CLOSE_NORMAL,
    CLOSE_NO_STATUS,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// `Transport` backed by tokio-tungstenite.
///
/// Each `open` spawns one socket task that owns the stream until close.
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WsTransport {
    fn open(&self, url: &str) -> TransportLink {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(url.to_string(), outbound_rx, events_tx));

        TransportLink {
            outbound: outbound_tx,
            events: events_rx,
        }
    }
}

/// Strip the query string so tokens never reach the logs
fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Socket task: handshake, then pump frames both ways until either side closes.
async fn run_socket(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let endpoint = redact(&url).to_string();

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "WebSocket handshake failed");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            let _ = events.send(TransportEvent::Closed {
                code: CLOSE_ABNORMAL,
                reason: "handshake failed".to_string(),
            });
            return;
        }
    };

    info!(endpoint = %endpoint, "WebSocket connected");
    let _ = events.send(TransportEvent::Opened);

    let (mut sink, mut stream) = stream.split();

    let (code, reason) = loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        warn!(error = %e, "WebSocket write failed");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break (CLOSE_ABNORMAL, e.to_string());
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    send_close(&mut sink, code, &reason).await;
                    break (code, reason);
                }
                None => {
                    // Link dropped by its owner
                    send_close(&mut sink, CLOSE_NORMAL, "").await;
                    break (CLOSE_NORMAL, String::new());
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                        None => (CLOSE_NO_STATUS, String::new()),
                    };
                }
                Some(Ok(_)) => {
                    // Ignore binary, ping, pong frames
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break (CLOSE_ABNORMAL, e.to_string());
                }
                None => break (CLOSE_ABNORMAL, "connection reset".to_string()),
            },
        }
    };

    // Flush any pending close handshake reply; errors here are expected once closed
    let _ = sink.close().await;

    debug!(endpoint = %endpoint, code = code, reason = %reason, "WebSocket closed");
    let _ = events.send(TransportEvent::Closed { code, reason });
}

async fn send_close(sink: &mut WsSink, code: u16, reason: &str) {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Failed to send close frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_strips_token() {
        assert_eq!(redact("ws://host:8080/api/v1/ws?token=secret"), "ws://host:8080/api/v1/ws");
        assert_eq!(redact("ws://host/ws"), "ws://host/ws");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error_then_close() {
        // Grab a free port, then release it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut link = WsTransport::new().open(&format!("ws://127.0.0.1:{}/ws?token=t", port));

        match link.events.recv().await {
            Some(TransportEvent::Error(_)) => {}
            other => panic!("Expected Error, got {:?}", other),
        }
        assert_eq!(
            link.events.recv().await,
            Some(TransportEvent::Closed {
                code: CLOSE_ABNORMAL,
                reason: "handshake failed".to_string()
            })
        );
        assert_eq!(link.events.recv().await, None);
    }
}
