use crate::config::WebSocketConfig;
use crate::connection::state::{Action, ConnectionState, Input, StateMachine, StatusSnapshot};
use crate::message::{decode, MessageType, WsMessage};
use crate::subscription::{SubscriberRegistry, Subscription};
use crate::transport::{Outbound, Transport, TransportEvent, WsTransport, CLOSE_NORMAL};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};


/// Reason sent with the close frame on an intentional disconnect
const DISCONNECT_REASON: &str = "User disconnect";

/// Manages the single push connection to the office backend.
///
/// # Responsibilities
/// - Keep at most one live transport
/// - Heartbeat pings while connected
/// - Fixed-delay reconnect after involuntary closes, bounded by
///   `max_reconnect_attempts`
/// - Fan out inbound messages to the subscriber registry
///
/// Cheap to clone; all clones drive the same connection. No operation
/// returns an error: failures surface as state changes and log lines.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    config: WebSocketConfig,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    registry: Arc<SubscriberRegistry>,
    status_tx: watch::Sender<StatusSnapshot>,
    /// Connection handle, counter and timers; single writer at a time
    inner: Mutex<Inner>,
}

struct Inner {
    machine: StateMachine,
    /// Bumped on every open and disconnect; events and timers created under
    /// an older generation are ignored
    generation: u64,
    token: Option<String>,
    link: Option<Link>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

struct Link {
    outbound: mpsc::UnboundedSender<Outbound>,
    open: bool,
    pump: JoinHandle<()>,
}

impl ConnectionManager {
    /// Creates a manager on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use [`with_runtime`]
    /// from plain threads.
    ///
    /// [`with_runtime`]: ConnectionManager::with_runtime
    pub fn new(config: WebSocketConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_runtime(config, transport, Handle::current())
    }

    /// Creates a manager that spawns its socket and timer tasks on `runtime`.
    pub fn with_runtime(
        config: WebSocketConfig,
        transport: Arc<dyn Transport>,
        runtime: Handle,
    ) -> Self {
        let machine = StateMachine::new(config.max_reconnect_attempts);
        let (status_tx, _) = watch::channel(machine.snapshot());

        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                runtime,
                registry: Arc::new(SubscriberRegistry::new()),
                status_tx,
                inner: Mutex::new(Inner {
                    machine,
                    generation: 0,
                    token: None,
                    link: None,
                    heartbeat: None,
                    reconnect: None,
                }),
            }),
        }
    }

    /// Manager backed by the tokio-tungstenite transport
    pub fn websocket(config: WebSocketConfig) -> Self {
        Self::new(config, Arc::new(WsTransport::new()))
    }

    /// Open the connection with `token`.
    ///
    /// No-op while a transport is already open or opening.
    pub fn connect(&self, token: &str) {
        let mut inner = self.shared.lock();
        self.shared.connect_locked(&mut inner, token);
    }

    /// Close the connection intentionally (code 1000).
    ///
    /// Cancels heartbeat and any pending reconnect, resets the attempt
    /// counter. Safe to call in any state.
    pub fn disconnect(&self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;

        let actions = inner.machine.apply(Input::Disconnect);
        self.shared.execute(&mut inner, actions);
        self.shared.publish(&inner);

        info!("Disconnected by client");
    }

    /// Register `handler` for every message of `msg_type`.
    ///
    /// Subscriptions survive reconnects.
    pub fn subscribe<F>(&self, msg_type: MessageType, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(msg_type, handler)
    }

    /// Like [`subscribe`](ConnectionManager::subscribe), decoding the payload
    /// into `T` first. Payloads that do not decode are logged and skipped.
    pub fn subscribe_typed<T, F>(&self, msg_type: MessageType, handler: F) -> Subscription
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let tag = msg_type.clone();
        self.subscribe(msg_type, move |payload| match T::deserialize(payload) {
            Ok(value) => handler(value),
            Err(e) => warn!(msg_type = %tag, error = %e, "Payload did not match subscriber type"),
        })
    }

    /// Send `message` if the transport is open; otherwise drop it with a warning.
    pub fn send(&self, message: &WsMessage) {
        let inner = self.shared.lock();
        self.shared.send_locked(&inner, message);
    }

    pub fn status(&self) -> ConnectionState {
        self.shared.lock().machine.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.lock().machine.reconnect_attempts()
    }

    /// Watch state and attempt-count changes
    pub fn watch_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.shared.status_tx.subscribe()
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.shared.registry
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.shared.config
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        let snapshot = inner.machine.snapshot();
        self.status_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    fn connect_locked(self: &Arc<Self>, inner: &mut Inner, token: &str) {
        let actions = inner.machine.apply(Input::Connect);
        if actions.is_empty() {
            debug!(state = %inner.machine.state(), "Connect ignored, transport already active");
            return;
        }

        inner.token = Some(token.to_string());
        self.execute(inner, actions);
        self.publish(inner);
    }

    fn send_locked(&self, inner: &Inner, message: &WsMessage) {
        let link = match inner.link.as_ref().filter(|link| link.open) {
            Some(link) => link,
            None => {
                warn!(msg_type = %message.msg_type, "Cannot send, not connected");
                return;
            }
        };

        match message.to_json() {
            Ok(json) => {
                if link.outbound.send(Outbound::Text(json)).is_err() {
                    warn!(msg_type = %message.msg_type, "Cannot send, transport already closed");
                }
            }
            Err(e) => error!(msg_type = %message.msg_type, error = %e, "Failed to serialize message"),
        }
    }

    /// Carry out the side effects chosen by the state machine
    fn execute(self: &Arc<Self>, inner: &mut Inner, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::CancelTimers => {
                    if let Some(handle) = inner.heartbeat.take() {
                        handle.abort();
                    }
                    if let Some(handle) = inner.reconnect.take() {
                        handle.abort();
                    }
                }
                Action::OpenTransport => self.open_transport(inner),
                Action::CloseTransport => {
                    if let Some(link) = inner.link.take() {
                        let _ = link.outbound.send(Outbound::Close {
                            code: CLOSE_NORMAL,
                            reason: DISCONNECT_REASON.to_string(),
                        });
                        link.pump.abort();
                    }
                }
                Action::StartHeartbeat => {
                    let period = self.config.ping_interval();
                    let handle = self.runtime.spawn(run_heartbeat(
                        Arc::downgrade(self),
                        inner.generation,
                        period,
                    ));
                    inner.heartbeat = Some(handle);
                }
                Action::ScheduleReconnect => {
                    let delay = self.config.reconnect_interval();
                    info!(
                        attempt = inner.machine.reconnect_attempts(),
                        max_attempts = self.config.max_reconnect_attempts,
                        delay_ms = self.config.reconnect_interval_ms,
                        "Scheduling reconnect"
                    );
                    let handle = self.runtime.spawn(run_reconnect_timer(
                        Arc::downgrade(self),
                        inner.generation,
                        delay,
                    ));
                    inner.reconnect = Some(handle);
                }
            }
        }
    }

    fn open_transport(self: &Arc<Self>, inner: &mut Inner) {
        inner.generation += 1;
        let generation = inner.generation;

        let token = inner.token.as_deref().unwrap_or_default();
        let url = self.config.endpoint_with_token(token);

        info!(endpoint = %self.config.url, generation = generation, "Opening connection");

        let link = {
            let _guard = self.runtime.enter();
            self.transport.open(&url)
        };
        let pump = self
            .runtime
            .spawn(pump_events(Arc::downgrade(self), generation, link.events));

        inner.link = Some(Link {
            outbound: link.outbound,
            open: false,
            pump,
        });
    }

    fn on_transport_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => self.on_message(generation, &text),
            TransportEvent::Opened => self.transition(generation, Input::Opened),
            TransportEvent::Error(e) => {
                error!(error = %e, "WebSocket error");
                self.transition(generation, Input::Failed);
            }
            TransportEvent::Closed { code, reason } => {
                info!(code = code, reason = %reason, "WebSocket disconnected");
                self.transition(generation, Input::Closed { code });
            }
        }
    }

    fn transition(self: &Arc<Self>, generation: u64, input: Input) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation = generation, "Ignoring event from stale transport");
            return;
        }

        match input {
            Input::Opened => {
                if let Some(link) = inner.link.as_mut() {
                    link.open = true;
                }
                info!("WebSocket connected");
            }
            Input::Closed { .. } => {
                // Pump is the caller; let it finish on its own
                inner.link = None;
            }
            _ => {}
        }

        let actions = inner.machine.apply(input);
        self.execute(&mut inner, actions);
        self.publish(&inner);
    }

    fn on_message(&self, generation: u64, text: &str) {
        if self.lock().generation != generation {
            return;
        }

        match decode(text) {
            Ok(message) => {
                debug!(msg_type = %message.msg_type, message_id = %message.id, "Message received");
                self.registry.dispatch(&message);
            }
            Err(e) => warn!(error = %e, "Dropping undecodable message"),
        }
    }

    /// Heartbeat tick. Returns false once this heartbeat is obsolete.
    fn heartbeat(&self, generation: u64) -> bool {
        let inner = self.lock();
        if inner.generation != generation || inner.machine.state() != ConnectionState::Connected {
            return false;
        }
        self.send_locked(&inner, &WsMessage::ping());
        true
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut inner = self.lock();
        // Running as this task; drop the handle rather than abort ourselves
        inner.reconnect.take();

        if inner.generation != generation || inner.machine.state() != ConnectionState::Reconnecting {
            debug!(generation = generation, "Ignoring stale reconnect timer");
            return;
        }

        let Some(token) = inner.token.clone() else {
            warn!("Reconnect fired without a token");
            return;
        };

        info!(attempt = inner.machine.reconnect_attempts(), "Reconnecting");
        self.connect_locked(&mut inner, &token);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = inner.heartbeat.take() {
            handle.abort();
        }
        if let Some(handle) = inner.reconnect.take() {
            handle.abort();
        }
        // Dropping the outbound sender closes the socket with 1000
        if let Some(link) = inner.link.take() {
            link.pump.abort();
        }
    }
}

/// Forward transport events to the manager in delivery order
async fn pump_events(
    shared: Weak<Shared>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.on_transport_event(generation, event);
    }
}

async fn run_heartbeat(shared: Weak<Shared>, generation: u64, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // consume immediate first tick

    loop {
        ticker.tick().await;

        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !shared.heartbeat(generation) {
            break;
        }
    }
}

async fn run_reconnect_timer(shared: Weak<Shared>, generation: u64, delay: Duration) {
    sleep(delay).await;

    if let Some(shared) = shared.upgrade() {
        shared.fire_reconnect(generation);
    }
}
