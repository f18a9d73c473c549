use crate::message::{MessageType, WsMessage};
use dashmap::DashMap;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Callback invoked with the payload of each matching message
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Maps message types to the handlers interested in them.
///
/// Outlives any single socket: subscriptions survive reconnects.
pub struct SubscriberRegistry {
    handlers: DashMap<MessageType, Vec<(u64, Handler)>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` under `msg_type`.
    ///
    /// The returned handle removes exactly this registration.
    pub fn subscribe<F>(self: &Arc<Self>, msg_type: MessageType, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .entry(msg_type.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        debug!(msg_type = %msg_type, subscription_id = id, "Handler subscribed");

        Subscription {
            registry: Arc::downgrade(self),
            msg_type,
            id,
        }
    }

    fn remove(&self, msg_type: &MessageType, id: u64) -> bool {
        let mut removed = false;
        if let Some(mut entry) = self.handlers.get_mut(msg_type) {
            let before = entry.len();
            entry.retain(|(handler_id, _)| *handler_id != id);
            removed = entry.len() != before;
        }
        // Drop the type entry once its last handler is gone
        self.handlers.remove_if(msg_type, |_, handlers| handlers.is_empty());

        if removed {
            debug!(msg_type = %msg_type, subscription_id = id, "Handler unsubscribed");
        }
        removed
    }

    /// Invoke every handler registered for the message's type.
    ///
    /// Handlers run without any registry lock held, so they may subscribe or
    /// unsubscribe freely. A panicking handler is logged and skipped.
    /// Returns the number of handlers that completed.
    pub fn dispatch(&self, message: &WsMessage) -> usize {
        let snapshot: Vec<Handler> = match self.handlers.get(&message.msg_type) {
            Some(entry) => entry.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        let mut completed = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(&message.payload))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    error!(
                        msg_type = %message.msg_type,
                        message_id = %message.id,
                        panic = panic_message(&*panic),
                        "Subscriber handler panicked"
                    );
                }
            }
        }
        completed
    }

    /// Number of handlers registered for `msg_type`
    pub fn handler_count(&self, msg_type: &MessageType) -> usize {
        self.handlers.get(msg_type).map_or(0, |entry| entry.len())
    }

    pub fn contains(&self, msg_type: &MessageType) -> bool {
        self.handlers.contains_key(msg_type)
    }

    /// Number of types with at least one handler
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&self) {
        self.handlers.clear();
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle for one registration, returned by `subscribe`.
///
/// Dropping it keeps the handler registered; call `unsubscribe` to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    msg_type: MessageType,
    id: u64,
}

impl Subscription {
    pub fn msg_type(&self) -> &MessageType {
        &self.msg_type
    }

    /// Remove this handler. Returns false if it was already gone
    /// (e.g. the registry was cleared or dropped).
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(&self.msg_type, self.id),
            None => false,
        }
    }
}
