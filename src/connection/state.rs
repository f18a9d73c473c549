use crate::transport::CLOSE_NORMAL;
use serde::Serialize;
use std::fmt;

/// Connection lifecycle state, as observed by consumers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Point-in-time view published to status watchers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
}

/// Inputs to the state machine: explicit calls plus translated transport events
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Connect,
    Disconnect,
    Opened,
    Closed { code: u16 },
    Failed,
}

/// Side effects the manager performs after a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    OpenTransport,
    CloseTransport,
    StartHeartbeat,
    CancelTimers,
    ScheduleReconnect,
}

/// Pure connection state machine.
///
/// Owns the state, the reconnect counter and whether a transport is live.
/// Knows nothing about sockets or timers; `apply` returns the actions the
/// caller must carry out.
#[derive(Clone, Debug)]
pub struct StateMachine {
    state: ConnectionState,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
    transport_live: bool,
}

impl StateMachine {
    pub fn new(max_reconnect_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            transport_live: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// True from `Connect` until the transport reports `Closed` or is dropped
    pub fn transport_live(&self) -> bool {
        self.transport_live
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            reconnect_attempts: self.reconnect_attempts,
        }
    }

    pub fn apply(&mut self, input: Input) -> Vec<Action> {
        match input {
            Input::Connect => {
                // Already open or opening
                if self.transport_live {
                    return Vec::new();
                }
                self.state = ConnectionState::Connecting;
                self.transport_live = true;
                vec![Action::CancelTimers, Action::OpenTransport]
            }

            Input::Opened => {
                if !self.transport_live {
                    return Vec::new();
                }
                self.state = ConnectionState::Connected;
                self.reconnect_attempts = 0;
                vec![Action::StartHeartbeat]
            }

            Input::Failed => {
                if !self.transport_live {
                    return Vec::new();
                }
                self.state = ConnectionState::Error;
                Vec::new()
            }

            Input::Closed { code } => {
                if !self.transport_live {
                    return Vec::new();
                }
                self.transport_live = false;

                if code != CLOSE_NORMAL && self.reconnect_attempts < self.max_reconnect_attempts {
                    self.state = ConnectionState::Reconnecting;
                    self.reconnect_attempts += 1;
                    vec![Action::CancelTimers, Action::ScheduleReconnect]
                } else {
                    self.state = ConnectionState::Disconnected;
                    vec![Action::CancelTimers]
                }
            }

            Input::Disconnect => {
                let mut actions = Vec::with_capacity(2);
                if self.transport_live {
                    actions.push(Action::CloseTransport);
                }
                actions.push(Action::CancelTimers);

                self.transport_live = false;
                self.reconnect_attempts = 0;
                self.state = ConnectionState::Disconnected;
                actions
            }
        }
    }
}
