// Connection lifecycle: state machine, manager, process-wide access point

mod manager;
mod state;

pub use manager::ConnectionManager;
pub use state::{Action, ConnectionState, Input, StateMachine, StatusSnapshot};

use std::sync::OnceLock;

static GLOBAL: OnceLock<ConnectionManager> = OnceLock::new();

/// Install the process-wide manager.
///
/// Only the first call succeeds; later calls hand the rejected manager back.
pub fn install_global(manager: ConnectionManager) -> Result<(), ConnectionManager> {
    GLOBAL.set(manager)
}

/// The process-wide manager, if one was installed
pub fn global() -> Option<&'static ConnectionManager> {
    GLOBAL.get()
}
