use anyhow::{Context, Result};
use corplink::config::{apply_env_overrides, load_config, AppConfig};
use corplink::message::{
    EmployeeUpdatePayload, MessageType, NotificationLevel, NotificationPayload, TaskUpdatePayload,
};
use corplink::{install_global, ConnectionManager, Subscription};
use serde_json::Value;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corplink=info".into()),
        )
        .init();

    info!("corplink monitor starting...");

    let mut config = match std::env::var("CORPLINK_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => AppConfig::default(),
    };
    apply_env_overrides(&mut config.websocket);

    let token = std::env::var("CORPLINK_TOKEN").context("CORPLINK_TOKEN must be set")?;

    info!(
        endpoint = %config.websocket.url,
        reconnect_interval_ms = config.websocket.reconnect_interval_ms,
        max_reconnect_attempts = config.websocket.max_reconnect_attempts,
        "Configuration loaded"
    );

    let manager = ConnectionManager::websocket(config.websocket.clone());
    if install_global(manager.clone()).is_err() {
        anyhow::bail!("Connection manager already installed");
    }

    let _subscriptions: Vec<Subscription> = config
        .monitor
        .types
        .iter()
        .cloned()
        .map(|msg_type| subscribe_logger(&manager, msg_type))
        .collect();

    // Report state changes until the manager goes away
    let mut status = manager.watch_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let snapshot = *status.borrow_and_update();
            info!(
                state = %snapshot.state,
                reconnect_attempts = snapshot.reconnect_attempts,
                "Connection state changed"
            );
        }
    });

    manager.connect(&token);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    manager.disconnect();

    Ok(())
}

/// Log every message of `msg_type`, decoding the payloads the monitor knows
fn subscribe_logger(manager: &ConnectionManager, msg_type: MessageType) -> Subscription {
    match msg_type {
        MessageType::TaskUpdate | MessageType::TaskCreated | MessageType::TaskCompleted => {
            let tag = msg_type.clone();
            manager.subscribe_typed(msg_type, move |task: TaskUpdatePayload| {
                info!(
                    msg_type = %tag,
                    task_id = %task.id,
                    title = %task.title,
                    status = ?task.status,
                    progress = task.progress,
                    "Task"
                );
            })
        }
        MessageType::EmployeeUpdate | MessageType::EmployeeOnline | MessageType::EmployeeOffline => {
            let tag = msg_type.clone();
            manager.subscribe_typed(msg_type, move |employee: EmployeeUpdatePayload| {
                info!(
                    msg_type = %tag,
                    employee_id = %employee.id,
                    name = %employee.name,
                    status = %employee.status,
                    "Employee"
                );
            })
        }
        MessageType::Notification => {
            manager.subscribe_typed(msg_type, |note: NotificationPayload| match note.level {
                NotificationLevel::Error => error!(title = %note.title, "{}", note.message),
                NotificationLevel::Warning => warn!(title = %note.title, "{}", note.message),
                _ => info!(title = %note.title, "{}", note.message),
            })
        }
        other => {
            let tag = other.clone();
            manager.subscribe(other, move |payload: &Value| {
                info!(msg_type = %tag, payload = %payload, "Message");
            })
        }
    }
}
