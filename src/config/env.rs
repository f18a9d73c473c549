use super::WebSocketConfig;
use tracing::warn;

/// Apply `CORPLINK_*` env vars on top of file/default values.
pub fn apply_env_overrides(config: &mut WebSocketConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides<F>(config: &mut WebSocketConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CORPLINK_WS_URL") {
        if !v.is_empty() {
            config.url = v;
        }
    }
    if let Some(n) = parse_var(&lookup, "CORPLINK_RECONNECT_INTERVAL_MS") {
        config.reconnect_interval_ms = n;
    }
    if let Some(n) = parse_var(&lookup, "CORPLINK_MAX_RECONNECT_ATTEMPTS") {
        config.max_reconnect_attempts = n;
    }
    if let Some(n) = parse_var(&lookup, "CORPLINK_PING_INTERVAL_MS") {
        config.ping_interval_ms = n;
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable env override");
            None
        }
    }
}
