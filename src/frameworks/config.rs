use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("PARTY_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Base URL clients reach this server under, baked into join links.
pub fn public_base_url() -> String {
    env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://127.0.0.1:{}", http_port()))
}

/// External party-code directory; unset means standalone operation with only
/// the in-process code mapping.
pub fn directory_service_url() -> Option<String> {
    env::var("DIRECTORY_SERVICE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

pub fn directory_timeout() -> Duration {
    let millis = env::var("DIRECTORY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// ~30 Hz fixed timestep for every session's game loop.
pub const TICK_INTERVAL: Duration = Duration::from_micros(33_333);

/// Hard cap per party: one display plus up to four controllers.
pub const MAX_CONNECTIONS_PER_PARTY: usize = 5;
