use std::time::Duration;

/// Push API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server binds to.
    pub port: u16,
    /// How often the background scheduler pushes to every session.
    pub push_interval: Duration,
    /// Upper bound on a single per-session send before it is dropped.
    pub send_timeout: Duration,
    /// Capacity of each session's outbound queue.
    pub outbound_buffer: usize,
}

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_PUSH_INTERVAL_SECS: u64 = 60;
const MAX_PUSH_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_SEND_TIMEOUT_MS: u64 = 2000;
const DEFAULT_OUTBOUND_BUFFER: usize = 64;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            push_interval: Duration::from_secs(DEFAULT_PUSH_INTERVAL_SECS),
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; missing or unparseable values fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            port: var("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            push_interval: Duration::from_secs(
                var("PUSH_INTERVAL_SECS")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_PUSH_INTERVAL_SECS)
                    .clamp(1, MAX_PUSH_INTERVAL_SECS),
            ),
            send_timeout: Duration::from_millis(
                var("SEND_TIMEOUT_MS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_SEND_TIMEOUT_MS),
            ),
            // tokio's mpsc rejects a zero capacity.
            outbound_buffer: var("OUTBOUND_BUFFER")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(DEFAULT_OUTBOUND_BUFFER)
                .max(1),
        }
    }
}
