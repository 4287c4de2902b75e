//! Process configuration read from the environment at startup

use std::env;
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key. Absence leaves the server running degraded:
    /// the capability probe fails and every chat yields an error event.
    pub api_key: Option<String>,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Sessions idle longer than this are evicted
    pub session_ttl: Duration,
    /// How often the eviction sweep runs
    pub sweep_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()),
            bind_addr: parse_var("BIND_ADDR", IpAddr::from([0, 0, 0, 0])),
            port: parse_var("PORT", 5001),
            session_ttl: Duration::from_secs(parse_var("SESSION_TTL_SECS", 86_400)),
            sweep_interval: Duration::from_secs(parse_var("SESSION_SWEEP_SECS", 3_600)),
        }
    }
}

/// Read and parse an env var, falling back to the default on absence or
/// a value that does not parse.
fn parse_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(%name, %value, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}
