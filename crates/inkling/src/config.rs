//! Environment-driven server configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `INKLING_HOST` | `0.0.0.0` |
//! | `INKLING_PORT` | `4000` |
//! | `INKLING_IDLE_TIMEOUT_SECS` | `120` |
//! | `INKLING_GRACE_SECS` | `30` |
//! | `INKLING_LOG` (then `RUST_LOG`) | `info` |
//!
//! Unparseable numbers fall back to their defaults.

use std::str::FromStr;
use std::time::Duration;

use inkling_room::EngineConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_GRACE_SECS: u64 = 30;
const DEFAULT_LOG: &str = "info";

/// Process-level settings for the `inkling-server` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// A connection that sends nothing for this long is treated as a
    /// dropped link.
    pub idle_timeout: Duration,
    /// How long a disconnected player's seat is held.
    pub reconnect_grace: Duration,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            reconnect_grace: Duration::from_secs(DEFAULT_GRACE_SECS),
            log_filter: DEFAULT_LOG.to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u64| parse_or(lookup(key), default);

        Self {
            host: lookup("INKLING_HOST")
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.host),
            port: parse_or(lookup("INKLING_PORT"), defaults.port),
            idle_timeout: Duration::from_secs(number(
                "INKLING_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )),
            reconnect_grace: Duration::from_secs(number("INKLING_GRACE_SECS", DEFAULT_GRACE_SECS)),
            log_filter: lookup("INKLING_LOG")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
        }
    }

    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Room engine timings, with this config's grace period.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().with_reconnect_grace(self.reconnect_grace)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
