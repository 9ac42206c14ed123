//! Client configuration.
//!
//! Values come from environment variables when set, otherwise defaults.
//! Front ends may override individual fields afterwards (e.g. from CLI flags).

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Default DSU server port.
pub const DEFAULT_PORT: u16 = 3021;

/// Default connect/read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between inbox polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Extension every profile file must carry.
pub const PROFILE_EXTENSION: &str = "dsu";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Port used when the profile's server address has none.
    pub port: u16,
    /// Applies to connect, read and write separately.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Build a config from `DSU_SERVER_PORT`, `DSU_TIMEOUT_SECS` and
    /// `DSU_POLL_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var(&lookup, "DSU_SERVER_PORT", |v| v.parse::<u16>().ok()) {
            config.port = port;
        }
        if let Some(timeout) = parse_var(&lookup, "DSU_TIMEOUT_SECS", parse_secs) {
            config.timeout = timeout;
        }
        if let Some(interval) = parse_var(&lookup, "DSU_POLL_SECS", parse_secs) {
            config.poll_interval = interval;
        }

        config
    }
}

fn parse_var<F, T, P>(lookup: &F, key: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key, value = %raw, "ignoring unparseable environment value");
    }
    parsed
}

/// Parse a positive number of seconds (fractions allowed).
pub fn parse_secs(value: &str) -> Option<Duration> {
    duration_from_secs(value.parse::<f64>().ok()?)
}

/// `None` for zero, negative or non-finite values.
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

/// Directory new profiles are created in when no path is given: `~/.dsu`.
pub fn default_profile_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dsu")
}
