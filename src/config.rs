use std::net::SocketAddr;

use anyhow::Context;
use time::Duration;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on concurrently open editing sessions.
    pub max_sessions: usize,
    /// Request body limit for template uploads, in bytes.
    pub max_body_bytes: usize,
    /// Seconds a session may sit untouched before it is discarded.
    pub session_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_sessions: 10_000,
            max_body_bytes: 2 * 1024 * 1024,
            session_ttl_secs: 2 * 60 * 60,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or(defaults.host),
            port: match std::env::var("APP_PORT") {
                Ok(v) => v.parse::<u16>().with_context(|| format!("APP_PORT={v}"))?,
                Err(_) => defaults.port,
            },
            max_sessions: std::env::var("MAX_SESSIONS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.max_sessions),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.max_body_bytes),
            session_ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.session_ttl_secs),
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX))
    }

    /// How often the background sweep runs: a tenth of the TTL, at least once a second.
    pub fn sweep_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs((self.session_ttl_secs / 10).max(1))
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_addr_parses() {
        let addr = AppConfig::default().addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn bad_host_is_an_error() {
        let config = AppConfig {
            host: "not a host".into(),
            ..AppConfig::default()
        };
        assert!(config.addr().is_err());
    }

    #[test]
    fn session_ttl_and_sweep_period() {
        let config = AppConfig {
            session_ttl_secs: 600,
            ..AppConfig::default()
        };
        assert_eq!(config.session_ttl(), Duration::minutes(10));
        assert_eq!(config.sweep_period(), std::time::Duration::from_secs(60));

        let short = AppConfig {
            session_ttl_secs: 3,
            ..AppConfig::default()
        };
        assert_eq!(short.sweep_period(), std::time::Duration::from_secs(1));
    }
}
