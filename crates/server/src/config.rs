//! Server configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use siphon_core::{RetryPolicy, ServiceConfig};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3011;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Upper bound for one HTTP request, queueing included
    pub request_timeout: Duration,
    pub service: ServiceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            service: ServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT`, `HOST`, `SIPHON_*` and `CHROME_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unparseable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut service = defaults.service;

        service.max_concurrent = parse_or(&lookup, "SIPHON_MAX_CONCURRENT", service.max_concurrent);
        service.retry = RetryPolicy::new(parse_or(&lookup, "SIPHON_MAX_RETRIES", service.retry.max_retries))
            .with_backoff(Duration::from_millis(parse_or(&lookup, "SIPHON_RETRY_BACKOFF_MS", 0)));
        service.browser.navigation_timeout = Duration::from_secs(parse_or(
            &lookup,
            "SIPHON_NAVIGATION_TIMEOUT_SECS",
            service.browser.navigation_timeout.as_secs(),
        ));
        service.browser.chrome_executable = lookup("CHROME_PATH")
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self {
            host: parse_or(&lookup, "HOST", defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SIPHON_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            service,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }
    }
}
