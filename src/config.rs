//! Configuration Module
//!
//! Handles loading server and cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::query::QueryOptions;

/// Default lifetime of a resolved entry (the "cache time").
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

/// Default age after which a query considers its local data stale.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);

// == Cache Config ==
/// Behaviour knobs for a `RequestCache`.
///
/// The defaults give an unbounded cache with no fetch timeout that writes every
/// fetch result, including results of fetches invalidated while in flight.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL used when a caller does not pass one
    pub default_ttl: Duration,
    /// Size cap enforced with LRU eviction, None = unbounded
    pub max_entries: Option<usize>,
    /// Fail fetches that take longer than this, None = wait forever
    pub fetch_timeout: Option<Duration>,
    /// Drop results of fetches that were invalidated or cleared while in flight
    pub discard_invalidated_results: bool,
}

impl CacheConfig {
    /// Folds zero-valued limits into "no limit".
    pub fn normalized(mut self) -> Self {
        if self.max_entries == Some(0) {
            self.max_entries = None;
        }
        if self.fetch_timeout == Some(Duration::ZERO) {
            self.fetch_timeout = None;
        }
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_CACHE_TIME,
            max_entries: None,
            fetch_timeout: None,
            discard_invalidated_results: false,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for cached fetches
    pub default_ttl: u64,
    /// Seconds before a query's local data is considered stale
    pub stale_time: u64,
    /// Maximum number of resolved entries, 0 = unbounded
    pub max_entries: usize,
    /// Background sweep interval in seconds, 0 = lazy expiration only
    pub cleanup_interval: u64,
    /// Fetch timeout in seconds, 0 = none
    pub fetch_timeout: u64,
    /// Drop results of fetches invalidated while in flight
    pub discard_invalidated_results: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the backend proxied through `/resources`
    pub upstream_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Entry TTL in seconds (default: 300)
    /// - `STALE_TIME` - Query staleness threshold in seconds (default: 60)
    /// - `MAX_ENTRIES` - Size cap, 0 disables it (default: 0)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds, 0 disables it (default: 0)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds, 0 disables it (default: 0)
    /// - `DISCARD_INVALIDATED_RESULTS` - `true`/`1` to enable (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Backend base URL (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            stale_time: parse_var("STALE_TIME").unwrap_or(defaults.stale_time),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            fetch_timeout: parse_var("FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
            discard_invalidated_results: env::var("DISCARD_INVALIDATED_RESULTS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.discard_invalidated_results),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: Duration::from_secs(self.default_ttl),
            max_entries: Some(self.max_entries),
            fetch_timeout: Some(Duration::from_secs(self.fetch_timeout)),
            discard_invalidated_results: self.discard_invalidated_results,
        }
        .normalized()
    }

    /// Query settings derived from this configuration.
    ///
    /// `cache_time` follows `DEFAULT_TTL` so queries and direct cache callers
    /// agree on entry lifetimes.
    pub fn query_options<T>(&self) -> QueryOptions<T> {
        QueryOptions {
            stale_time: Duration::from_secs(self.stale_time),
            cache_time: Duration::from_secs(self.default_ttl),
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_CACHE_TIME.as_secs(),
            stale_time: DEFAULT_STALE_TIME.as_secs(),
            max_entries: 0,
            cleanup_interval: 0,
            fetch_timeout: 0,
            discard_invalidated_results: false,
            server_port: 3000,
            upstream_url: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
