//! Per-query settings.

use std::fmt;
use std::time::Duration;

use crate::config::{DEFAULT_CACHE_TIME, DEFAULT_STALE_TIME};

/// Settings for a [`Query`](super::Query).
///
/// `stale_time` governs when the query itself goes back to the cache;
/// `cache_time` is the TTL the cache applies to the fetched value. The former
/// is normally the shorter of the two.
#[derive(Clone)]
pub struct QueryOptions<T> {
    pub stale_time: Duration,
    pub cache_time: Duration,
    /// Data shown before the first fetch completes
    pub initial_data: Option<T>,
    /// Disabled queries only fetch through `refetch`
    pub enabled: bool,
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            cache_time: DEFAULT_CACHE_TIME,
            initial_data: None,
            enabled: true,
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("stale_time", &self.stale_time)
            .field("cache_time", &self.cache_time)
            .field("has_initial_data", &self.initial_data.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}
