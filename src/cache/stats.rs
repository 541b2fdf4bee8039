//! Cache Statistics Module
//!
//! Diagnostic snapshot of the request cache plus running counters.

use serde::Serialize;

// == Counters ==
/// Running counters kept inside the cache.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub fetch_failures: u64,
}

// == Cache Stats ==
/// Read-only view returned by `RequestCache::stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of resolved entries currently stored (fresh or not yet swept)
    pub cache_size: usize,
    /// Number of fetches currently in flight
    pub pending_requests: usize,
    /// Keys of the stored entries, sorted
    pub keys: Vec<String>,
    /// Calls served from a fresh entry
    pub hits: u64,
    /// Calls that started a new fetch
    pub misses: u64,
    /// Calls that attached to a fetch already in flight
    pub coalesced: u64,
    /// Entries dropped by the size cap
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Fetches that settled with an error
    pub fetch_failures: u64,
}

impl CacheStats {
    /// Builds a snapshot from the current store contents and counters.
    pub fn snapshot(
        mut keys: Vec<String>,
        pending_requests: usize,
        counters: &CacheCounters,
    ) -> Self {
        keys.sort();
        Self {
            cache_size: keys.len(),
            pending_requests,
            keys,
            hits: counters.hits,
            misses: counters.misses,
            coalesced: counters.coalesced,
            evictions: counters.evictions,
            expirations: counters.expirations,
            fetch_failures: counters.fetch_failures,
        }
    }

    // == Hit Rate ==
    /// Share of calls that avoided invoking a fetcher.
    ///
    /// Coalesced calls count as hits. Returns 0.0 if no calls have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.coalesced;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
