//! Request Cache Module
//!
//! Single-flight, TTL-based memoization of asynchronous fetches keyed by string.
//!
//! A call to [`RequestCache::get`] is answered, in order, from a fresh resolved
//! entry, from a fetch already in flight for the same key, or by invoking the
//! fetcher exactly once. Expiration is checked lazily on read.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheCounters, CacheEntry, CacheStats, CachedValue, LruTracker, PendingRequest};
use crate::config::CacheConfig;
use crate::error::FetchError;

// == Inner State ==
/// Value store, pending map and bookkeeping, always mutated under one lock.
#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    pending: HashMap<String, PendingRequest>,
    lru: LruTracker,
    counters: CacheCounters,
    next_fetch_id: u64,
}

impl Inner {
    fn remove_entry(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }

    fn store_entry(&mut self, key: String, entry: CacheEntry, max_entries: Option<usize>) {
        if let Some(cap) = max_entries {
            if !self.entries.contains_key(&key) {
                while self.entries.len() >= cap {
                    let Some(evicted) = self.lru.evict_oldest() else {
                        break;
                    };
                    self.entries.remove(&evicted);
                    self.counters.evictions += 1;
                    debug!(key = %evicted, "evicted least recently used entry");
                }
            }
            self.lru.touch(&key);
        }
        self.entries.insert(key, entry);
    }
}

// == Request Cache ==
/// Shared handle to a request cache. Clones refer to the same store.
#[derive(Debug, Clone)]
pub struct RequestCache {
    inner: Arc<RwLock<Inner>>,
    config: Arc<CacheConfig>,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl RequestCache {
    // == Constructor ==
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            config: Arc::new(config.normalized()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns the value for `key`, fetching it at most once across concurrent callers.
    ///
    /// `ttl` of `None` uses the configured default. When the caller attaches to a
    /// fetch already in flight, its own `fetcher` is dropped without being called.
    /// Fetch failures are never cached.
    pub async fn get<T, F, Fut, E>(
        &self,
        key: &str,
        fetcher: F,
        ttl: Option<Duration>,
    ) -> Result<T, FetchError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let ttl = ttl.unwrap_or(self.config.default_ttl);

        let fetch = {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;

            if let Some(entry) = inner.entries.get(key) {
                if !entry.is_expired() {
                    let value = entry.value.clone();
                    inner.counters.hits += 1;
                    if self.config.max_entries.is_some() {
                        inner.lru.touch(key);
                    }
                    debug!(key, "cache hit");
                    return downcast(key, value);
                }
                inner.remove_entry(key);
                inner.counters.expirations += 1;
                debug!(key, "cache entry expired");
            }

            if let Some(pending) = inner.pending.get(key) {
                inner.counters.coalesced += 1;
                debug!(key, fetch_id = pending.id, "joining in-flight fetch");
                pending.fetch.clone()
            } else {
                inner.counters.misses += 1;
                let id = inner.next_fetch_id;
                inner.next_fetch_id += 1;
                debug!(key, fetch_id = id, "cache miss, starting fetch");

                let task = tokio::spawn(settle_fetch(
                    self.inner.clone(),
                    self.config.clone(),
                    key.to_string(),
                    id,
                    ttl,
                    fetcher(),
                ));
                let task_key = key.to_string();
                let joined = async move {
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            warn!(
                                key = %task_key,
                                fetch_id = id,
                                error = %err,
                                "fetch task did not complete"
                            );
                            Err(FetchError::Unknown)
                        }
                    }
                }
                .boxed();

                let pending = PendingRequest::new(id, joined);
                let fetch = pending.fetch.clone();
                inner.pending.insert(key.to_string(), pending);
                fetch
            }
        };

        let value = fetch.await?;
        downcast(key, value)
    }

    // == Invalidate ==
    /// Drops the resolved entry and pending fetch for `key`, if any.
    ///
    /// A fetch already running is not cancelled.
    pub async fn invalidate(&self, key: &str) {
        let mut inner = self.inner.write().await;
        let had_entry = inner.remove_entry(key);
        let had_pending = inner.pending.remove(key).is_some();

        if had_entry || had_pending {
            info!(key, "invalidated cache key");
        }
    }

    // == Invalidate Pattern ==
    /// Invalidates every resolved key matching the regular expression `pattern`.
    ///
    /// Returns the number of keys invalidated.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, regex::Error> {
        let re = Regex::new(pattern)?;

        let mut inner = self.inner.write().await;
        let matched: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| re.is_match(key))
            .cloned()
            .collect();

        for key in &matched {
            inner.remove_entry(key);
            inner.pending.remove(key);
        }

        info!(pattern, removed = matched.len(), "invalidated cache keys by pattern");
        Ok(matched.len())
    }

    // == Clear ==
    /// Empties the value store and the pending map.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let removed = inner.entries.len();
        let pending = inner.pending.len();
        inner.entries.clear();
        inner.pending.clear();
        inner.lru.clear();

        info!(removed, pending, "cleared request cache");
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats::snapshot(
            inner.entries.keys().cloned().collect(),
            inner.pending.len(),
            &inner.counters,
        )
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove_entry(key);
        }
        inner.counters.expirations += expired.len() as u64;

        expired.len()
    }

    /// Returns true if a fresh entry exists for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner.entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Number of stored entries, including expired ones not yet removed.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

// == Fetch Task ==
/// Runs one fetcher to completion and records its outcome.
///
/// The pending entry is only removed if it still belongs to this fetch, so a
/// newer fetch started after an invalidation is left in place.
async fn settle_fetch<T, E, Fut>(
    inner: Arc<RwLock<Inner>>,
    config: Arc<CacheConfig>,
    key: String,
    id: u64,
    ttl: Duration,
    fetch: Fut,
) -> Result<CachedValue, FetchError>
where
    T: Send + Sync + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let outcome = run_fetcher(fetch, config.fetch_timeout).await;

    let mut guard = inner.write().await;
    let still_registered = guard.pending.get(&key).is_some_and(|pending| pending.id == id);
    if still_registered {
        guard.pending.remove(&key);
    }

    match &outcome {
        Ok(value) => {
            if still_registered || !config.discard_invalidated_results {
                guard.store_entry(key, CacheEntry::new(value.clone(), ttl), config.max_entries);
            } else {
                debug!(key = %key, fetch_id = id, "discarding result of invalidated fetch");
            }
        }
        Err(err) => {
            guard.counters.fetch_failures += 1;
            warn!(key = %key, fetch_id = id, error = %err, "fetch failed");
        }
    }

    outcome
}

async fn run_fetcher<T, E, Fut>(fetch: Fut, timeout: Option<Duration>) -> Result<CachedValue, FetchError>
where
    T: Send + Sync + 'static,
    E: Into<anyhow::Error>,
    Fut: Future<Output = Result<T, E>>,
{
    let guarded = AssertUnwindSafe(fetch).catch_unwind();
    let settled = match timeout {
        Some(limit) => tokio::time::timeout(limit, guarded)
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => guarded.await,
    };

    match settled {
        Ok(Ok(value)) => Ok(Arc::new(value) as CachedValue),
        Ok(Err(err)) => Err(FetchError::failed(err)),
        Err(payload) => Err(FetchError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn downcast<T: Clone + 'static>(key: &str, value: CachedValue) -> Result<T, FetchError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| FetchError::TypeMismatch(key.to_string()))
}
