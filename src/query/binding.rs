//! Query binding over a `RequestCache`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::time::Instant;
use tracing::debug;

use crate::cache::RequestCache;
use crate::error::FetchError;
use crate::query::{QueryOptions, QueryState, QueryStatus};

/// Fetcher shared by every fetch a query issues.
pub type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

type SuccessCallback<T> = Box<dyn FnMut(&T) + Send>;
type ErrorCallback = Box<dyn FnMut(&FetchError) + Send>;

// == Query ==
/// A fixed `(key, fetcher)` pair bound to a `RequestCache`.
///
/// The query keeps its own freshness clock (`stale_time`) on top of the cache
/// TTL: while its data is younger than `stale_time`, `fetch_data` does not touch
/// the cache at all.
pub struct Query<T> {
    cache: RequestCache,
    key: String,
    fetcher: QueryFn<T>,
    options: QueryOptions<T>,
    state: QueryState<T>,
    last_fetch: Option<Instant>,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(cache: RequestCache, key: impl Into<String>, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            cache,
            key: key.into(),
            fetcher: Arc::new(move || fetcher().boxed()),
            options: QueryOptions::default(),
            state: QueryState::new(None),
            last_fetch: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Replaces the options. Initial data is applied only if nothing was fetched yet.
    pub fn with_options(mut self, options: QueryOptions<T>) -> Self {
        if self.last_fetch.is_none() {
            self.state.data = options.initial_data.clone();
        }
        self.state.is_loading = options.enabled;
        self.options = options;
        self
    }

    pub fn on_success(mut self, callback: impl FnMut(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnMut(&FetchError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    // == Lifecycle ==
    /// First fetch after construction. Does nothing for a disabled query.
    pub async fn mount(&mut self) {
        if self.options.enabled {
            self.fetch_data().await;
        }
    }

    /// Switches to another key and fetches it (when enabled).
    ///
    /// Data for the previous key stays visible until the new fetch settles.
    pub async fn set_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key == self.key {
            return;
        }
        self.key = key;
        self.last_fetch = None;
        self.mount().await;
    }

    // == Fetching ==
    /// Fetches through the cache unless local data is still fresh.
    pub async fn fetch_data(&mut self) {
        if self.state.data.is_some() && !self.is_stale() {
            debug!(key = %self.key, "query data still fresh, skipping fetch");
            self.state.is_loading = false;
            return;
        }
        self.run_fetch().await;
    }

    /// Fetches regardless of local freshness. The cache TTL still applies.
    pub async fn refetch(&mut self) {
        self.run_fetch().await;
    }

    /// Drops the cache entry for this key and forgets local freshness.
    pub async fn invalidate(&mut self) {
        self.cache.invalidate(&self.key).await;
        self.last_fetch = None;
    }

    async fn run_fetch(&mut self) {
        self.state.is_loading = true;
        self.state.error = None;

        let fetcher = self.fetcher.clone();
        let outcome = self
            .cache
            .get(&self.key, move || fetcher(), Some(self.options.cache_time))
            .await;

        match outcome {
            Ok(data) => {
                self.last_fetch = Some(Instant::now());
                if let Some(callback) = self.on_success.as_mut() {
                    callback(&data);
                }
                self.state.data = Some(data);
            }
            Err(err) => {
                let err = normalize(err);
                debug!(key = %self.key, error = %err, "query fetch failed");
                if let Some(callback) = self.on_error.as_mut() {
                    callback(&err);
                }
                self.state.error = Some(err);
            }
        }
        self.state.is_loading = false;
    }

    // == Accessors ==
    /// True when there is no successful fetch younger than `stale_time`.
    pub fn is_stale(&self) -> bool {
        self.last_fetch
            .map_or(true, |at| at.elapsed() >= self.options.stale_time)
    }

    pub fn status(&self) -> QueryStatus {
        if self.state.is_loading {
            QueryStatus::Loading
        } else if self.state.error.is_some() {
            QueryStatus::Error
        } else if self.state.data.is_none() {
            QueryStatus::Idle
        } else if self.is_stale() {
            QueryStatus::Stale
        } else {
            QueryStatus::Success
        }
    }

    pub fn state(&self) -> &QueryState<T> {
        &self.state
    }

    pub fn data(&self) -> Option<&T> {
        self.state.data.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.state.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("is_loading", &self.state.is_loading)
            .field("has_data", &self.state.data.is_some())
            .field("error", &self.state.error)
            .field("last_fetch", &self.last_fetch)
            .finish_non_exhaustive()
    }
}

/// Failures without a usable error value become `FetchError::Unknown`.
fn normalize(err: FetchError) -> FetchError {
    match err {
        FetchError::Panicked(_) => FetchError::Unknown,
        other => other,
    }
}
