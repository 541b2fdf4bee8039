//! Pending Request Module
//!
//! An in-flight fetch that any number of callers can attach to.

use std::fmt;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::cache::CachedValue;
use crate::error::FetchError;

/// Shared outcome of a single fetcher invocation.
pub type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, FetchError>>>;

// == Pending Request ==
/// An outstanding fetch for one key.
#[derive(Clone)]
pub struct PendingRequest {
    /// Identifies this fetch among all fetches the cache has started
    pub id: u64,
    /// The in-flight computation, cloned for every attached caller
    pub fetch: SharedFetch,
}

impl PendingRequest {
    /// Wraps a boxed fetch so it can be awaited by several callers.
    pub fn new(id: u64, fetch: BoxFuture<'static, Result<CachedValue, FetchError>>) -> Self {
        Self {
            id,
            fetch: fetch.shared(),
        }
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
