//! Cache Entry Module
//!
//! Defines the structure for resolved, type-erased cache entries with TTL support.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Type-erased cached value. Keys of different value types share one store.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Upper bound on a TTL; `now + ttl` stays representable below it.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 86_400);

// == Cache Entry ==
/// A resolved fetch result together with its expiration time.
#[derive(Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: CachedValue,
    /// When the entry was written
    pub created_at: Instant,
    /// Absolute expiration time
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now.
    ///
    /// TTLs too large to add to the clock (e.g. `Duration::MAX`) are capped at
    /// roughly a century, which in practice means the entry never expires.
    pub fn new(value: CachedValue, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl.min(FAR_FUTURE),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is fresh only while `now < expires_at`; once the TTL has fully
    /// elapsed it is expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    // == Downcast ==
    /// Returns a clone of the value if it was stored as `T`.
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
