//! Cache Module
//!
//! Single-flight request cache with lazy TTL expiration and an optional size cap.

mod entry;
mod lru;
mod pending;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, CachedValue};
pub use lru::LruTracker;
pub use pending::{PendingRequest, SharedFetch};
pub use stats::{CacheCounters, CacheStats};
pub use store::RequestCache;

pub use crate::config::CacheConfig;
