//! Expiry Sweep Task
//!
//! Optional background task that purges expired entries so keys that are never
//! read again do not linger. Without it, expiration is purely lazy.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RequestCache;

/// Spawns a task that calls `RequestCache::purge_expired` every `interval`.
///
/// The returned handle should be aborted on shutdown.
///
/// # Example
/// ```ignore
/// let cache = RequestCache::default();
/// let sweep = spawn_cleanup_task(cache.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// sweep.abort();
/// ```
pub fn spawn_cleanup_task(cache: RequestCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "Starting expiry sweep task");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.purge_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
