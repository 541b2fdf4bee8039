//! Integration Tests for RequestCache
//!
//! Exercises the public cache contract end to end: single-flight, TTL expiry,
//! failure handling, invalidation and clearing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt};
use request_cache::{CacheConfig, FetchError, RequestCache};
use tokio::time::sleep;

// == Helper Functions ==

fn resolving_to<T: Send + 'static>(
    calls: &Arc<AtomicUsize>,
    value: T,
    delay: Duration,
) -> impl FnOnce() -> BoxFuture<'static, anyhow::Result<T>> {
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            sleep(delay).await;
            Ok(value)
        }
        .boxed()
    }
}

fn rejecting_with(
    calls: &Arc<AtomicUsize>,
    msg: &'static str,
) -> impl FnOnce() -> BoxFuture<'static, anyhow::Result<u32>> {
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Err(anyhow::anyhow!(msg)) }.boxed()
    }
}

async fn populate(cache: &RequestCache, keys: &[&str]) {
    let calls = Arc::new(AtomicUsize::new(0));
    for key in keys {
        let _: String = cache
            .get(key, resolving_to(&calls, key.to_string(), Duration::ZERO), None)
            .await
            .unwrap();
    }
}

// == Single Flight ==

#[tokio::test]
async fn test_concurrent_gets_invoke_fetcher_once() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let requests = (0..8).map(|_| {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 42u32, Duration::from_millis(50));
        async move { cache.get("a", fetcher, None).await }
    });
    let results = join_all(requests).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.into_iter().all(|r| r.unwrap() == 42));
}

#[tokio::test]
async fn test_single_flight_across_spawned_tasks() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let fetcher = resolving_to(&calls, "shared".to_string(), Duration::from_millis(100));
            tokio::spawn(async move { cache.get("users-list", fetcher, None).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// == TTL Expiry ==

#[tokio::test]
async fn test_end_to_end_ttl_scenario() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let ttl = Some(Duration::from_millis(1000));

    let first: u32 = cache
        .get("a", resolving_to(&calls, 42, Duration::ZERO), ttl)
        .await
        .unwrap();
    assert_eq!(first, 42);

    let second: u32 = cache
        .get("a", resolving_to(&calls, 42, Duration::ZERO), ttl)
        .await
        .unwrap();
    assert_eq!(second, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(1100)).await;

    let third: u32 = cache
        .get("a", resolving_to(&calls, 42, Duration::ZERO), ttl)
        .await
        .unwrap();
    assert_eq!(third, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_default_ttl_comes_from_config() {
    let cache = RequestCache::new(CacheConfig {
        default_ttl: Duration::from_millis(40),
        ..Default::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let _: u32 = cache
        .get("k", resolving_to(&calls, 1, Duration::ZERO), None)
        .await
        .unwrap();
    sleep(Duration::from_millis(60)).await;
    let _: u32 = cache
        .get("k", resolving_to(&calls, 1, Duration::ZERO), None)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Failures ==

#[tokio::test]
async fn test_end_to_end_failure_scenario() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let err = cache.get("b", rejecting_with(&calls, "boom"), None).await.unwrap_err();
    assert!(matches!(err, FetchError::Failed(_)));
    assert_eq!(err.to_string(), "boom");
    assert_eq!(cache.stats().await.pending_requests, 0);

    let _ = cache.get("b", rejecting_with(&calls, "boom"), None).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Invalidation ==

#[tokio::test]
async fn test_invalidate_is_idempotent_and_targeted() {
    let cache = RequestCache::default();
    populate(&cache, &["users-list", "vehicles-list"]).await;

    cache.invalidate("nonexistent").await;
    cache.invalidate("users-list").await;
    cache.invalidate("users-list").await;

    assert_eq!(cache.stats().await.keys, vec!["vehicles-list"]);
}

#[tokio::test]
async fn test_invalidate_pattern_removes_matching_keys_only() {
    let cache = RequestCache::default();
    populate(&cache, &["users-list", "vehicles-list", "requisition-history"]).await;

    let removed = cache.invalidate_pattern("^users").await.unwrap();

    assert_eq!(removed, 1);
    assert_eq!(
        cache.stats().await.keys,
        vec!["requisition-history", "vehicles-list"]
    );
}

#[tokio::test]
async fn test_clear_resets_everything() {
    let cache = RequestCache::default();
    populate(&cache, &["users-list", "vehicles-list", "requisition-history"]).await;

    // Leave one fetch in flight so the pending map is non-empty too
    let calls = Arc::new(AtomicUsize::new(0));
    let background = {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 1u32, Duration::from_millis(200));
        tokio::spawn(async move { cache.get("trips", fetcher, None).await })
    };
    sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.stats().await.pending_requests, 1);

    cache.clear().await;

    let stats = cache.stats().await;
    assert_eq!(stats.cache_size, 0);
    assert_eq!(stats.pending_requests, 0);

    // Attached callers still receive the in-flight result
    assert_eq!(background.await.unwrap().unwrap(), 1);
}

#[tokio::test]
async fn test_get_after_invalidate_starts_new_fetch() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let slow = {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 1u32, Duration::from_millis(100));
        tokio::spawn(async move { cache.get("k", fetcher, None).await })
    };
    sleep(Duration::from_millis(20)).await;

    cache.invalidate("k").await;
    let fresh: u32 = cache
        .get("k", resolving_to(&calls, 2, Duration::from_millis(10)), None)
        .await
        .unwrap();

    assert_eq!(fresh, 2);
    assert_eq!(slow.await.unwrap().unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Invalidation Race ==

#[tokio::test]
async fn test_invalidated_fetch_result_is_still_written_by_default() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let in_flight = {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 7u32, Duration::from_millis(50));
        tokio::spawn(async move { cache.get("k", fetcher, None).await })
    };
    sleep(Duration::from_millis(10)).await;

    cache.invalidate("k").await;
    assert_eq!(in_flight.await.unwrap().unwrap(), 7);

    // The result of the invalidated fetch resurrects the entry
    assert!(cache.contains("k").await);
}

#[tokio::test]
async fn test_expired_entry_with_pending_fetch_joins_the_fetch() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let invalidated = {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 1u32, Duration::from_millis(50));
        tokio::spawn(async move { cache.get("k", fetcher, Some(Duration::from_millis(10))).await })
    };
    sleep(Duration::from_millis(10)).await;

    cache.invalidate("k").await;
    let replacement = {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 2u32, Duration::from_millis(300));
        tokio::spawn(async move { cache.get("k", fetcher, None).await })
    };

    // The invalidated fetch writes a short-lived entry that expires while the
    // replacement fetch is still in flight
    assert_eq!(invalidated.await.unwrap().unwrap(), 1);
    sleep(Duration::from_millis(90)).await;
    let stats = cache.stats().await;
    assert_eq!(stats.cache_size, 1);
    assert_eq!(stats.pending_requests, 1);

    let joined: u32 = cache
        .get("k", resolving_to(&calls, 3, Duration::ZERO), None)
        .await
        .unwrap();

    assert_eq!(joined, 2);
    assert_eq!(replacement.await.unwrap().unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = cache.stats().await;
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.coalesced, 1);
}

#[tokio::test]
async fn test_invalidated_fetch_result_is_discarded_when_guarded() {
    let cache = RequestCache::new(CacheConfig {
        discard_invalidated_results: true,
        ..Default::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let in_flight = {
        let cache = cache.clone();
        let fetcher = resolving_to(&calls, 7u32, Duration::from_millis(50));
        tokio::spawn(async move { cache.get("k", fetcher, None).await })
    };
    sleep(Duration::from_millis(10)).await;

    cache.invalidate("k").await;

    // The waiting caller still gets its value, but the store stays empty
    assert_eq!(in_flight.await.unwrap().unwrap(), 7);
    assert!(!cache.contains("k").await);
    assert_eq!(cache.stats().await.cache_size, 0);
}
