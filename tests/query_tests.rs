//! Integration Tests for Query
//!
//! Several queries bound to one cache behave like several views of the same
//! resource: they share fetches and observe each other's invalidations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use request_cache::{Config, Query, QueryOptions, QueryStatus, RequestCache};

fn users_query(cache: &RequestCache, calls: &Arc<AtomicUsize>) -> Query<Vec<String>> {
    let calls = calls.clone();
    Query::new(cache.clone(), "users-list", move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(vec!["ana".to_string(), "bob".to_string()])
        }
    })
}

#[tokio::test]
async fn test_queries_on_same_key_share_one_fetch() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut list_view = users_query(&cache, &calls);
    let mut picker_view = users_query(&cache, &calls);

    tokio::join!(list_view.mount(), picker_view.mount());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(list_view.data(), picker_view.data());
    assert_eq!(list_view.status(), QueryStatus::Success);
}

#[tokio::test]
async fn test_invalidation_from_one_query_reaches_the_other() {
    let cache = RequestCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut list_view = users_query(&cache, &calls);
    let mut picker_view = users_query(&cache, &calls).with_options(QueryOptions {
        stale_time: Duration::ZERO,
        ..Default::default()
    });

    list_view.mount().await;
    picker_view.mount().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // e.g. after creating a user
    list_view.invalidate().await;
    picker_view.fetch_data().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!picker_view.is_loading());
}

#[tokio::test]
async fn test_stale_time_from_config() {
    let config = Config {
        stale_time: 0,
        ..Config::default()
    };
    let cache = RequestCache::new(config.cache_config());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut query = users_query(&cache, &calls).with_options(config.query_options());

    query.mount().await;
    assert!(query.is_stale());

    // Stale locally but still fresh in the cache, so no second fetch
    query.fetch_data().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().await.hits, 1);
}
