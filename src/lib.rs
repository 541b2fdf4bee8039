//! Request Cache - Single-flight TTL memoization for asynchronous fetches
//!
//! Deduplicates concurrent identical requests, serves fresh results within a
//! configurable window, and exposes the cache as a read-through HTTP proxy.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use cache::{CacheConfig, CacheStats, RequestCache};
pub use config::Config;
pub use error::FetchError;
pub use query::{Query, QueryOptions, QueryStatus};
pub use tasks::spawn_cleanup_task;
