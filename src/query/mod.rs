//! Query Module
//!
//! Binds one cache key and fetcher to a small reactive state machine for
//! rendering code: loading, success, error and stale-but-displayed.

mod binding;
mod options;
mod state;

pub use binding::{Query, QueryFn};
pub use options::QueryOptions;
pub use state::{QueryState, QueryStatus};
