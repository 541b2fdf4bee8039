//! Observable query state.

use serde::Serialize;

use crate::error::FetchError;

/// Coarse status derived from a query's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Nothing fetched yet and no fetch running (disabled query)
    Idle,
    /// A fetch is running
    Loading,
    /// Fresh data is available
    Success,
    /// The last fetch failed; earlier data may still be present
    Error,
    /// Data is displayed but older than the stale time
    Stale,
}

/// What rendering code reads from a query.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub is_loading: bool,
}

impl<T> QueryState<T> {
    pub fn new(initial_data: Option<T>) -> Self {
        Self {
            data: initial_data,
            error: None,
            is_loading: true,
        }
    }
}
