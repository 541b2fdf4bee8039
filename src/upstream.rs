//! Upstream Module
//!
//! The backend whose responses the proxy caches. To the cache it is only a
//! function from a resource path to some JSON.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Source of resources fetched on a cache miss.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, path: &str) -> anyhow::Result<Value>;
}

// == HTTP Upstream ==
/// Fetches `GET {base_url}/{path}` and parses the body as JSON.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn resource_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, path: &str) -> anyhow::Result<Value> {
        let url = self.resource_url(path);
        debug!(%url, "fetching from upstream");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()?;

        response
            .json::<Value>()
            .await
            .with_context(|| format!("invalid JSON from {}", url))
    }
}
