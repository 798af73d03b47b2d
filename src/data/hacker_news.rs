//! Hacker News Firebase API client
//!
//! Fetches the top stories ranking and individual item records, and maps
//! every failure to the degraded values the `ListingSource` contract asks for.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::{ItemDetail, ItemId, ListingSource};

/// Base URL for the Hacker News API
pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Errors that can occur when talking to the upstream service
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Unexpected status: {0}")]
    Status(StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Client for the Hacker News listing endpoints
#[derive(Debug, Clone)]
pub struct HackerNewsClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL for the API, without a trailing slash
    base_url: String,
}

impl Default for HackerNewsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HackerNewsClient {
    /// Creates a client against the public API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client with a preconfigured HTTP client
    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    /// Creates a client whose requests give up after `timeout`
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, base_url))
    }

    /// Returns the base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the top stories ranking
    ///
    /// A JSON `null` body is treated as an empty ranking.
    pub async fn try_fetch_ranked_ids(&self) -> Result<Vec<ItemId>, UpstreamError> {
        let url = format!("{}/topstories.json", self.base_url);
        let ids: Option<Vec<ItemId>> = self.get_json(&url).await?;
        Ok(ids.unwrap_or_default())
    }

    /// Fetches a single item record
    ///
    /// Returns `Ok(None)` when the upstream knows nothing about the id.
    pub async fn try_fetch_item(&self, id: ItemId) -> Result<Option<ItemDetail>, UpstreamError> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ListingSource for HackerNewsClient {
    async fn fetch_ranked_ids(&self) -> Vec<ItemId> {
        match self.try_fetch_ranked_ids().await {
            Ok(ids) => {
                debug!(count = ids.len(), "fetched ranked ids");
                ids
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch ranked ids");
                Vec::new()
            }
        }
    }

    async fn fetch_item(&self, id: ItemId) -> ItemDetail {
        match self.try_fetch_item(id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                debug!(%id, "upstream has no record for item");
                ItemDetail::placeholder(id)
            }
            Err(e) => {
                warn!(%id, error = %e, "failed to fetch item");
                ItemDetail::placeholder(id)
            }
        }
    }
}
