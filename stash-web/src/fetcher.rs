//! HTTP transport for page fetches.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use stash_core::error::{Result, StashError};
use stash_core::traits::Fetcher;

/// Fetches pages over HTTP(S) with reqwest.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("stash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StashError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Creates a fetcher around an existing client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        if !response.status().is_success() {
            return Err(StashError::FetchError {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        debug!(url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

fn request_error(url: &str, timeout: Duration, e: reqwest::Error) -> StashError {
    if e.is_timeout() {
        StashError::FetchTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        StashError::FetchError {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
