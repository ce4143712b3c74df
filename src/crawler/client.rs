//! HTTP page client
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with a fixed identity header and timeout
//! - GET requests for listing and detail pages
//! - Classifying failures (HTTP status vs. network)

use crate::config::FetchConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A failed page fetch
///
/// Every variant is a transient-failure signal; callers decide whether it
/// fails a task (listing page) or degrades a record (detail page).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The request never produced a usable response (DNS, connect, timeout,
    /// body read)
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Returns true if the server reported the page does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }

    /// Returns true if the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { source, .. } if source.is_timeout())
    }
}

/// Issues timed-out GET requests with a fixed User-Agent
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PageClient {
    client: Client,
}

impl PageClient {
    /// Builds a page client from the fetch configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Fetch configuration (user agent, request timeout)
    ///
    /// # Returns
    ///
    /// * `Ok(PageClient)` - Successfully built client
    /// * `Err(reqwest::Error)` - Failed to build the underlying client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use catalog_harvest::config::FetchConfig;
    /// use catalog_harvest::crawler::PageClient;
    ///
    /// let client = PageClient::new(&FetchConfig::default()).unwrap();
    /// ```
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs.min(10)))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetches a page and returns its body text
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Body of a 2xx response
    /// * `Err(FetchError)` - Non-2xx status or network failure
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })
    }
}
