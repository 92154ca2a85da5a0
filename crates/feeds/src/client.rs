//! HTTP Client for JSON Feeds

use crate::error::FetchError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for feed requests
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Thin JSON GET client shared by every feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl FeedClient {
    /// Create a client with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Create a client with a request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        info!("Creating feed client (timeout {:?})", timeout);
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// GET `url` and decode the body as `T`.
    ///
    /// A non-2xx status or an undecodable body is an error; nothing partial
    /// is returned.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!("GET {}", url);

        let response = self.http.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}
