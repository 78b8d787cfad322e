//! Network transport for the registry client.
//!
//! The client only ever issues GETs for UTF-8 text, so the seam is a single method.
//! Tests substitute an in-memory implementation.

use crate::error::ApiError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Fetches text documents by URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the body. Network failures, timeouts, and non-2xx
    /// statuses are all [`ApiError::Transport`].
    async fn get_text(&self, url: &str) -> Result<String, ApiError>;
}

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("agent-catalog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, ApiError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, "request failed");
            ApiError::Transport(format!("Failed to fetch {}: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "non-success status");
            return Err(ApiError::Transport(format!("HTTP {} from {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body from {}: {}", url, e)))
    }
}
