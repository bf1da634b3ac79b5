//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::types::ProviderError;
use crate::config::DEFAULT_TIMEOUT_SECS;

/// Trait for asynchronous HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request with custom headers.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `headers` - Slice of (header_name, header_value) tuples
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("featurelayer/", env!("CARGO_PKG_VERSION"));

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new AsyncReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, ProviderError> {
        trace!(url = url, "HTTP GET request starting");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        // Check HTTP status
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => Err(ProviderError::HttpError(format!(
                "Failed to read response: {}",
                e
            ))),
        }
    }
}
