//! HTTP client utilities.

use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_settings(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client with a custom user agent and timeout
    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// GET a URL and return the body as text.
    ///
    /// Non-success statuses become errors: 429 is [`SourceError::RateLimit`],
    /// anything else is [`SourceError::Api`] carrying the status code.
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimit);
        }
        if !status.is_success() {
            return Err(SourceError::Api {
                url: url.to_string(),
                status,
            });
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{with_retry, RetryConfig, TransientError};

    #[tokio::test]
    async fn test_get_text_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let body = client.get_text(&format!("{}/ok", server.url())).await.unwrap();
        assert_eq!(body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_text_status_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/limited")
            .with_status(429)
            .create_async()
            .await;
        server
            .mock("GET", "/down")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let limited = client.get_text(&format!("{}/limited", server.url())).await;
        assert!(matches!(limited, Err(SourceError::RateLimit)));

        match client.get_text(&format!("{}/down", server.url())).await {
            Err(SourceError::Api { status, .. }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE)
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_text_in_url_does_not_make_error_transient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let url = format!(
            "{}/esearch.fcgi?term=gateway%20timeout%20service%20unavailable",
            server.url()
        );
        let config = RetryConfig::default().max_attempts(3);
        let result = with_retry(config, || client.get_text(&url)).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            SourceError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
        assert!(TransientError::from_source_error(&err).is_none());
        mock.assert_async().await;
    }
}
