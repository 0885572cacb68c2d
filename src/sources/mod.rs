//! Source fetchers and the aggregator that fans out to them.
//!
//! This module defines the [`Source`] trait implemented by every fetcher.
//! A source owns pagination, batching and backoff for one upstream API,
//! turns each page into [`Paper`]s through the matching parser in
//! [`crate::parse`], and never fails: transport and parse errors are logged
//! and shrink the result instead of aborting it.
//!
//! # Feature Flags
//!
//! - `pubmed` - Enable the PubMed source (default: enabled)
//! - `biorxiv` - Enable the bioRxiv/medRxiv source (default: enabled)
//!
//! # Pacing
//!
//! Every fetcher takes an explicit [`Pacing`]: the delay slept between
//! consecutive requests of one fetch, and the retry policy for each request.
//! [`Pacing::none()`] disables both, which is what tests use.

mod aggregator;
#[cfg(feature = "source-biorxiv")]
mod biorxiv;
pub mod mock;
#[cfg(feature = "source-pubmed")]
mod pubmed;

pub use aggregator::Aggregator;
#[cfg(feature = "source-biorxiv")]
pub use biorxiv::{
    PreprintQuery, PreprintSource, PREPRINT_API_URL, PREPRINT_PAGE_SIZE, PREPRINT_REQUEST_DELAY,
};
pub use mock::MockSource;
#[cfg(feature = "source-pubmed")]
pub use pubmed::{
    PubMedEndpoints, PubMedQuery, PubMedSource, PUBMED_BATCH_SIZE, PUBMED_EUTILS_URL,
    PUBMED_REQUEST_DELAY,
};

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::models::Paper;
use crate::utils::{api_retry_config, RetryConfig};

/// A paper source: one upstream API plus the query it was configured with.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "pubmed", "biorxiv")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch every paper matching the configured query.
    ///
    /// Best effort: returns whatever could be gathered, possibly nothing.
    async fn fetch(&self) -> Vec<Paper>;
}

/// Request pacing for one fetcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    /// Delay between consecutive requests (pages or batches) of one fetch
    pub request_delay: Duration,
    /// Retry policy applied to each request
    pub retry: RetryConfig,
}

impl Pacing {
    /// Fixed delay between requests, default API retry policy
    pub fn new(request_delay: Duration) -> Self {
        Self {
            request_delay,
            retry: api_retry_config(),
        }
    }

    /// No delay and no retries
    pub fn none() -> Self {
        Self {
            request_delay: Duration::ZERO,
            retry: RetryConfig::none(),
        }
    }

    /// Replace the retry policy
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sleep for the configured inter-request delay
    pub async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

/// Errors that can occur when talking to a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML or JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success response from the source (other than 429)
    #[error("API error: {url} returned status: {status}")]
    Api { url: String, status: StatusCode },

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
