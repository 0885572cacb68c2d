//! Utility modules supporting the fetch pipeline.
//!
//! - [`deduplicate_papers`]: Remove duplicate papers by DOI or normalized title
//! - [`find_duplicates`]: Find duplicate groups without modifying the list
//! - [`HttpClient`]: HTTP client with shared defaults and status handling
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//! - [`papers_table`]: Render papers for the terminal
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use biomed_digest::utils::{with_retry, HttpClient, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let config = RetryConfig::default().max_attempts(3);
//! let body = with_retry(config, || client.get_text("https://api.biorxiv.org/details/biorxiv/2024-01-01/2024-01-02/0")).await?;
//! # Ok(())
//! # }
//! ```

mod dedup;
mod display;
mod http;
mod retry;

pub use dedup::{deduplicate_papers, find_duplicates};
pub use display::{papers_table, truncate_with_ellipsis};
pub use http::{HttpClient, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use retry::{api_retry_config, with_retry, RetryConfig, TransientError};
