//! # Biomed Digest
//!
//! Fetches recent paper metadata from PubMed, bioRxiv and medRxiv, normalizes
//! every record into a single [`Paper`] type and deduplicates across sources.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: The normalized [`Paper`] entity and its source variants
//! - [`parse`]: Pure wire-format parsers (PubMed XML, preprint JSON)
//! - [`sources`]: Source fetchers and the [`Aggregator`] that fans out to them
//! - [`utils`]: HTTP client, retry with backoff, deduplication, display helpers
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod parse;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Paper, SourceType};
pub use sources::{Aggregator, Source, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
