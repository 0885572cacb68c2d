//! Core data models for normalized papers.

mod paper;
mod record;
mod tldr;

pub use paper::{normalize_affiliations, Paper, PaperKind, SourceType};
pub use record::{PreprintRecord, PreprintServer, PubMedRecord};
pub use tldr::{fallback_tldr, SummarizeError, Summarizer, TLDR_MAX_CHARS};
