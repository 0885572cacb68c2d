//! Short-summary generation boundary.
//!
//! The summarizer itself (usually an LLM) lives outside this crate. Papers
//! only hand it their title and abstract, and fall back to a truncated
//! abstract when it is missing or fails.

use async_trait::async_trait;

/// Maximum number of characters kept by [`fallback_tldr`]
pub const TLDR_MAX_CHARS: usize = 300;

/// Produces a one-sentence summary of a paper
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, summary: &str) -> Result<String, SummarizeError>;
}

/// Errors reported by a [`Summarizer`]
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("Summarizer failed: {0}")]
    Failed(String),
}

/// Truncate an abstract to [`TLDR_MAX_CHARS`] characters, appending `...`
/// when anything was cut.
pub fn fallback_tldr(summary: &str) -> String {
    match summary.char_indices().nth(TLDR_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &summary[..cut]),
        None => summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_short_summary_untouched() {
        assert_eq!(fallback_tldr("Short abstract."), "Short abstract.");
    }

    #[test]
    fn test_fallback_truncates_long_summary() {
        let long = "a".repeat(TLDR_MAX_CHARS + 50);
        let tldr = fallback_tldr(&long);
        assert_eq!(tldr.len(), TLDR_MAX_CHARS + 3);
        assert!(tldr.ends_with("..."));
    }

    #[test]
    fn test_fallback_exact_length_not_truncated() {
        let exact = "b".repeat(TLDR_MAX_CHARS);
        assert_eq!(fallback_tldr(&exact), exact);
    }

    #[test]
    fn test_fallback_respects_char_boundaries() {
        let long = "é".repeat(TLDR_MAX_CHARS + 1);
        let tldr = fallback_tldr(&long);
        assert_eq!(tldr.chars().count(), TLDR_MAX_CHARS + 3);
    }
}
