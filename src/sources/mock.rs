//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::Paper;
use crate::sources::Source;

/// A source that returns a fixed set of papers.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    papers: Vec<Paper>,
    fetches: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new(id: impl Into<String>, papers: Vec<Paper>) -> Self {
        Self {
            id: id.into(),
            papers,
            fetches: AtomicUsize::new(0),
        }
    }

    /// How many times `fetch` was called.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn fetch(&self) -> Vec<Paper> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.papers.clone()
    }
}
