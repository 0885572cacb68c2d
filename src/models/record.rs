//! Raw per-source records produced by the wire parsers.
//!
//! A record is what one source says about one paper, before it is promoted
//! to a [`Paper`](super::Paper). Records may lack a title or abstract; papers
//! may not.

use serde::{Deserialize, Serialize};

use super::SourceType;

/// The two preprint servers sharing the `details` API shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprintServer {
    BioRxiv,
    MedRxiv,
}

impl PreprintServer {
    /// Server name as used in API paths
    pub fn name(&self) -> &'static str {
        match self {
            PreprintServer::BioRxiv => "biorxiv",
            PreprintServer::MedRxiv => "medrxiv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PreprintServer::BioRxiv => "bioRxiv",
            PreprintServer::MedRxiv => "medRxiv",
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            PreprintServer::BioRxiv => SourceType::BioRxiv,
            PreprintServer::MedRxiv => SourceType::MedRxiv,
        }
    }

    /// Public website hosting the full text
    pub fn site_url(&self) -> &'static str {
        match self {
            PreprintServer::BioRxiv => "https://www.biorxiv.org",
            PreprintServer::MedRxiv => "https://www.medrxiv.org",
        }
    }
}

impl std::fmt::Display for PreprintServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One `PubmedArticle` as extracted from an efetch document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubMedRecord {
    pub pmid: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub doi: String,
    pub journal: String,
    pub published_date: String,
    pub affiliations_raw: Vec<String>,
    /// Direct PMC link, DOI resolver link, or empty
    pub pdf_url: String,
}

/// One entry of a preprint `collection` array
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprintRecord {
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub doi: String,
    pub published_date: String,
    pub category: String,
    pub version: u32,
    pub affiliations_raw: Vec<String>,
}

impl PreprintRecord {
    /// Text searched by keyword filters
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text).to_lowercase()
    }
}
