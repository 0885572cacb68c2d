//! Paper model representing a research paper from any source.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::record::{PreprintRecord, PreprintServer, PubMedRecord};
use super::tldr::{fallback_tldr, Summarizer};

/// The source/repository where the paper was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    PubMed,
    BioRxiv,
    MedRxiv,
}

impl SourceType {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::PubMed => "PubMed",
            SourceType::BioRxiv => "bioRxiv",
            SourceType::MedRxiv => "medRxiv",
        }
    }

    /// Returns the source identifier
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::PubMed => "pubmed",
            SourceType::BioRxiv => "biorxiv",
            SourceType::MedRxiv => "medrxiv",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Source-specific payload of a [`Paper`]
///
/// The set is closed: every accessor on `Paper` matches on this tag, so a
/// new source has to spell out how each derived field is computed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperKind {
    PubMed(PubMedRecord),
    BioRxiv(PreprintRecord),
    MedRxiv(PreprintRecord),
}

impl PaperKind {
    fn preprint(&self) -> Option<(PreprintServer, &PreprintRecord)> {
        match self {
            PaperKind::PubMed(_) => None,
            PaperKind::BioRxiv(r) => Some((PreprintServer::BioRxiv, r)),
            PaperKind::MedRxiv(r) => Some((PreprintServer::MedRxiv, r)),
        }
    }
}

#[derive(Debug, Clone)]
struct PaperLinks {
    pdf: String,
    abstract_page: String,
}

/// A research paper from any supported source
///
/// Read-only apart from [`relevance_score`](Paper::relevance_score), which the
/// ranking stage writes once. A `Paper` always has a non-empty title and
/// abstract; the constructors return `None` for records that do not.
#[derive(Debug, Clone)]
pub struct Paper {
    kind: PaperKind,
    relevance_score: f32,
    affiliations: OnceLock<Vec<String>>,
    links: OnceLock<PaperLinks>,
    tldr: OnceLock<String>,
}

impl Paper {
    fn new(kind: PaperKind) -> Option<Self> {
        let (title, summary) = match &kind {
            PaperKind::PubMed(r) => (&r.title, &r.abstract_text),
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => (&r.title, &r.abstract_text),
        };
        if title.trim().is_empty() || summary.trim().is_empty() {
            return None;
        }

        Some(Self {
            kind,
            relevance_score: 0.0,
            affiliations: OnceLock::new(),
            links: OnceLock::new(),
            tldr: OnceLock::new(),
        })
    }

    /// Promote a PubMed record, or `None` if it lacks a title or abstract
    pub fn from_pubmed(record: PubMedRecord) -> Option<Self> {
        Self::new(PaperKind::PubMed(record))
    }

    /// Promote a preprint record, or `None` if it lacks a title or abstract
    pub fn from_preprint(server: PreprintServer, record: PreprintRecord) -> Option<Self> {
        match server {
            PreprintServer::BioRxiv => Self::new(PaperKind::BioRxiv(record)),
            PreprintServer::MedRxiv => Self::new(PaperKind::MedRxiv(record)),
        }
    }

    pub fn kind(&self) -> &PaperKind {
        &self.kind
    }

    pub fn source(&self) -> SourceType {
        match self.kind {
            PaperKind::PubMed(_) => SourceType::PubMed,
            PaperKind::BioRxiv(_) => SourceType::BioRxiv,
            PaperKind::MedRxiv(_) => SourceType::MedRxiv,
        }
    }

    pub fn title(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) => &r.title,
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => &r.title,
        }
    }

    /// Abstract text
    pub fn summary(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) => &r.abstract_text,
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => &r.abstract_text,
        }
    }

    pub fn authors(&self) -> &[String] {
        match &self.kind {
            PaperKind::PubMed(r) => &r.authors,
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => &r.authors,
        }
    }

    pub fn doi(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) => &r.doi,
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => &r.doi,
        }
    }

    /// Source-specific accession number (the PMID for PubMed papers)
    pub fn secondary_id(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) => &r.pmid,
            PaperKind::BioRxiv(_) | PaperKind::MedRxiv(_) => "",
        }
    }

    /// Unique identifier: PMID for PubMed papers, DOI otherwise
    pub fn paper_id(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) if !r.pmid.is_empty() => &r.pmid,
            _ => self.doi(),
        }
    }

    /// Journal title, or the server name for preprints
    pub fn journal(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) if !r.journal.is_empty() => &r.journal,
            _ => self.source().name(),
        }
    }

    pub fn published_date(&self) -> &str {
        match &self.kind {
            PaperKind::PubMed(r) => &r.published_date,
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => &r.published_date,
        }
    }

    /// Subject category (preprints only)
    pub fn category(&self) -> Option<&str> {
        self.kind
            .preprint()
            .map(|(_, r)| r.category.as_str())
            .filter(|c| !c.is_empty())
    }

    /// Posted version (preprints only)
    pub fn version(&self) -> Option<u32> {
        self.kind.preprint().map(|(_, r)| r.version)
    }

    /// Deduplicated, order-preserving affiliations, computed on first access
    pub fn affiliations(&self) -> &[String] {
        self.affiliations.get_or_init(|| {
            let raw = match &self.kind {
                PaperKind::PubMed(r) => &r.affiliations_raw,
                PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => &r.affiliations_raw,
            };
            normalize_affiliations(raw)
        })
    }

    /// Best-effort PDF link, possibly empty
    pub fn pdf_url(&self) -> &str {
        &self.links().pdf
    }

    /// Abstract/landing page link, possibly empty
    pub fn abs_url(&self) -> &str {
        &self.links().abstract_page
    }

    fn links(&self) -> &PaperLinks {
        self.links.get_or_init(|| match &self.kind {
            PaperKind::PubMed(r) => PaperLinks {
                pdf: if !r.pdf_url.is_empty() {
                    r.pdf_url.clone()
                } else if !r.doi.is_empty() {
                    format!("https://doi.org/{}", r.doi)
                } else {
                    String::new()
                },
                abstract_page: if !r.pmid.is_empty() {
                    format!("https://pubmed.ncbi.nlm.nih.gov/{}/", r.pmid)
                } else if !r.doi.is_empty() {
                    format!("https://doi.org/{}", r.doi)
                } else {
                    String::new()
                },
            },
            PaperKind::BioRxiv(r) | PaperKind::MedRxiv(r) => {
                if r.doi.is_empty() {
                    return PaperLinks {
                        pdf: String::new(),
                        abstract_page: String::new(),
                    };
                }
                let site = self.source_site();
                PaperLinks {
                    pdf: format!("{}/content/{}v{}.full.pdf", site, r.doi, r.version.max(1)),
                    abstract_page: format!("{}/content/{}", site, r.doi),
                }
            }
        })
    }

    fn source_site(&self) -> &'static str {
        self.kind
            .preprint()
            .map(|(server, _)| server.site_url())
            .unwrap_or_default()
    }

    pub fn relevance_score(&self) -> f32 {
        self.relevance_score
    }

    /// Written by the ranking stage
    pub fn set_relevance_score(&mut self, score: f32) {
        self.relevance_score = score;
    }

    /// Key used for cross-source deduplication: the DOI when present, else
    /// the trimmed, lower-cased title.
    pub fn dedup_key(&self) -> String {
        let doi = self.doi().trim();
        if doi.is_empty() {
            self.title().trim().to_lowercase()
        } else {
            doi.to_string()
        }
    }

    /// One-sentence summary, generated once and cached.
    ///
    /// Falls back to a truncated abstract when no summarizer is given or it
    /// fails.
    pub async fn tldr(&self, summarizer: Option<&dyn Summarizer>) -> &str {
        if let Some(cached) = self.tldr.get() {
            return cached;
        }

        let generated = match summarizer {
            Some(summarizer) => match summarizer.summarize(self.title(), self.summary()).await {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::debug!("Generated TL;DR for: {}", self.title());
                    text.trim().to_string()
                }
                Ok(_) => {
                    tracing::warn!("Empty TL;DR for {}, using abstract", self.title());
                    fallback_tldr(self.summary())
                }
                Err(e) => {
                    tracing::warn!("Failed to generate TL;DR for {}: {}", self.title(), e);
                    fallback_tldr(self.summary())
                }
            },
            None => fallback_tldr(self.summary()),
        };

        self.tldr.get_or_init(|| generated)
    }
}

impl PartialEq for Paper {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.relevance_score == other.relevance_score
    }
}

/// Trim, drop empties and deduplicate while keeping first-seen order
pub fn normalize_affiliations(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty() && seen.insert(*a))
        .map(str::to_string)
        .collect()
}

/// Flat view handed to serializers
#[derive(Serialize)]
struct PaperView<'a> {
    paper_id: &'a str,
    title: &'a str,
    summary: &'a str,
    authors: &'a [String],
    doi: &'a str,
    secondary_id: &'a str,
    source: SourceType,
    journal: &'a str,
    published_date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    affiliations: &'a [String],
    pdf_url: &'a str,
    abs_url: &'a str,
    relevance_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tldr: Option<&'a str>,
}

impl Serialize for Paper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PaperView {
            paper_id: self.paper_id(),
            title: self.title(),
            summary: self.summary(),
            authors: self.authors(),
            doi: self.doi(),
            secondary_id: self.secondary_id(),
            source: self.source(),
            journal: self.journal(),
            published_date: self.published_date(),
            category: self.category(),
            affiliations: self.affiliations(),
            pdf_url: self.pdf_url(),
            abs_url: self.abs_url(),
            relevance_score: self.relevance_score,
            tldr: self.tldr.get().map(String::as_str),
        }
        .serialize(serializer)
    }
}
