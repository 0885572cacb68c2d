//! PubMed efetch XML (`PubmedArticleSet`) parsing.

use super::xml::{parse_document, XmlElement};
use crate::models::{Paper, PubMedRecord};
use crate::sources::SourceError;

/// Parse an efetch article set into papers.
///
/// A document that is not well-formed fails as a whole. A malformed article
/// is skipped and logged; an article without title or abstract is dropped
/// silently.
pub fn parse_article_set(xml: &str) -> Result<Vec<Paper>, SourceError> {
    let root = parse_document(xml)
        .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed XML: {}", e)))?;

    let mut papers = Vec::new();
    for article in root.descendants("PubmedArticle") {
        match extract_article(article) {
            Ok(record) => papers.extend(Paper::from_pubmed(record)),
            Err(e) => {
                tracing::debug!("Failed to parse a PubMed article: {}", e);
            }
        }
    }

    Ok(papers)
}

/// Extract one `PubmedArticle` element into a record
pub fn extract_article(article: &XmlElement) -> Result<PubMedRecord, SourceError> {
    let citation = article
        .child("MedlineCitation")
        .ok_or_else(|| SourceError::Parse("article has no MedlineCitation".to_string()))?;
    let details = citation
        .child("Article")
        .ok_or_else(|| SourceError::Parse("MedlineCitation has no Article".to_string()))?;

    let pmid = citation.child("PMID").map(XmlElement::text).unwrap_or_default();
    let title = details
        .child("ArticleTitle")
        .map(XmlElement::text)
        .unwrap_or_default();

    let abstract_text = details
        .find_all("Abstract/AbstractText")
        .into_iter()
        .map(|segment| {
            let text = segment.text();
            match segment.attr("Label").map(str::trim).filter(|l| !l.is_empty()) {
                Some(label) => format!("{}: {}", label, text),
                None => text,
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let authors = details
        .find_all("AuthorList/Author")
        .into_iter()
        .filter_map(author_name)
        .collect();

    let ids = article.find_all("PubmedData/ArticleIdList/ArticleId");
    let typed_id = |kind: &str| {
        ids.iter()
            .find(|id| id.attr("IdType") == Some(kind))
            .map(|id| id.text())
            .unwrap_or_default()
    };
    let doi = typed_id("doi");
    let pmc_id = typed_id("pmc");

    let journal = details
        .find("Journal/Title")
        .map(XmlElement::text)
        .unwrap_or_default();

    let published_date = details
        .find("Journal/JournalIssue/PubDate")
        .map(publication_date)
        .unwrap_or_default();

    // Investigators sit beside Article, not under it
    let affiliations_raw = citation
        .descendants("AffiliationInfo")
        .into_iter()
        .flat_map(|info| info.find_all("Affiliation"))
        .map(XmlElement::text)
        .filter(|a| !a.is_empty())
        .collect();

    let pdf_url = if !pmc_id.is_empty() {
        format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{}/pdf/", pmc_id)
    } else if !doi.is_empty() {
        format!("https://doi.org/{}", doi)
    } else {
        String::new()
    };

    Ok(PubMedRecord {
        pmid,
        title,
        abstract_text,
        authors,
        doi,
        journal,
        published_date,
        affiliations_raw,
        pdf_url,
    })
}

fn author_name(author: &XmlElement) -> Option<String> {
    let last = author.child("LastName").map(XmlElement::text).filter(|s| !s.is_empty());
    let fore = author.child("ForeName").map(XmlElement::text).filter(|s| !s.is_empty());

    match (fore, last) {
        (Some(fore), Some(last)) => Some(format!("{} {}", fore, last)),
        (None, Some(last)) => Some(last),
        _ => author
            .child("CollectiveName")
            .map(XmlElement::text)
            .filter(|s| !s.is_empty()),
    }
}

/// `Year-Month-Day` from whichever components are present, else `MedlineDate`
fn publication_date(pub_date: &XmlElement) -> String {
    let parts: Vec<String> = ["Year", "Month", "Day"]
        .iter()
        .filter_map(|part| pub_date.child(part).map(XmlElement::text))
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        pub_date
            .child("MedlineDate")
            .map(XmlElement::text)
            .unwrap_or_default()
    } else {
        parts.join("-")
    }
}
