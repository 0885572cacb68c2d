//! Terminal display helpers for the CLI.

use comfy_table::{presets, Cell, ContentArrangement, Table};

use crate::models::Paper;

/// Truncate text to `max_chars` characters, appending `...` when cut.
///
/// ```
/// use biomed_digest::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Render papers as a table: title, first author, source, date, link
pub fn papers_table(papers: &[Paper]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Title", "Authors", "Source", "Date", "Link"]);

    for (idx, paper) in papers.iter().enumerate() {
        let authors = match paper.authors() {
            [] => String::new(),
            [only] => only.clone(),
            [first, ..] => format!("{} et al.", first),
        };
        let link = if paper.abs_url().is_empty() {
            paper.pdf_url()
        } else {
            paper.abs_url()
        };

        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(truncate_with_ellipsis(paper.title(), 80)),
            Cell::new(truncate_with_ellipsis(&authors, 30)),
            Cell::new(paper.journal()),
            Cell::new(paper.published_date()),
            Cell::new(link),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PubMedRecord;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("abcdef", 6), "abcdef");
        assert_eq!(truncate_with_ellipsis("abcdefg", 6), "abc...");
        assert_eq!(truncate_with_ellipsis("ééééé", 4), "é...");
    }

    #[test]
    fn test_papers_table_rows() {
        let paper = Paper::from_pubmed(PubMedRecord {
            pmid: "7".to_string(),
            title: "Keratinocyte stress".to_string(),
            abstract_text: "Abstract".to_string(),
            authors: vec!["Ana Lima".to_string(), "Bo Chen".to_string()],
            journal: "Exp Dermatol".to_string(),
            ..Default::default()
        })
        .unwrap();

        let rendered = papers_table(&[paper]).to_string();
        assert!(rendered.contains("Keratinocyte stress"));
        assert!(rendered.contains("Ana Lima et al."));
        assert!(rendered.contains("https://pubmed.ncbi.nlm.nih.gov/7/"));
    }
}
