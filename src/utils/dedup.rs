//! Deduplication of papers across sources.

use std::collections::{HashMap, HashSet};

use crate::models::Paper;

/// Remove duplicate papers, keeping the first occurrence of each.
///
/// Two papers are duplicates when they share a [`Paper::dedup_key`]: the DOI
/// if present, else the trimmed, lower-cased title. Order is preserved.
pub fn deduplicate_papers(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen: HashSet<String> = HashSet::with_capacity(papers.len());
    papers
        .into_iter()
        .filter(|paper| seen.insert(paper.dedup_key()))
        .collect()
}

/// Find groups of paper indices sharing a dedup key
///
/// Only groups with more than one member are returned, ordered by the
/// position of their first member.
pub fn find_duplicates(papers: &[Paper]) -> Vec<Vec<usize>> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (idx, paper) in papers.iter().enumerate() {
        match by_key.get(&paper.dedup_key()) {
            Some(&group) => groups[group].push(idx),
            None => {
                by_key.insert(paper.dedup_key(), groups.len());
                groups.push(vec![idx]);
            }
        }
    }

    groups.retain(|g| g.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PreprintRecord, PreprintServer, PubMedRecord};

    fn preprint(doi: &str, title: &str, server: PreprintServer) -> Paper {
        Paper::from_preprint(
            server,
            PreprintRecord {
                title: title.to_string(),
                abstract_text: format!("Abstract of {}", title),
                doi: doi.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn pubmed(pmid: &str, doi: &str, title: &str) -> Paper {
        Paper::from_pubmed(PubMedRecord {
            pmid: pmid.to_string(),
            title: title.to_string(),
            abstract_text: "Abstract".to_string(),
            doi: doi.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_same_doi_keeps_first() {
        let papers = vec![
            pubmed("1", "10.1101/abc", "Published version"),
            preprint("10.1101/abc", "Preprint version", PreprintServer::BioRxiv),
        ];

        let unique = deduplicate_papers(papers);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].title(), "Published version");
    }

    #[test]
    fn test_distinct_dois_all_kept() {
        let papers = vec![
            preprint("10.1/a", "Same title", PreprintServer::BioRxiv),
            preprint("10.1/b", "Same title", PreprintServer::BioRxiv),
            preprint("10.1/c", "Other", PreprintServer::MedRxiv),
        ];

        let unique = deduplicate_papers(papers);
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_title_fallback_ignores_case_and_whitespace() {
        let papers = vec![
            pubmed("1", "", "Skin Barrier Repair"),
            pubmed("2", "", "  skin barrier repair "),
            pubmed("3", "", "SKIN BARRIER REPAIR"),
            pubmed("4", "", "Skin barrier repair in mice"),
        ];

        let unique = deduplicate_papers(papers);
        let ids: Vec<&str> = unique.iter().map(|p| p.paper_id()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_doi_and_title_keys_do_not_mix() {
        let papers = vec![
            pubmed("1", "10.1/x", "Shared title"),
            pubmed("2", "", "Shared title"),
        ];

        assert_eq!(deduplicate_papers(papers).len(), 2);
    }

    #[test]
    fn test_order_preserved() {
        let papers = vec![
            preprint("10.1/c", "C", PreprintServer::BioRxiv),
            preprint("10.1/a", "A", PreprintServer::BioRxiv),
            preprint("10.1/c", "C again", PreprintServer::MedRxiv),
            preprint("10.1/b", "B", PreprintServer::MedRxiv),
        ];

        let titles: Vec<String> = deduplicate_papers(papers)
            .iter()
            .map(|p| p.title().to_string())
            .collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_deduplicating_twice_changes_nothing() {
        let papers = vec![
            pubmed("1", "10.1/x", "X"),
            preprint("10.1/x", "X preprint", PreprintServer::BioRxiv),
            pubmed("2", "", "Y"),
        ];

        let once = deduplicate_papers(papers);
        let twice = deduplicate_papers(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_find_duplicates() {
        let papers = vec![
            preprint("10.1/a", "A", PreprintServer::BioRxiv),
            preprint("10.1/b", "B", PreprintServer::BioRxiv),
            preprint("10.1/a", "A", PreprintServer::MedRxiv),
        ];

        assert_eq!(find_duplicates(&papers), vec![vec![0, 2]]);
        assert!(find_duplicates(&papers[..2]).is_empty());
    }
}
