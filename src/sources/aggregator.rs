//! Aggregation across the configured sources.

use futures_util::future::join_all;
use std::sync::Arc;

use super::Source;
use crate::config::{FetchConfig, FetchMode};
use crate::models::Paper;
use crate::utils::{deduplicate_papers, find_duplicates, HttpClient};

#[cfg(feature = "source-biorxiv")]
use super::{PreprintQuery, PreprintSource};
#[cfg(feature = "source-biorxiv")]
use crate::models::PreprintServer;
#[cfg(feature = "source-pubmed")]
use super::{PubMedEndpoints, PubMedQuery, PubMedSource};

/// Fans out to every registered source and merges the results
///
/// Papers come back in registration order, each source's papers in the
/// order that source produced them, with duplicates removed (first seen
/// wins).
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    sources: Vec<Arc<dyn Source>>,
    mode: FetchMode,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn Source>>) -> Self {
        Self {
            sources,
            mode: FetchMode::default(),
        }
    }

    /// Build every source the configuration enables
    pub fn from_config(config: &FetchConfig, client: Arc<HttpClient>) -> Self {
        let mut aggregator = Self::default().with_mode(config.fetch_mode);

        #[cfg(feature = "source-pubmed")]
        {
            if config.pubmed_query.trim().is_empty() {
                tracing::info!("No PubMed query configured, skipping PubMed");
            } else {
                let query = PubMedQuery::new(config.pubmed_query.trim())
                    .days(config.days)
                    .max_results(config.max_per_source)
                    .api_key(config.ncbi_api_key.clone());
                let endpoints = config
                    .endpoints
                    .pubmed_base_url
                    .as_deref()
                    .map(PubMedEndpoints::with_base)
                    .unwrap_or_default();
                aggregator.register(Arc::new(
                    PubMedSource::new(Arc::clone(&client), query)
                        .with_pacing(config.pubmed_pacing())
                        .with_endpoints(endpoints),
                ));
            }
        }

        #[cfg(feature = "source-biorxiv")]
        {
            let servers = [
                (
                    PreprintServer::BioRxiv,
                    &config.biorxiv_categories,
                    &config.biorxiv_keywords,
                ),
                (
                    PreprintServer::MedRxiv,
                    &config.medrxiv_categories,
                    &config.medrxiv_keywords,
                ),
            ];

            for (server, categories, keywords) in servers {
                let query = PreprintQuery::new(server)
                    .days(config.days)
                    .categories(categories)
                    .keywords(keywords)
                    .max_results(config.max_per_source);

                if !query.is_configured() {
                    tracing::info!("No {} categories or keywords configured, skipping {}", server, server);
                    continue;
                }

                let mut source = PreprintSource::new(Arc::clone(&client), query)
                    .with_pacing(config.preprint_pacing());
                if let Some(base_url) = &config.endpoints.preprint_base_url {
                    source = source.with_base_url(base_url.as_str());
                }
                aggregator.register(Arc::new(source));
            }
        }

        #[cfg(not(any(feature = "source-pubmed", feature = "source-biorxiv")))]
        let _ = (config, client);

        aggregator
    }

    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Register a source after the existing ones
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.push(source);
    }

    /// Get all source IDs, in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if no source is registered
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Fetch from every source and deduplicate
    pub async fn fetch_all(&self) -> Vec<Paper> {
        if self.sources.is_empty() {
            tracing::warn!("No sources configured, nothing to fetch");
            return Vec::new();
        }

        let per_source: Vec<Vec<Paper>> = match self.mode {
            FetchMode::Sequential => {
                let mut results = Vec::with_capacity(self.sources.len());
                for source in &self.sources {
                    results.push(source.fetch().await);
                }
                results
            }
            FetchMode::Concurrent => join_all(self.sources.iter().map(|s| s.fetch())).await,
        };

        let mut papers = Vec::new();
        for (source, fetched) in self.sources.iter().zip(per_source) {
            tracing::info!("{}: {} papers", source.name(), fetched.len());
            papers.extend(fetched);
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            for group in find_duplicates(&papers) {
                tracing::debug!(
                    "Dropping {} duplicate(s) of \"{}\"",
                    group.len() - 1,
                    papers[group[0]].title()
                );
            }
        }

        let total = papers.len();
        let papers = deduplicate_papers(papers);
        tracing::info!(
            "Collected {} unique papers ({} duplicates removed)",
            papers.len(),
            total - papers.len()
        );
        papers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PubMedRecord;
    use crate::sources::MockSource;

    fn paper(pmid: &str, title: &str, doi: &str) -> Paper {
        Paper::from_pubmed(PubMedRecord {
            pmid: pmid.to_string(),
            title: title.to_string(),
            abstract_text: "Abstract.".to_string(),
            doi: doi.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn titles(papers: &[Paper]) -> Vec<&str> {
        papers.iter().map(|p| p.title()).collect()
    }

    fn two_sources() -> [Arc<MockSource>; 2] {
        [
            Arc::new(MockSource::new(
                "first",
                vec![paper("1", "Alpha", "10.1/a"), paper("2", "Beta", "")],
            )),
            Arc::new(MockSource::new(
                "second",
                vec![
                    paper("3", "Alpha again", "10.1/a"),
                    paper("4", "  BETA ", ""),
                    paper("5", "Gamma", "10.1/g"),
                ],
            )),
        ]
    }

    fn registered(mocks: &[Arc<MockSource>]) -> Vec<Arc<dyn Source>> {
        mocks
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn Source>)
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_all_sequential() {
        let mocks = two_sources();
        let aggregator = Aggregator::new(registered(&mocks));
        let papers = aggregator.fetch_all().await;
        assert_eq!(titles(&papers), vec!["Alpha", "Beta", "Gamma"]);
        assert!(mocks.iter().all(|m| m.fetch_count() == 1));
    }

    #[tokio::test]
    async fn test_fetch_all_concurrent_keeps_order() {
        let mocks = two_sources();
        let aggregator = Aggregator::new(registered(&mocks)).with_mode(FetchMode::Concurrent);
        let papers = aggregator.fetch_all().await;
        assert_eq!(titles(&papers), vec!["Alpha", "Beta", "Gamma"]);
        assert!(mocks.iter().all(|m| m.fetch_count() == 1));
    }

    #[tokio::test]
    async fn test_fetch_all_survives_empty_source() {
        let mut aggregator = Aggregator::new(vec![Arc::new(MockSource::new("down", Vec::new()))]);
        aggregator.register(Arc::new(MockSource::new("up", vec![paper("9", "Only", "")])));

        let papers = aggregator.fetch_all().await;
        assert_eq!(titles(&papers), vec!["Only"]);
    }

    #[tokio::test]
    async fn test_no_sources() {
        assert!(Aggregator::default().fetch_all().await.is_empty());
    }

    #[test]
    fn test_from_config_skips_unconfigured_sources() {
        let client = Arc::new(HttpClient::new().unwrap());

        let empty = Aggregator::from_config(&FetchConfig::default(), Arc::clone(&client));
        assert!(empty.is_empty());

        let config = FetchConfig {
            pubmed_query: "psoriasis".to_string(),
            medrxiv_keywords: vec!["covid".to_string()],
            fetch_mode: FetchMode::Concurrent,
            ..Default::default()
        };
        let aggregator = Aggregator::from_config(&config, client);
        assert_eq!(aggregator.ids().collect::<Vec<_>>(), vec!["pubmed", "medrxiv"]);
        assert_eq!(aggregator.mode(), FetchMode::Concurrent);
    }

    #[test]
    fn test_blank_query_and_filters_do_not_count() {
        let config = FetchConfig {
            pubmed_query: "   ".to_string(),
            biorxiv_categories: vec![" ".to_string()],
            ..Default::default()
        };
        let aggregator = Aggregator::from_config(&config, Arc::new(HttpClient::new().unwrap()));
        assert!(aggregator.is_empty());
    }
}
