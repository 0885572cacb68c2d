//! PubMed source implementation using the E-utilities API.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::Paper;
use crate::parse::parse_article_set;
use crate::sources::{Pacing, Source, SourceError};
use crate::utils::{with_retry, HttpClient};

/// PubMed E-utilities API base URL
pub const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Number of ids requested per `efetch` call
pub const PUBMED_BATCH_SIZE: usize = 50;

/// Default delay between `efetch` batches
pub const PUBMED_REQUEST_DELAY: Duration = Duration::from_millis(400);

/// What to ask PubMed for
#[derive(Debug, Clone, PartialEq)]
pub struct PubMedQuery {
    /// Entrez boolean query, passed through verbatim
    pub term: String,
    /// Lookback window in days, by Entrez date
    pub days: u32,
    /// Maximum number of ids to request from `esearch`
    pub max_results: usize,
    /// NCBI API key
    pub api_key: Option<String>,
}

impl PubMedQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            days: 1,
            max_results: 50,
            api_key: None,
        }
    }

    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }
}

/// `esearch` and `efetch` endpoint URLs
#[derive(Debug, Clone, PartialEq)]
pub struct PubMedEndpoints {
    pub search_url: String,
    pub fetch_url: String,
}

impl PubMedEndpoints {
    /// Endpoints under a different E-utilities base URL
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            search_url: format!("{}/esearch.fcgi", base),
            fetch_url: format!("{}/efetch.fcgi", base),
        }
    }
}

impl Default for PubMedEndpoints {
    fn default() -> Self {
        Self::with_base(PUBMED_EUTILS_URL)
    }
}

/// PubMed source
///
/// Searches recent PubMed entries with `esearch`, then fetches the matching
/// records in batches with `efetch`.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    query: PubMedQuery,
    pacing: Pacing,
    endpoints: PubMedEndpoints,
}

impl PubMedSource {
    /// Create a new PubMed source with default pacing and endpoints
    pub fn new(client: Arc<HttpClient>, query: PubMedQuery) -> Self {
        Self {
            client,
            query,
            pacing: Pacing::new(PUBMED_REQUEST_DELAY),
            endpoints: PubMedEndpoints::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_endpoints(mut self, endpoints: PubMedEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn query(&self) -> &PubMedQuery {
        &self.query
    }

    /// Build E-utilities search URL
    fn build_search_url(&self) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", self.query.term.clone()),
            ("retmax", self.query.max_results.to_string()),
            ("retmode", "json".to_string()),
            ("sort", "date".to_string()),
            ("datetype", "edat".to_string()),
            ("reldate", self.query.days.to_string()),
        ];
        if let Some(key) = &self.query.api_key {
            params.push(("api_key", key.clone()));
        }

        format!("{}?{}", self.endpoints.search_url, encode_params(&params))
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(&self, ids: &[String]) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
            ("rettype", "abstract".to_string()),
        ];
        if let Some(key) = &self.query.api_key {
            params.push(("api_key", key.clone()));
        }

        format!("{}?{}", self.endpoints.fetch_url, encode_params(&params))
    }

    /// Parse E-utilities search response JSON
    fn parse_search_response(json: &str) -> Result<Vec<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESearchResponse {
            esearchresult: ESearchResult,
        }

        #[derive(Debug, Deserialize)]
        struct ESearchResult {
            #[serde(default)]
            idlist: Vec<String>,
        }

        let response: ESearchResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search JSON: {}", e)))?;

        Ok(response.esearchresult.idlist)
    }

    async fn get(&self, url: &str) -> Result<String, SourceError> {
        tracing::debug!("GET {}", url);
        let client = &self.client;
        with_retry(self.pacing.retry, || client.get_text(url)).await
    }

    async fn search_ids(&self) -> Result<Vec<String>, SourceError> {
        let body = self.get(&self.build_search_url()).await?;
        Self::parse_search_response(&body)
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Paper>, SourceError> {
        let body = self.get(&self.build_fetch_url(ids)).await?;
        parse_article_set(&body)
    }
}

fn encode_params(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn fetch(&self) -> Vec<Paper> {
        let ids = match self.search_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("PubMed search failed: {}", e);
                return Vec::new();
            }
        };

        if ids.is_empty() {
            tracing::info!("PubMed search returned no ids");
            return Vec::new();
        }
        tracing::debug!("PubMed search returned {} ids", ids.len());

        let mut papers = Vec::new();
        for (index, batch) in ids.chunks(PUBMED_BATCH_SIZE).enumerate() {
            if index > 0 {
                self.pacing.pause().await;
            }

            match self.fetch_batch(batch).await {
                Ok(batch_papers) => papers.extend(batch_papers),
                Err(e) => {
                    tracing::warn!(
                        "Skipping PubMed batch {} ({} ids): {}",
                        index + 1,
                        batch.len(),
                        e
                    );
                }
            }
        }

        tracing::info!("Fetched {} papers from PubMed", papers.len());
        papers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn article_xml(pmid: &str, title: &str) -> String {
        format!(
            r#"<PubmedArticle>
                <MedlineCitation>
                    <PMID>{pmid}</PMID>
                    <Article>
                        <ArticleTitle>{title}</ArticleTitle>
                        <Abstract><AbstractText>Abstract of {pmid}.</AbstractText></Abstract>
                    </Article>
                </MedlineCitation>
            </PubmedArticle>"#
        )
    }

    fn article_set(articles: &[String]) -> String {
        format!("<PubmedArticleSet>{}</PubmedArticleSet>", articles.join(""))
    }

    fn search_body(ids: &[String]) -> String {
        serde_json::json!({
            "header": {"type": "esearch", "version": "0.3"},
            "esearchresult": {"count": ids.len().to_string(), "idlist": ids}
        })
        .to_string()
    }

    fn source(server: &mockito::Server, query: PubMedQuery) -> PubMedSource {
        PubMedSource::new(Arc::new(HttpClient::new().unwrap()), query)
            .with_pacing(Pacing::none())
            .with_endpoints(PubMedEndpoints::with_base(&server.url()))
    }

    #[test]
    fn test_build_search_url() {
        let source = PubMedSource::new(
            Arc::new(HttpClient::new().unwrap()),
            PubMedQuery::new("psoriasis[Title/Abstract] AND IL-17")
                .days(3)
                .max_results(20)
                .api_key(Some("secret".to_string())),
        );
        let url = source.build_search_url();

        assert!(url.starts_with(&format!("{}/esearch.fcgi?", PUBMED_EUTILS_URL)));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=psoriasis%5BTitle%2FAbstract%5D%20AND%20IL-17"));
        assert!(url.contains("retmax=20"));
        assert!(url.contains("retmode=json"));
        assert!(url.contains("sort=date"));
        assert!(url.contains("datetype=edat"));
        assert!(url.contains("reldate=3"));
        assert!(url.contains("api_key=secret"));
    }

    #[test]
    fn test_build_fetch_url() {
        let source = PubMedSource::new(Arc::new(HttpClient::new().unwrap()), PubMedQuery::new("x"));
        let url = source.build_fetch_url(&["1".to_string(), "2".to_string()]);

        assert!(url.starts_with(&format!("{}/efetch.fcgi?", PUBMED_EUTILS_URL)));
        assert!(url.contains("id=1%2C2"));
        assert!(url.contains("retmode=xml"));
        assert!(url.contains("rettype=abstract"));
        assert!(!url.contains("api_key"));
    }

    #[test]
    fn test_blank_api_key_ignored() {
        let query = PubMedQuery::new("x").api_key(Some("  ".to_string()));
        assert_eq!(query.api_key, None);
    }

    #[test]
    fn test_parse_search_response() {
        let ids = PubMedSource::parse_search_response(&search_body(&["5".into(), "6".into()])).unwrap();
        assert_eq!(ids, vec!["5", "6"]);

        let errored = r#"{"esearchresult": {"ERROR": "Invalid query"}}"#;
        assert!(PubMedSource::parse_search_response(errored).unwrap().is_empty());

        assert!(PubMedSource::parse_search_response("<eSearchResult/>").is_err());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("term".into(), "psoriasis".into()),
                Matcher::UrlEncoded("reldate".into(), "1".into()),
            ]))
            .with_body(search_body(&["101".into(), "102".into()]))
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "101,102".into()))
            .with_body(article_set(&[
                article_xml("101", "First"),
                article_xml("102", "Second"),
            ]))
            .create_async()
            .await;

        let papers = source(&server, PubMedQuery::new("psoriasis")).fetch().await;

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].secondary_id(), "101");
        assert_eq!(papers[1].title(), "Second");
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_failure_returns_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let papers = source(&server, PubMedQuery::new("x")).fetch().await;

        assert!(papers.is_empty());
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_search_skips_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body(search_body(&[]))
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        assert!(source(&server, PubMedQuery::new("x")).fetch().await.is_empty());
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_batch_is_skipped() {
        let ids: Vec<String> = (1..=PUBMED_BATCH_SIZE + 1).map(|i| i.to_string()).collect();
        let first_batch = ids[..PUBMED_BATCH_SIZE].join(",");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body(search_body(&ids))
            .create_async()
            .await;
        let failed = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), first_batch))
            .with_status(500)
            .create_async()
            .await;
        let succeeded = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "51".into()))
            .with_body(article_set(&[article_xml("51", "Survivor")]))
            .create_async()
            .await;

        let papers = source(&server, PubMedQuery::new("x").max_results(100))
            .fetch()
            .await;

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title(), "Survivor");
        failed.assert_async().await;
        succeeded.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_batch_is_skipped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body(search_body(&["7".into()]))
            .create_async()
            .await;
        server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_body("<PubmedArticleSet><PubmedArticle>")
            .create_async()
            .await;

        assert!(source(&server, PubMedQuery::new("x")).fetch().await.is_empty());
    }
}
