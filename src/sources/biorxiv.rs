//! bioRxiv/medRxiv source implementation.
//!
//! Both servers are served by the same `details` API on `api.biorxiv.org`,
//! so one source type handles either, selected by [`PreprintServer`].

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use std::collections::hash_map::{Entry, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Paper, PreprintRecord, PreprintServer};
use crate::parse::{parse_page, PreprintPage};
use crate::sources::{Pacing, Source, SourceError};
use crate::utils::{with_retry, HttpClient};

/// Base URL of the `details` API for both servers
pub const PREPRINT_API_URL: &str = "https://api.biorxiv.org";

/// Records per page returned by the `details` API
pub const PREPRINT_PAGE_SIZE: usize = 100;

/// Default delay between pages
pub const PREPRINT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// What to ask a preprint server for
#[derive(Debug, Clone, PartialEq)]
pub struct PreprintQuery {
    pub server: PreprintServer,
    /// Lookback window in days, ending today
    pub days: u32,
    /// Subject categories; a record matches if any of them is contained in its own
    pub categories: Vec<String>,
    /// Keywords; a record matches if its title or abstract contains any of them
    pub keywords: Vec<String>,
    pub max_results: usize,
}

impl PreprintQuery {
    pub fn new(server: PreprintServer) -> Self {
        Self {
            server,
            days: 1,
            categories: Vec::new(),
            keywords: Vec::new(),
            max_results: 50,
        }
    }

    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories = categories
            .into_iter()
            .map(|c| normalize_category(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Whether any filter was given; an unfiltered query is not worth fetching
    pub fn is_configured(&self) -> bool {
        !self.categories.is_empty() || !self.keywords.is_empty()
    }

    /// Apply the category filter, then the keyword filter
    pub fn matches(&self, record: &PreprintRecord) -> bool {
        if !self.categories.is_empty() {
            let category = normalize_category(&record.category);
            if !self.categories.iter().any(|c| category.contains(c.as_str())) {
                return false;
            }
        }

        if !self.keywords.is_empty() {
            let text = record.searchable_text();
            if !self.keywords.iter().any(|k| text.contains(k.as_str())) {
                return false;
            }
        }

        true
    }
}

/// Lowercase, whitespace runs become `_` ("Cancer Biology" -> "cancer_biology")
fn normalize_category(category: &str) -> String {
    category
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// bioRxiv or medRxiv source
#[derive(Debug, Clone)]
pub struct PreprintSource {
    client: Arc<HttpClient>,
    query: PreprintQuery,
    pacing: Pacing,
    base_url: String,
    end_date: Option<NaiveDate>,
}

impl PreprintSource {
    pub fn new(client: Arc<HttpClient>, query: PreprintQuery) -> Self {
        Self {
            client,
            query,
            pacing: Pacing::new(PREPRINT_REQUEST_DELAY),
            base_url: PREPRINT_API_URL.to_string(),
            end_date: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pin the last day of the window instead of using today's local date
    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn query(&self) -> &PreprintQuery {
        &self.query
    }

    /// `(start, end)` of the query window
    fn window(&self) -> (NaiveDate, NaiveDate) {
        let end = self.end_date.unwrap_or_else(|| Local::now().date_naive());
        let start = end
            .checked_sub_days(Days::new(u64::from(self.query.days)))
            .unwrap_or(end);
        (start, end)
    }

    fn page_url(&self, start: NaiveDate, end: NaiveDate, cursor: usize) -> String {
        format!(
            "{}/details/{}/{}/{}/{}",
            self.base_url,
            self.query.server.name(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            cursor
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<PreprintPage, SourceError> {
        tracing::debug!("GET {}", url);
        let client = &self.client;
        let body = with_retry(self.pacing.retry, || client.get_text(url)).await?;
        parse_page(&body, self.query.server)
    }
}

#[async_trait]
impl Source for PreprintSource {
    fn id(&self) -> &str {
        self.query.server.name()
    }

    fn name(&self) -> &str {
        self.query.server.display_name()
    }

    async fn fetch(&self) -> Vec<Paper> {
        let server = self.query.server;
        let max_results = self.query.max_results;
        let mut papers: Vec<Paper> = Vec::new();
        if max_results == 0 {
            return papers;
        }
        let mut seen: HashMap<String, usize> = HashMap::new();

        let (start, end) = self.window();
        let mut cursor = 0;

        'pages: loop {
            if cursor > 0 {
                self.pacing.pause().await;
            }

            let page = match self.fetch_page(&self.page_url(start, end, cursor)).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "{} page at cursor {} failed, keeping {} papers: {}",
                        server,
                        cursor,
                        papers.len(),
                        e
                    );
                    break;
                }
            };

            if page.received == 0 {
                break;
            }

            for record in page.records {
                if !self.query.matches(&record) {
                    continue;
                }
                let Some(paper) = Paper::from_preprint(server, record) else {
                    continue;
                };

                // Each posted version is listed separately under the same DOI
                match seen.entry(paper.dedup_key()) {
                    Entry::Occupied(slot) => {
                        let kept = &mut papers[*slot.get()];
                        if paper.version() > kept.version() {
                            *kept = paper;
                        }
                    }
                    Entry::Vacant(slot) => {
                        if papers.len() >= max_results {
                            break 'pages;
                        }
                        slot.insert(papers.len());
                        papers.push(paper);
                    }
                }
            }

            if papers.len() >= max_results {
                break;
            }

            cursor += PREPRINT_PAGE_SIZE;
            if cursor >= page.total.unwrap_or(0) {
                break;
            }
        }

        tracing::info!("Fetched {} papers from {}", papers.len(), server);
        papers
    }
}
