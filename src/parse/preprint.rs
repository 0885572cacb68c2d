//! bioRxiv/medRxiv `details` endpoint JSON parsing.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::models::{PreprintRecord, PreprintServer};
use crate::sources::SourceError;

/// One decoded page of the `details` endpoint
#[derive(Debug, Clone, Default)]
pub struct PreprintPage {
    /// Records carrying both a title and an abstract
    pub records: Vec<PreprintRecord>,
    /// Number of entries the server returned, valid or not
    pub received: usize,
    /// Total records the server reports for the query window
    pub total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    collection: Vec<serde_json::Value>,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default, deserialize_with = "lenient_count")]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    #[serde(rename = "abstract")]
    r#abstract: Option<String>,
    authors: Option<Authors>,
    doi: Option<String>,
    date: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    version: Option<u32>,
    author_corresponding_institution: Option<String>,
}

/// The API sends `"A, B.; C, D."`, but arrays show up in mirrored dumps
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    List(Vec<String>),
    Joined(String),
}

impl Authors {
    fn into_names(self) -> Vec<String> {
        let names = match self {
            Authors::List(names) => names,
            Authors::Joined(joined) => joined.split(';').map(str::to_string).collect(),
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// Counts arrive as numbers or as numeric strings depending on the field.
/// Out-of-range or malformed values read as absent.
fn lenient_count<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count<T> {
        Number(T),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Option::<Count<T>>::deserialize(deserializer)? {
        Some(Count::Number(n)) => Some(n),
        Some(Count::Text(s)) => s.trim().parse().ok(),
        Some(Count::Other(_)) | None => None,
    })
}

/// Parse one page of the `details` endpoint.
///
/// Fails only if the body is not a JSON object of the expected shape. An
/// individual entry of the wrong shape is skipped and logged; an entry
/// without title or abstract is dropped silently.
pub fn parse_page(body: &str, server: PreprintServer) -> Result<PreprintPage, SourceError> {
    let response: ApiResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::Parse(format!("Failed to parse {} JSON: {}", server.display_name(), e))
    })?;

    let received = response.collection.len();
    let total = response.messages.first().and_then(|m| m.total);

    let records = response
        .collection
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Article>(entry) {
            Ok(article) => Some(article),
            Err(e) => {
                tracing::debug!("Skipping malformed {} entry: {}", server.display_name(), e);
                None
            }
        })
        .map(into_record)
        .filter(|r| !r.title.trim().is_empty() && !r.abstract_text.trim().is_empty())
        .collect();

    Ok(PreprintPage {
        records,
        received,
        total,
    })
}

fn into_record(article: Article) -> PreprintRecord {
    let affiliations_raw = article
        .author_corresponding_institution
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .into_iter()
        .collect();

    PreprintRecord {
        title: article.title.unwrap_or_default().trim().to_string(),
        abstract_text: article.r#abstract.unwrap_or_default().trim().to_string(),
        authors: article.authors.map(Authors::into_names).unwrap_or_default(),
        doi: article.doi.unwrap_or_default().trim().to_string(),
        published_date: article.date.unwrap_or_default(),
        category: article.category.unwrap_or_default(),
        version: article.version.unwrap_or(1),
        affiliations_raw,
    }
}
