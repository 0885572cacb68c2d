//! Configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, or the first file found by [`find_config_file`])
//! 3. `BIOMED_DIGEST_*` environment variables (`__` separates nested keys,
//!    e.g. `BIOMED_DIGEST_PACING__MAX_ATTEMPTS=5`)
//! 4. the flat variables older deployments set: `PUBMED_QUERY`,
//!    `BIORXIV_CATEGORIES`, `BIORXIV_KEYWORDS`, `MEDRXIV_CATEGORIES`,
//!    `MEDRXIV_KEYWORDS`, `NCBI_API_KEY`, `FETCH_DAYS`, `MAX_PAPER_NUM` and
//!    `TEST_MODE`
//!
//! List settings accept TOML arrays or `+`-separated strings.

mod file_config;

pub use file_config::{config_search_paths, find_config_file, CONFIG_FILE_NAME};

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::Pacing;
use crate::utils::{api_retry_config, RetryConfig};

/// Lookback window used in test mode
pub const TEST_MODE_DAYS: u32 = 7;

/// Per-source cap used in test mode
pub const TEST_MODE_MAX_PER_SOURCE: usize = 10;

const ENV_PREFIX: &str = "BIOMED_DIGEST";

/// Flat environment variables and the keys they override
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PUBMED_QUERY", "pubmed_query"),
    ("BIORXIV_CATEGORIES", "biorxiv_categories"),
    ("BIORXIV_KEYWORDS", "biorxiv_keywords"),
    ("MEDRXIV_CATEGORIES", "medrxiv_categories"),
    ("MEDRXIV_KEYWORDS", "medrxiv_keywords"),
    ("NCBI_API_KEY", "ncbi_api_key"),
    ("FETCH_DAYS", "days"),
    ("MAX_PAPER_NUM", "max_per_source"),
];

/// Fetch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Entrez query; PubMed is skipped when blank
    pub pubmed_query: String,

    #[serde(deserialize_with = "plus_separated")]
    pub biorxiv_categories: Vec<String>,

    #[serde(deserialize_with = "plus_separated")]
    pub biorxiv_keywords: Vec<String>,

    #[serde(deserialize_with = "plus_separated")]
    pub medrxiv_categories: Vec<String>,

    #[serde(deserialize_with = "plus_separated")]
    pub medrxiv_keywords: Vec<String>,

    /// Lookback window in days
    pub days: u32,

    /// Maximum papers kept per source
    pub max_per_source: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncbi_api_key: Option<String>,

    pub fetch_mode: FetchMode,

    pub http: HttpConfig,

    pub pacing: PacingConfig,

    pub endpoints: EndpointsConfig,

    pub logging: LoggingConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pubmed_query: String::new(),
            biorxiv_categories: Vec::new(),
            biorxiv_keywords: Vec::new(),
            medrxiv_categories: Vec::new(),
            medrxiv_keywords: Vec::new(),
            days: 1,
            max_per_source: 50,
            ncbi_api_key: None,
            fetch_mode: FetchMode::default(),
            http: HttpConfig::default(),
            pacing: PacingConfig::default(),
            endpoints: EndpointsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Widen the window and shrink the per-source cap for quick runs
    pub fn apply_test_mode(&mut self) {
        self.days = TEST_MODE_DAYS;
        self.max_per_source = TEST_MODE_MAX_PER_SOURCE;
    }

    /// Reject values no source can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::Invalid("days must be at least 1".to_string()));
        }
        if self.max_per_source == 0 {
            return Err(ConfigError::Invalid(
                "max_per_source must be at least 1".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pacing for the PubMed source
    pub fn pubmed_pacing(&self) -> Pacing {
        Pacing::new(Duration::from_millis(self.pacing.pubmed_delay_ms)).retry(self.retry_config())
    }

    /// Pacing for the bioRxiv and medRxiv sources
    pub fn preprint_pacing(&self) -> Pacing {
        Pacing::new(Duration::from_millis(self.pacing.preprint_delay_ms))
            .retry(self.retry_config())
    }

    fn retry_config(&self) -> RetryConfig {
        api_retry_config().max_attempts(self.pacing.max_attempts)
    }
}

/// How the aggregator polls its sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// One source after another
    #[default]
    Sequential,
    /// All sources at once
    Concurrent,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Request pacing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay between PubMed `efetch` batches
    pub pubmed_delay_ms: u64,

    /// Delay between preprint pages
    pub preprint_delay_ms: u64,

    /// Attempts per request, including the first
    pub max_attempts: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pubmed_delay_ms: 400,
            preprint_delay_ms: 1000,
            max_attempts: 3,
        }
    }
}

/// Upstream base URLs; unset means the public APIs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubmed_base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprint_base_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accept either a list or a single `+`-separated string
fn plus_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrJoined {
        List(Vec<String>),
        Joined(String),
    }

    let items = match ListOrJoined::deserialize(deserializer)? {
        ListOrJoined::List(items) => items,
        ListOrJoined::Joined(joined) => joined.split('+').map(str::to_string).collect(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// Load configuration from `path`, or from a discovered file, plus the
/// process environment
pub fn load_config(path: Option<&Path>) -> Result<FetchConfig, ConfigError> {
    let file: Option<PathBuf> = match path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    load_config_from(file.as_deref(), std::env::vars().collect())
}

/// Load configuration from an optional file and an explicit environment
pub fn load_config_from(
    file: Option<&Path>,
    env: config::Map<String, String>,
) -> Result<FetchConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(file) = file {
        tracing::debug!("Loading configuration from {}", file.display());
        builder =
            builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(Some(env.clone())),
    );

    for (var, key) in LEGACY_ENV {
        if let Some(value) = env.get(*var) {
            builder = builder.set_override(*key, value.as_str())?;
        }
    }

    let mut config: FetchConfig = builder.build()?.try_deserialize()?;

    if env.get("TEST_MODE").is_some_and(|v| is_truthy(v)) {
        config.apply_test_mode();
    }

    config.validate()?;
    Ok(config)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
