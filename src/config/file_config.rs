//! Configuration file discovery and serialization.
//!
//! # Configuration File Format
//!
//! ```toml
//! pubmed_query = "(psoriasis[Title/Abstract]) AND (IL-17 OR IL-23)"
//! biorxiv_categories = ["immunology", "genomics"]
//! biorxiv_keywords = ["psoriasis", "skin"]
//! medrxiv_keywords = "dermatology+psoriasis"
//! days = 1
//! max_per_source = 50
//! ncbi_api_key = "your-ncbi-key"
//! fetch_mode = "sequential"
//!
//! [http]
//! timeout_secs = 30
//! user_agent = "biomed-digest/0.1"
//!
//! [pacing]
//! pubmed_delay_ms = 400
//! preprint_delay_ms = 1000
//! max_attempts = 3
//!
//! [endpoints]
//! pubmed_base_url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//! preprint_base_url = "https://api.biorxiv.org"
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use std::path::{Path, PathBuf};

use super::{ConfigError, FetchConfig};

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "biomed-digest.toml";

/// Candidate configuration files, in lookup order
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("biomed-digest").join("config.toml"));
    }
    paths
}

/// First existing configuration file, if any
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.is_file())
}

impl FetchConfig {
    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write as TOML, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
