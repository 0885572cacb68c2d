//! Wire-format parsers.
//!
//! Pure functions from a raw response body to normalized records or papers.
//! Nothing here performs I/O or holds state.
//!
//! - [`pubmed`]: PubMed efetch XML
//! - [`preprint`]: bioRxiv/medRxiv `details` JSON
//! - [`xml`]: the small element tree the PubMed parser walks

pub mod preprint;
pub mod pubmed;
pub mod xml;

pub use preprint::{parse_page, PreprintPage};
pub use pubmed::parse_article_set;
