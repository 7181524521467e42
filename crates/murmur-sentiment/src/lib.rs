//! Enrichment for harvested envelopes.
//!
//! Scores sentiment with a general-purpose English lexicon, extracts the top
//! keywords, drops text that is too short or not Latin-script, and forwards
//! enriched envelopes to the indexing topic.

pub mod eligibility;
pub mod enrich;
pub mod error;
pub mod keywords;
pub mod scorer;

pub use eligibility::{check_eligible, Ineligible};
pub use enrich::{enrich, process_batch, EnrichReport};
pub use error::SentimentError;
pub use keywords::{extract_keywords, MAX_KEYWORDS};
pub use scorer::lexicon_score;
