use murmur_core::{StoreError, ValidationError};
use thiserror::Error;

use crate::eligibility::Ineligible;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("'{0}' is not a platform topic")]
    UnknownTopic(String),

    #[error("post {id} skipped: {reason}")]
    Ineligible { id: String, reason: Ineligible },

    #[error("envelope failed validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("queue message is not JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
