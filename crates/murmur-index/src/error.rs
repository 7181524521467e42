use murmur_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index returned HTTP {status} for {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("failed to decode {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid index URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexError {
    /// Whether retrying the same request later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            IndexError::Http(_) | IndexError::Store(_) => true,
            IndexError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            IndexError::Deserialize { .. } | IndexError::InvalidBaseUrl { .. } => false,
        }
    }
}
