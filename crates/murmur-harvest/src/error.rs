use murmur_core::{ConfigError, Platform, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("rate limited by {platform} (retry after {retry_after_secs}s)")]
    RateLimited {
        platform: Platform,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{platform} rejected credentials: {reason}")]
    Auth { platform: Platform, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {platform} item: {reason}")]
    MalformedSource { platform: Platform, reason: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no {platform} client configured")]
    NotConfigured { platform: Platform },
}

impl HarvestError {
    /// Whether the failure is an upstream condition that clears on its own:
    /// network errors, timeouts, rate limiting, and 5xx responses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            HarvestError::Http(_) | HarvestError::Timeout { .. } | HarvestError::RateLimited { .. } => {
                true
            }
            HarvestError::UnexpectedStatus { status, .. } => *status >= 500,
            HarvestError::Auth { .. }
            | HarvestError::Deserialize { .. }
            | HarvestError::MalformedSource { .. }
            | HarvestError::InvalidBaseUrl { .. }
            | HarvestError::Store(_)
            | HarvestError::Config(_)
            | HarvestError::NotConfigured { .. } => false,
        }
    }

    pub(crate) fn from_send(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            HarvestError::Timeout {
                url: url.to_owned(),
            }
        } else {
            HarvestError::Http(err)
        }
    }

    pub(crate) fn malformed(platform: Platform, reason: impl Into<String>) -> Self {
        HarvestError::MalformedSource {
            platform,
            reason: reason.into(),
        }
    }
}
