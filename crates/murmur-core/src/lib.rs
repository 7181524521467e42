//! Shared domain types for the murmur harvesting pipeline.
//!
//! Holds the canonical [`Envelope`] schema, the validation gate every record
//! passes before it moves downstream, the collaborator traits implemented by
//! the storage crates, and environment-driven configuration.

pub mod app_config;
pub mod config;
pub mod cursor;
pub mod envelope;
pub mod feed;
pub mod ports;
pub mod tags;
pub mod text;
pub mod validate;

use thiserror::Error;

pub use app_config::{
    AppConfig, BlueskyCredentials, ElasticConfig, Environment, MastodonCredentials,
    RedditCredentials,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use cursor::{cursor_key, Cursor};
pub use envelope::{
    document_id, format_timestamp, parse_timestamp, Account, Envelope, Platform, Post,
    SentimentLabel, SCHEMA_VERSION,
};
pub use feed::{Rotation, SnapshotFeed};
pub use ports::{CursorStore, MessageQueue, PopOrder, StoreError, TagQueue, ELASTIC_TOPIC};
pub use tags::{load_tags, parse_tags, TagsFile};
pub use text::strip_html;
pub use validate::{validate, Stage, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tags file {path}: {source}")]
    TagsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tags file: {0}")]
    TagsFileParse(#[from] serde_yaml::Error),

    #[error("tags file validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown feed: {0}")]
    UnknownFeed(String),
}
