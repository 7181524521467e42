use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Reddit script-app credentials used for the client-credentials grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Clone)]
pub struct MastodonCredentials {
    pub api_base_url: String,
    pub access_token: String,
}

impl std::fmt::Debug for MastodonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonCredentials")
            .field("api_base_url", &self.api_base_url)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct BlueskyCredentials {
    pub username: String,
    pub app_password: String,
}

impl std::fmt::Debug for BlueskyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueskyCredentials")
            .field("username", &self.username)
            .field("app_password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct ElasticConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index: String,
}

impl std::fmt::Debug for ElasticConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("index", &self.index)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub tags_path: PathBuf,
    /// Posts older than this retire their tag from rotation.
    pub historical_boundary: DateTime<Utc>,
    pub http_timeout_secs: u64,
    /// Upper bound on a single downstream emit.
    pub emit_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub reddit: Option<RedditCredentials>,
    pub mastodon: Option<MastodonCredentials>,
    pub bluesky: Option<BlueskyCredentials>,
    pub elastic: Option<ElasticConfig>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when Reddit credentials are not configured.
    pub fn reddit_credentials(&self) -> Result<&RedditCredentials, ConfigError> {
        self.reddit
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("REDDIT_CLIENT_ID".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when Mastodon credentials are not configured.
    pub fn mastodon_credentials(&self) -> Result<&MastodonCredentials, ConfigError> {
        self.mastodon
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("MASTODON_ACCESS_TOKEN".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when Bluesky credentials are not configured.
    pub fn bluesky_credentials(&self) -> Result<&BlueskyCredentials, ConfigError> {
        self.bluesky
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("BSKY_USERNAME".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when no search cluster is configured.
    pub fn elastic_config(&self) -> Result<&ElasticConfig, ConfigError> {
        self.elastic
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("ELASTIC_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("tags_path", &self.tags_path)
            .field("database_url", &"[redacted]")
            .field("historical_boundary", &self.historical_boundary)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("emit_timeout_secs", &self.emit_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("reddit", &self.reddit)
            .field("mastodon", &self.mastodon)
            .field("bluesky", &self.bluesky)
            .field("elastic", &self.elastic)
            .finish()
    }
}
