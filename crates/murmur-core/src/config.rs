use chrono::{DateTime, Utc};

use crate::app_config::{
    AppConfig, BlueskyCredentials, ElasticConfig, Environment, MastodonCredentials,
    RedditCredentials,
};
use crate::envelope::parse_timestamp;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default =
        |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_instant = |var: &str, default: &str| -> Result<DateTime<Utc>, ConfigError> {
        let raw = or_default(var, default);
        parse_timestamp(&raw).ok_or_else(|| invalid(var, format!("not an ISO-8601 timestamp: {raw}")))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("MURMUR_ENV", "development"))?;

    let bind_addr = parse_addr("MURMUR_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("MURMUR_LOG_LEVEL", "info");
    let tags_path = PathBuf::from(or_default("MURMUR_TAGS_PATH", "./config/tags.yaml"));
    let historical_boundary =
        parse_instant("MURMUR_HISTORICAL_BOUNDARY", "2023-01-01T00:00:00Z")?;

    let http_timeout_secs = parse_u64("MURMUR_HTTP_TIMEOUT_SECS", "30")?;
    let emit_timeout_secs = parse_u64("MURMUR_EMIT_TIMEOUT_SECS", "5")?;
    let user_agent = or_default("MURMUR_USER_AGENT", "murmur/0.1 (social-harvester)");
    let max_retries = parse_u32("MURMUR_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("MURMUR_RETRY_BACKOFF_BASE_MS", "500")?;

    let db_max_connections = parse_u32("MURMUR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MURMUR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("MURMUR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    // Each credential group is all-or-nothing: one key present means the rest are required.
    let reddit = match optional("REDDIT_CLIENT_ID") {
        None => None,
        Some(client_id) => Some(RedditCredentials {
            client_id,
            client_secret: require("REDDIT_CLIENT_SECRET")?,
            user_agent: or_default("REDDIT_USER_AGENT", &user_agent),
        }),
    };

    let mastodon = match optional("MASTODON_ACCESS_TOKEN") {
        None => None,
        Some(access_token) => Some(MastodonCredentials {
            api_base_url: require("MASTODON_API_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            access_token,
        }),
    };

    let bluesky = match optional("BSKY_USERNAME") {
        None => None,
        Some(username) => Some(BlueskyCredentials {
            username,
            app_password: require("BSKY_APP_PASSWORD")?,
        }),
    };

    let elastic = optional("ELASTIC_URL").map(|url| ElasticConfig {
        url: url.trim_end_matches('/').to_string(),
        username: optional("ELASTIC_USERNAME"),
        password: optional("ELASTIC_PASSWORD"),
        index: or_default("ELASTIC_INDEX", "socialplatform"),
    });

    if db_min_connections > db_max_connections {
        return Err(invalid(
            "MURMUR_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds MURMUR_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        tags_path,
        historical_boundary,
        http_timeout_secs,
        emit_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        reddit,
        mastodon,
        bluesky,
        elastic,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MURMUR_ENV".to_string(),
            reason: format!("expected development, test, or production; got {other}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
