//! HTTP page sources for Reddit, Mastodon, and Bluesky.
//!
//! Clients that sign in do so lazily on their first request and keep the token
//! until the upstream rejects it with 401/403. The rejected request then signs
//! in again and is sent once more.

mod bluesky;
mod mastodon;
mod reddit;

use std::future::Future;
use std::time::Duration;

use murmur_core::{AppConfig, Platform};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::HarvestError;
use crate::retry::RetryPolicy;

pub use bluesky::BlueskyClient;
pub use mastodon::{next_max_id, MastodonClient};
pub use mastodon::MastodonPublicSource;
pub use reddit::{oldest_fullname, RedditClient, RedditHotSource};

/// Path-segment encoding: everything but unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Transport settings shared by every platform client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl HttpSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "murmur/0.1 (social-harvester)".to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

fn build_http(settings: &HttpSettings) -> Result<Client, HarvestError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(&settings.user_agent)
        .build()?)
}

/// Parse a base URL, forcing a single trailing slash so `join` appends
/// rather than replacing the last path segment.
fn parse_base_url(raw: &str) -> Result<Url, HarvestError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| HarvestError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn join(base: &Url, path: &str) -> Result<Url, HarvestError> {
    base.join(path).map_err(|e| HarvestError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Cached bearer token for clients that sign in.
#[derive(Debug, Default)]
struct TokenCache {
    token: Mutex<Option<String>>,
}

impl TokenCache {
    /// Concurrent callers wait on the lock, so only one sign-in is in flight.
    async fn get_or_sign_in<F, Fut>(&self, sign_in: F) -> Result<String, HarvestError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, HarvestError>>,
    {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }
        let fresh = sign_in().await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drops `stale` unless another request already replaced it.
    async fn discard(&self, stale: &str) {
        let mut token = self.token.lock().await;
        if token.as_deref() == Some(stale) {
            *token = None;
        }
    }

    /// Run `request` with the cached token. An auth rejection discards the
    /// token, signs in again, and repeats the request once.
    async fn authorized<T, S, SFut, R, RFut>(
        &self,
        platform: Platform,
        sign_in: S,
        request: R,
    ) -> Result<T, HarvestError>
    where
        S: Fn() -> SFut,
        SFut: Future<Output = Result<String, HarvestError>>,
        R: Fn(String) -> RFut,
        RFut: Future<Output = Result<T, HarvestError>>,
    {
        let token = self.get_or_sign_in(&sign_in).await?;
        match request(token.clone()).await {
            Err(HarvestError::Auth { reason, .. }) => {
                tracing::info!(%platform, %reason, "token rejected; signing in again");
                self.discard(&token).await;
                let token = self.get_or_sign_in(&sign_in).await?;
                request(token).await
            }
            other => other,
        }
    }
}

fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

/// Map the response status onto [`HarvestError`] and decode a 2xx body.
async fn read_json<T: DeserializeOwned>(
    platform: Platform,
    response: Response,
    context: &str,
) -> Result<T, HarvestError> {
    let status = response.status();
    let url = response.url().to_string();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(HarvestError::RateLimited {
            platform,
            retry_after_secs,
        });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(HarvestError::Auth {
            platform,
            reason: format!("HTTP {} from {url}", status.as_u16()),
        });
    }

    if !status.is_success() {
        return Err(HarvestError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| HarvestError::from_send(e, &url))?;
    serde_json::from_str(&body).map_err(|e| HarvestError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
