//! Bluesky `searchPosts`, newest first, continued with the API's own cursor.

use murmur_core::{BlueskyCredentials, Cursor, Platform};
use reqwest::{Client, Url};
use serde_json::json;

use super::{build_http, join, parse_base_url, read_json, HttpSettings, TokenCache};
use crate::error::HarvestError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::source::{Page, PageSource, RotationPolicy, BATCH_LIMIT};
use crate::types::{BlueskyPost, BlueskySearchResponse, BlueskySession};

const DEFAULT_BASE_URL: &str = "https://bsky.social/";

pub struct BlueskyClient {
    http: Client,
    base: Url,
    credentials: BlueskyCredentials,
    retry: RetryPolicy,
    access_jwt: TokenCache,
}

impl BlueskyClient {
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn new(
        credentials: &BlueskyCredentials,
        settings: &HttpSettings,
    ) -> Result<Self, HarvestError> {
        Self::with_base_url(credentials, settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`HarvestError::InvalidBaseUrl`] for an unparsable URL, or
    /// [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        credentials: &BlueskyCredentials,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            http: build_http(settings)?,
            base: parse_base_url(base_url)?,
            credentials: credentials.clone(),
            retry: settings.retry,
            access_jwt: TokenCache::default(),
        })
    }

    async fn create_session(&self) -> Result<String, HarvestError> {
        let url = join(&self.base, "xrpc/com.atproto.server.createSession")?;
        let body = json!({
            "identifier": self.credentials.username,
            "password": self.credentials.app_password,
        });
        let session: BlueskySession = retry_with_backoff(self.retry, || {
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = self
                    .http
                    .post(url.clone())
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| HarvestError::from_send(e, url.as_str()))?;
                read_json(Platform::Bluesky, response, "bluesky session").await
            }
        })
        .await?;
        tracing::debug!(handle = %self.credentials.username, "created bluesky session");
        Ok(session.access_jwt)
    }

    /// Search recent posts matching `query`. An expired session is replaced
    /// once per call.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on transport failure, a non-2xx status after
    /// retries, or an undecodable body.
    pub async fn search_posts(
        &self,
        query: &str,
        cursor: Option<&str>,
    ) -> Result<BlueskySearchResponse, HarvestError> {
        let mut url = join(&self.base, "xrpc/app.bsky.feed.searchPosts")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("sort", "latest");
            pairs.append_pair("limit", &BATCH_LIMIT.to_string());
            if let Some(cursor) = cursor {
                pairs.append_pair("cursor", cursor);
            }
        }

        let context = format!("search results for {query:?}");
        let (url, context) = (&url, context.as_str());

        self.access_jwt
            .authorized(
                Platform::Bluesky,
                || self.create_session(),
                move |jwt| {
                    retry_with_backoff(self.retry, move || {
                        let url = url.clone();
                        let jwt = jwt.clone();
                        async move {
                            let response = self
                                .http
                                .get(url.clone())
                                .bearer_auth(jwt)
                                .send()
                                .await
                                .map_err(|e| HarvestError::from_send(e, url.as_str()))?;
                            read_json(Platform::Bluesky, response, context).await
                        }
                    })
                },
            )
            .await
    }
}

impl PageSource for BlueskyClient {
    type Item = BlueskyPost;

    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::Requeue
    }

    async fn fetch_page(
        &self,
        tag: &str,
        cursor: Option<&Cursor>,
    ) -> Result<Page<BlueskyPost>, HarvestError> {
        let response = self.search_posts(tag, cursor.map(Cursor::as_str)).await?;
        let next_cursor = response
            .cursor
            .filter(|c| !c.is_empty())
            .map(Cursor::new);
        Ok(Page {
            items: response.posts,
            next_cursor,
        })
    }
}
