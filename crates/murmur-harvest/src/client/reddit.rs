//! Reddit `/r/{subreddit}/new` listing walked backwards with `after`, plus a
//! cursorless view of the same listing for the hot-subreddit rotation.

use std::collections::HashMap;

use murmur_core::{Cursor, Platform, RedditCredentials, SnapshotFeed};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use super::{
    build_http, encode_segment, join, parse_base_url, read_json, HttpSettings, TokenCache,
};
use crate::error::HarvestError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::source::{Page, PageSource, RotationPolicy, SnapshotSource, BATCH_LIMIT};
use crate::types::{RedditAbout, RedditAuthor, RedditListing, RedditPost, RedditToken};

const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/";
const DEFAULT_API_URL: &str = "https://oauth.reddit.com/";

/// Reddit client authenticated with the application-only OAuth grant.
pub struct RedditClient {
    http: Client,
    auth_base: Url,
    api_base: Url,
    credentials: RedditCredentials,
    retry: RetryPolicy,
    token: TokenCache,
}

impl RedditClient {
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn new(
        credentials: &RedditCredentials,
        settings: &HttpSettings,
    ) -> Result<Self, HarvestError> {
        Self::with_base_urls(credentials, settings, DEFAULT_AUTH_URL, DEFAULT_API_URL)
    }

    /// Point the token exchange and listing requests at custom hosts (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::InvalidBaseUrl`] for an unparsable URL, or
    /// [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn with_base_urls(
        credentials: &RedditCredentials,
        settings: &HttpSettings,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            http: build_http(settings)?,
            auth_base: parse_base_url(auth_base)?,
            api_base: parse_base_url(api_base)?,
            credentials: credentials.clone(),
            retry: settings.retry,
            token: TokenCache::default(),
        })
    }

    /// The hot-subreddit feed: newest posts only, sharing this client's token.
    #[must_use]
    pub fn hot(&self) -> RedditHotSource<'_> {
        RedditHotSource { client: self }
    }

    async fn fetch_token(&self) -> Result<String, HarvestError> {
        let url = join(&self.auth_base, "api/v1/access_token")?;
        let token: RedditToken = retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let response = self
                    .http
                    .post(url.clone())
                    .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
                    .basic_auth(
                        &self.credentials.client_id,
                        Some(&self.credentials.client_secret),
                    )
                    .form(&[("grant_type", "client_credentials")])
                    .send()
                    .await
                    .map_err(|e| HarvestError::from_send(e, url.as_str()))?;
                read_json(Platform::Reddit, response, "reddit access token").await
            }
        })
        .await?;
        tracing::debug!("obtained reddit access token");
        Ok(token.access_token)
    }

    /// Authenticated GET with retries, signing in again once if the token is
    /// rejected.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, HarvestError> {
        self.token
            .authorized(
                Platform::Reddit,
                || self.fetch_token(),
                move |token| {
                    retry_with_backoff(self.retry, move || {
                        let url = url.clone();
                        let token = token.clone();
                        async move {
                            let response = self
                                .http
                                .get(url.clone())
                                .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
                                .bearer_auth(token)
                                .send()
                                .await
                                .map_err(|e| HarvestError::from_send(e, url.as_str()))?;
                            read_json(Platform::Reddit, response, context).await
                        }
                    })
                },
            )
            .await
    }

    /// Fetch one page of the newest posts in `subreddit`, older than `after`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on transport failure, a non-2xx status after
    /// retries, or an undecodable body.
    pub async fn fetch_new(
        &self,
        subreddit: &str,
        after: Option<&str>,
    ) -> Result<RedditListing, HarvestError> {
        let mut url = join(
            &self.api_base,
            &format!("r/{}/new", encode_segment(subreddit)),
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &BATCH_LIMIT.to_string());
            query.append_pair("raw_json", "1");
            if let Some(after) = after {
                query.append_pair("after", after);
            }
        }

        self.get_json(&url, &format!("listing for r/{subreddit}"))
            .await
    }

    /// Karma and account age for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on transport failure, a non-2xx status after
    /// retries, or an undecodable body.
    pub async fn fetch_author(&self, username: &str) -> Result<RedditAuthor, HarvestError> {
        let url = join(
            &self.api_base,
            &format!("user/{}/about", encode_segment(username)),
        )?;
        let about: RedditAbout = self.get_json(&url, &format!("profile of u/{username}")).await?;
        Ok(about.data)
    }

    /// Listing posts with author details attached where the lookup succeeds.
    async fn fetch_posts(
        &self,
        subreddit: &str,
        after: Option<&str>,
    ) -> Result<Vec<RedditPost>, HarvestError> {
        let listing = self.fetch_new(subreddit, after).await?;
        let mut items: Vec<RedditPost> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect();
        self.attach_authors(&mut items).await;
        Ok(items)
    }

    /// One profile lookup per distinct author. A failed lookup leaves that
    /// author's karma and account age unset.
    async fn attach_authors(&self, items: &mut [RedditPost]) {
        let mut authors: HashMap<String, Option<RedditAuthor>> = HashMap::new();
        for post in items.iter_mut() {
            let Some(name) = post.author.as_deref().filter(|name| is_live_author(name)) else {
                continue;
            };
            if !authors.contains_key(name) {
                let details = match self.fetch_author(name).await {
                    Ok(details) => Some(details),
                    Err(e) => {
                        tracing::debug!(author = name, error = %e, "author lookup failed");
                        None
                    }
                };
                authors.insert(name.to_owned(), details);
            }
            post.author_details = authors.get(name).cloned().flatten();
        }
    }
}

fn is_live_author(name: &str) -> bool {
    !name.is_empty() && name != "[deleted]"
}

impl PageSource for RedditClient {
    type Item = RedditPost;

    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::PinFront
    }

    async fn fetch_page(
        &self,
        tag: &str,
        cursor: Option<&Cursor>,
    ) -> Result<Page<RedditPost>, HarvestError> {
        let items = self.fetch_posts(tag, cursor.map(Cursor::as_str)).await?;
        let next_cursor = oldest_fullname(&items);
        Ok(Page { items, next_cursor })
    }
}

/// Newest posts of the subreddit at the front of the hot rotation.
pub struct RedditHotSource<'a> {
    client: &'a RedditClient,
}

impl SnapshotSource for RedditHotSource<'_> {
    type Item = RedditPost;

    fn feed(&self) -> SnapshotFeed {
        SnapshotFeed::RedditHot
    }

    async fn fetch_latest(&self, target: Option<&str>) -> Result<Vec<RedditPost>, HarvestError> {
        let subreddit = target.ok_or_else(|| {
            HarvestError::malformed(Platform::Reddit, "hot feed needs a subreddit")
        })?;
        self.client.fetch_posts(subreddit, None).await
    }
}

/// Fullname of the oldest post in the page, compared by base-36 ID.
#[must_use]
pub fn oldest_fullname(items: &[RedditPost]) -> Option<Cursor> {
    items
        .iter()
        .filter_map(|post| {
            let id = post.id.as_deref()?;
            let position = u128::from_str_radix(id, 36).ok()?;
            Some((position, id))
        })
        .min_by_key(|(position, _)| *position)
        .map(|(_, id)| Cursor::new(format!("t3_{id}")))
}
