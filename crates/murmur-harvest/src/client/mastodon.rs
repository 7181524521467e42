//! Mastodon hashtag timeline walked backwards with `max_id`, and the public
//! timeline read from its newest end.

use murmur_core::{Cursor, MastodonCredentials, Platform, SnapshotFeed};
use reqwest::{Client, Url};

use super::{build_http, encode_segment, join, parse_base_url, read_json, HttpSettings};
use crate::error::HarvestError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::source::{Page, PageSource, RotationPolicy, SnapshotSource, BATCH_LIMIT};
use crate::types::MastodonStatus;

pub struct MastodonClient {
    http: Client,
    base: Url,
    access_token: String,
    retry: RetryPolicy,
}

impl MastodonClient {
    /// # Errors
    ///
    /// Returns [`HarvestError::InvalidBaseUrl`] if the instance URL is not
    /// parsable, or [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn new(
        credentials: &MastodonCredentials,
        settings: &HttpSettings,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            http: build_http(settings)?,
            base: parse_base_url(&credentials.api_base_url)?,
            access_token: credentials.access_token.clone(),
            retry: settings.retry,
        })
    }

    #[must_use]
    pub fn public_timeline(&self) -> MastodonPublicSource<'_> {
        MastodonPublicSource { client: self }
    }

    /// Fetch statuses tagged `hashtag`, including remote ones, at or below `max_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on transport failure, a non-2xx status after
    /// retries, or an undecodable body.
    pub async fn tag_timeline(
        &self,
        hashtag: &str,
        max_id: Option<&str>,
    ) -> Result<Vec<MastodonStatus>, HarvestError> {
        let mut url = join(
            &self.base,
            &format!("api/v1/timelines/tag/{}", encode_segment(hashtag)),
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &BATCH_LIMIT.to_string());
            query.append_pair("remote", "true");
            if let Some(max_id) = max_id {
                query.append_pair("max_id", max_id);
            }
        }

        self.get_statuses(&url, &format!("tag timeline for #{hashtag}"))
            .await
    }

    /// The newest statuses on the instance's public timeline.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on transport failure, a non-2xx status after
    /// retries, or an undecodable body.
    pub async fn public_statuses(&self) -> Result<Vec<MastodonStatus>, HarvestError> {
        let mut url = join(&self.base, "api/v1/timelines/public")?;
        url.query_pairs_mut()
            .append_pair("limit", &BATCH_LIMIT.to_string());
        self.get_statuses(&url, "public timeline").await
    }

    async fn get_statuses(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<Vec<MastodonStatus>, HarvestError> {
        retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let response = self
                    .http
                    .get(url.clone())
                    .bearer_auth(&self.access_token)
                    .send()
                    .await
                    .map_err(|e| HarvestError::from_send(e, url.as_str()))?;
                read_json(Platform::Mastodon, response, context).await
            }
        })
        .await
    }
}

impl PageSource for MastodonClient {
    type Item = MastodonStatus;

    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::PinFront
    }

    async fn fetch_page(
        &self,
        tag: &str,
        cursor: Option<&Cursor>,
    ) -> Result<Page<MastodonStatus>, HarvestError> {
        let items = self.tag_timeline(tag, cursor.map(Cursor::as_str)).await?;
        let next_cursor = next_max_id(&items);
        Ok(Page { items, next_cursor })
    }
}

/// Every status on the public timeline, newest first, with no tag.
pub struct MastodonPublicSource<'a> {
    client: &'a MastodonClient,
}

impl SnapshotSource for MastodonPublicSource<'_> {
    type Item = MastodonStatus;

    fn feed(&self) -> SnapshotFeed {
        SnapshotFeed::MastodonPublic
    }

    async fn fetch_latest(
        &self,
        _target: Option<&str>,
    ) -> Result<Vec<MastodonStatus>, HarvestError> {
        self.client.public_statuses().await
    }
}

/// One below the smallest numeric status ID in the page.
#[must_use]
pub fn next_max_id(items: &[MastodonStatus]) -> Option<Cursor> {
    items
        .iter()
        .filter_map(|s| s.id.as_deref()?.parse::<u128>().ok())
        .min()
        .and_then(|min| min.checked_sub(1))
        .map(|id| Cursor::new(id.to_string()))
}
