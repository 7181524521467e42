//! The canonical envelope every harvester produces.
//!
//! Field names on the wire follow the JSON shape consumed by the search index
//! (`fetchedAt`, `sentimentLabel`, `data.favouritesCount`, ...). Timestamps are
//! always serialized as RFC 3339 UTC with a trailing `Z`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Envelope schema version stamped on every record.
pub const SCHEMA_VERSION: f64 = 1.1;

/// Username used when the upstream author was deleted.
pub const DELETED_USERNAME: &str = "[Deleted]";

/// Username used when the upstream item carries no author at all.
pub const UNKNOWN_USERNAME: &str = "[Unknown]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Reddit,
    Mastodon,
    Bluesky,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Reddit, Platform::Mastodon, Platform::Bluesky];

    /// Display name as it appears in the envelope `platform` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reddit => "Reddit",
            Platform::Mastodon => "Mastodon",
            Platform::Bluesky => "Bluesky",
        }
    }

    /// Lowercase form used for store keys, queue topics and document IDs.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Mastodon => "mastodon",
            Platform::Bluesky => "bluesky",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(Platform::Reddit),
            "mastodon" => Ok(Platform::Mastodon),
            "bluesky" => Ok(Platform::Bluesky),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Scores at or above this value are positive; at or below its negation, negative.
    pub const THRESHOLD: f64 = 0.05;

    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= Self::THRESHOLD {
            SentimentLabel::Positive
        } else if score <= -Self::THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

/// A normalized post or comment wrapped with pipeline metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub platform: Platform,
    pub version: f64,
    #[serde(with = "iso8601")]
    pub fetched_at: DateTime<Utc>,
    /// Compound sentiment in `[-1.0, 1.0]`. `None` until enrichment.
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub sentiment_label: Option<SentimentLabel>,
    /// Lowercase keywords, most relevant first. Empty until enrichment.
    #[serde(default)]
    pub keywords: Vec<String>,
    pub data: Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Platform-local identifier, unique within the platform.
    pub id: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub sensitive: bool,
    pub favourites_count: u64,
    pub replies_count: u64,
    pub tags: Vec<String>,
    pub url: String,
    pub account: Account,
}

/// Author details. The two counters are platform-dependent: followers and
/// following on Mastodon, link and comment karma on Reddit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Option<String>,
    pub username: String,
    #[serde(with = "iso8601::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "followersCount/linkKarma")]
    pub followers_or_link_karma: Option<u64>,
    #[serde(rename = "followingCount/commentKarma")]
    pub following_or_comment_karma: Option<u64>,
}

impl Account {
    /// Sentinel account for posts whose author was deleted upstream.
    #[must_use]
    pub fn deleted() -> Self {
        Self::sentinel(DELETED_USERNAME)
    }

    /// Sentinel account for posts that carry no author information.
    #[must_use]
    pub fn unknown() -> Self {
        Self::sentinel(UNKNOWN_USERNAME)
    }

    fn sentinel(username: &str) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            created_at: None,
            followers_or_link_karma: None,
            following_or_comment_karma: None,
        }
    }
}

impl Envelope {
    /// Wrap normalized post data in a fresh, unenriched envelope.
    #[must_use]
    pub fn new(platform: Platform, data: Post, fetched_at: DateTime<Utc>) -> Self {
        Self {
            platform,
            version: SCHEMA_VERSION,
            fetched_at,
            sentiment: None,
            sentiment_label: None,
            keywords: Vec::new(),
            data,
        }
    }

    /// Index document ID: lowercase platform, underscore, post ID.
    #[must_use]
    pub fn document_id(&self) -> String {
        document_id(self.platform, &self.data.id)
    }

    /// Record enrichment output. The label is derived from `score`.
    pub fn apply_enrichment(&mut self, score: f64, keywords: Vec<String>) {
        self.sentiment = Some(score);
        self.sentiment_label = Some(SentimentLabel::from_score(score));
        self.keywords = keywords;
    }
}

#[must_use]
pub fn document_id(platform: Platform, post_id: &str) -> String {
    format!("{}_{post_id}", platform.slug())
}

/// Parse an ISO-8601 timestamp. Strings without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way the envelope stores it.
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{format_timestamp, parse_timestamp};

    pub(crate) fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(dt))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
    }

    pub(crate) mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        use super::super::{format_timestamp, parse_timestamp};

        #[allow(clippy::ref_option)]
        pub(crate) fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_str(&format_timestamp(dt)),
                None => s.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            match raw {
                None => Ok(None),
                Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
                    de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}"))
                }),
            }
        }
    }
}
