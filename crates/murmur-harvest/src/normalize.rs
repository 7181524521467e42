//! Maps raw upstream items onto the canonical [`Envelope`].
//!
//! Only a missing `id` or an underivable `createdAt` is fatal for an item.
//! Every other field falls back to a default: counts to zero, a missing
//! author to a sentinel account with null fields.

use chrono::{DateTime, Utc};
use murmur_core::envelope::UNKNOWN_USERNAME;
use murmur_core::{parse_timestamp, strip_html, Account, Envelope, Platform, Post};

use crate::error::HarvestError;
use crate::types::{BlueskyPost, MastodonStatus, RedditPost};

/// Per-page context folded into every envelope.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// The tag, subreddit, or search term the item was found under. `None`
    /// for feeds read without one, such as a public timeline.
    pub tag: Option<&'a str>,
    pub fetched_at: DateTime<Utc>,
}

/// A raw upstream item the harvest cycle can order and normalize.
pub trait Normalize {
    /// Creation time, if derivable. Used for the historical-boundary check.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// # Errors
    ///
    /// Returns [`HarvestError::MalformedSource`] when the item has no usable
    /// `id` or `createdAt`.
    fn normalize(&self, ctx: &NormalizeContext<'_>) -> Result<Envelope, HarvestError>;
}

impl Normalize for RedditPost {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_utc.and_then(unix_seconds)
    }

    fn normalize(&self, ctx: &NormalizeContext<'_>) -> Result<Envelope, HarvestError> {
        let platform = Platform::Reddit;
        let id = required_id(platform, self.id.as_deref())?;
        let created_at = self
            .created_at()
            .ok_or_else(|| HarvestError::malformed(platform, format!("post {id} has no created_utc")))?;

        let title = self.title.as_deref().unwrap_or_default().trim();
        let body = self.selftext.as_deref().unwrap_or_default().trim();
        let content = match (title.is_empty(), body.is_empty()) {
            (_, true) => title.to_owned(),
            (true, false) => body.to_owned(),
            (false, false) => format!("{title}\n\n{body}"),
        };

        let mut tags = Vec::new();
        if let Some(flair) = self.link_flair_text.as_deref() {
            tags.push(flair.to_owned());
        }
        tags.extend(ctx.tag.map(str::to_owned));

        let url = match self.permalink.as_deref() {
            Some(permalink) if !permalink.is_empty() => format!("https://www.reddit.com{permalink}"),
            _ => format!("https://www.reddit.com/comments/{id}"),
        };

        let account = match self.author.as_deref() {
            None | Some("" | "[deleted]") => Account::deleted(),
            Some(author) => {
                let details = self.author_details.as_ref();
                Account {
                    id: self.author_fullname.clone(),
                    username: author.to_owned(),
                    created_at: details.and_then(|d| d.created_utc).and_then(unix_seconds),
                    followers_or_link_karma: details.and_then(|d| d.link_karma).map(clamp_karma),
                    following_or_comment_karma: details
                        .and_then(|d| d.comment_karma)
                        .map(clamp_karma),
                }
            }
        };

        let post = Post {
            id,
            created_at,
            content,
            sensitive: self.over_18.unwrap_or(false),
            favourites_count: non_negative(self.score),
            replies_count: non_negative(self.num_comments),
            tags: normalize_tags(tags),
            url,
            account,
        };
        Ok(Envelope::new(platform, post, ctx.fetched_at))
    }
}

impl Normalize for MastodonStatus {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    fn normalize(&self, ctx: &NormalizeContext<'_>) -> Result<Envelope, HarvestError> {
        let platform = Platform::Mastodon;
        let id = required_id(platform, self.id.as_deref())?;
        let created_at = self.created_at().ok_or_else(|| {
            HarvestError::malformed(platform, format!("status {id} has no parsable created_at"))
        })?;

        let mut tags: Vec<String> = self.tags.iter().map(|t| t.name.clone()).collect();
        tags.extend(ctx.tag.map(str::to_owned));

        let url = self
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| self.uri.clone())
            .unwrap_or_default();

        let account = match &self.account {
            None => Account::unknown(),
            Some(acct) => Account {
                id: acct.id.clone(),
                username: acct
                    .username
                    .clone()
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned()),
                created_at: acct.created_at.as_deref().and_then(parse_timestamp),
                followers_or_link_karma: acct.followers_count.and_then(|n| u64::try_from(n).ok()),
                following_or_comment_karma: acct.following_count.and_then(|n| u64::try_from(n).ok()),
            },
        };

        let post = Post {
            id,
            created_at,
            content: strip_html(self.content.as_deref().unwrap_or_default()),
            sensitive: self.sensitive.unwrap_or(false),
            favourites_count: non_negative(self.favourites_count),
            replies_count: non_negative(self.replies_count),
            tags: normalize_tags(tags),
            url,
            account,
        };
        Ok(Envelope::new(platform, post, ctx.fetched_at))
    }
}

impl Normalize for BlueskyPost {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.record
            .as_ref()
            .and_then(|r| r.created_at.as_deref())
            .and_then(parse_timestamp)
    }

    fn normalize(&self, ctx: &NormalizeContext<'_>) -> Result<Envelope, HarvestError> {
        let platform = Platform::Bluesky;
        let uri = self
            .uri
            .as_deref()
            .ok_or_else(|| HarvestError::malformed(platform, "post has no uri"))?;
        let id = required_id(platform, uri.rsplit('/').next())?;
        let created_at = self.created_at().ok_or_else(|| {
            HarvestError::malformed(platform, format!("post {id} has no parsable record.createdAt"))
        })?;

        let handle = self
            .author
            .as_ref()
            .and_then(|a| a.handle.as_deref().or(a.did.as_deref()))
            .or_else(|| at_uri_authority(uri))
            .unwrap_or_default();
        let url = format!("https://bsky.app/profile/{handle}/post/{id}");

        let account = match &self.author {
            None => Account::unknown(),
            Some(author) => Account {
                id: author.did.clone(),
                username: author
                    .handle
                    .clone()
                    .filter(|h| !h.is_empty())
                    .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned()),
                created_at: author.created_at.as_deref().and_then(parse_timestamp),
                followers_or_link_karma: None,
                following_or_comment_karma: None,
            },
        };

        let content = self
            .record
            .as_ref()
            .and_then(|r| r.text.as_deref())
            .unwrap_or_default()
            .trim()
            .to_owned();

        let post = Post {
            id,
            created_at,
            content,
            sensitive: false,
            favourites_count: non_negative(self.like_count),
            replies_count: non_negative(self.reply_count),
            tags: normalize_tags(ctx.tag.map(str::to_owned).into_iter().collect()),
            url,
            account,
        };
        Ok(Envelope::new(platform, post, ctx.fetched_at))
    }
}

fn required_id(platform: Platform, id: Option<&str>) -> Result<String, HarvestError> {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_owned()),
        _ => Err(HarvestError::malformed(platform, "item has no id")),
    }
}

fn non_negative(n: Option<i64>) -> u64 {
    n.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

/// Comment karma can go negative.
fn clamp_karma(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let secs = secs as i64;
    DateTime::from_timestamp(secs, 0)
}

/// `at://did:plc:abc/app.bsky.feed.post/xyz` -> `did:plc:abc`
fn at_uri_authority(uri: &str) -> Option<&str> {
    uri.strip_prefix("at://")
        .and_then(|rest| rest.split('/').next())
        .filter(|s| !s.is_empty())
}

/// Lower-case, trim, drop blanks, and de-duplicate while keeping first-seen order.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
