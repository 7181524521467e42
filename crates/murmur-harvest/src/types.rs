//! Raw upstream response shapes.
//!
//! Every field the normalizer reads is optional here so that a sparse item
//! deserializes and is judged by the normalizer, not rejected as a whole page.

use serde::Deserialize;

// -- Reddit -----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RedditListing {
    pub data: RedditListingData,
}

#[derive(Debug, Deserialize)]
pub struct RedditListingData {
    #[serde(default)]
    pub children: Vec<RedditChild>,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedditChild {
    pub data: RedditPost,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditPost {
    pub id: Option<String>,
    /// Fullname, `t3_<id>`.
    pub name: Option<String>,
    pub created_utc: Option<f64>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub over_18: Option<bool>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub link_flair_text: Option<String>,
    pub permalink: Option<String>,
    pub author: Option<String>,
    pub author_fullname: Option<String>,
    /// Filled from `/user/{author}/about` after the listing is fetched.
    #[serde(skip)]
    pub author_details: Option<RedditAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct RedditAbout {
    pub data: RedditAuthor,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditAuthor {
    pub link_karma: Option<i64>,
    pub comment_karma: Option<i64>,
    pub created_utc: Option<f64>,
}

// -- Mastodon ---------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MastodonStatus {
    pub id: Option<String>,
    pub created_at: Option<String>,
    /// HTML body.
    pub content: Option<String>,
    pub sensitive: Option<bool>,
    pub favourites_count: Option<i64>,
    pub replies_count: Option<i64>,
    #[serde(default)]
    pub tags: Vec<MastodonTag>,
    pub url: Option<String>,
    pub uri: Option<String>,
    pub account: Option<MastodonAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MastodonTag {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MastodonAccount {
    pub id: Option<String>,
    pub username: Option<String>,
    pub created_at: Option<String>,
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
}

// -- Bluesky ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueskySession {
    pub access_jwt: String,
}

#[derive(Debug, Deserialize)]
pub struct BlueskySearchResponse {
    #[serde(default)]
    pub posts: Vec<BlueskyPost>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueskyPost {
    /// `at://<did>/app.bsky.feed.post/<rkey>`
    pub uri: Option<String>,
    pub author: Option<BlueskyAuthor>,
    pub record: Option<BlueskyRecord>,
    pub like_count: Option<i64>,
    pub reply_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueskyAuthor {
    pub did: Option<String>,
    pub handle: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueskyRecord {
    pub text: Option<String>,
    pub created_at: Option<String>,
}
