//! Feeds read from their newest end, outside the per-tag history walk.

use std::str::FromStr;

use crate::{CoreError, Platform};

/// Which rotation list a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// Tags walked backwards page by page until retired.
    History,
    /// Subreddits polled for their newest posts forever.
    Hot,
}

impl Rotation {
    /// Value stored in `harvest_tags.rotation`.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Rotation::History => "history",
            Rotation::Hot => "hot",
        }
    }
}

/// A feed fetched without a cursor. Nothing older than the newest page is
/// ever requested, and no tag is ever retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotFeed {
    /// Newest posts of the subreddit at the front of the hot rotation.
    RedditHot,
    /// The Mastodon instance's public timeline.
    MastodonPublic,
}

impl SnapshotFeed {
    pub const ALL: [SnapshotFeed; 2] = [SnapshotFeed::RedditHot, SnapshotFeed::MastodonPublic];

    #[must_use]
    pub fn platform(self) -> Platform {
        match self {
            SnapshotFeed::RedditHot => Platform::Reddit,
            SnapshotFeed::MastodonPublic => Platform::Mastodon,
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            SnapshotFeed::RedditHot => "reddit-hot",
            SnapshotFeed::MastodonPublic => "mastodon-public",
        }
    }

    /// The list a feed takes its target from, if it has one.
    #[must_use]
    pub fn rotation(self) -> Option<Rotation> {
        match self {
            SnapshotFeed::RedditHot => Some(Rotation::Hot),
            SnapshotFeed::MastodonPublic => None,
        }
    }
}

impl std::fmt::Display for SnapshotFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SnapshotFeed {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit-hot" => Ok(SnapshotFeed::RedditHot),
            "mastodon-public" => Ok(SnapshotFeed::MastodonPublic),
            other => Err(CoreError::UnknownFeed(other.to_string())),
        }
    }
}
