//! Pagination cursors and their per-platform ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::Platform;

/// Opaque pagination marker. Its meaning depends on the platform:
///
/// - Reddit: fullname (`t3_<base36>`) of the oldest post already seen.
/// - Mastodon: numeric status ID; the next page holds statuses at or below it.
/// - Bluesky: the search API's own continuation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Compare how far back in the feed two cursors point.
    ///
    /// `Ordering::Less` means `self` points at older content than `other`.
    /// Returns `None` when the platform's cursors carry no comparable position
    /// (Bluesky) or either value cannot be decoded.
    #[must_use]
    pub fn compare_age(&self, other: &Cursor, platform: Platform) -> Option<Ordering> {
        let a = position(platform, &self.0)?;
        let b = position(platform, &other.0)?;
        Some(a.cmp(&b))
    }

    /// True when `self` would fetch content strictly newer than `committed`.
    #[must_use]
    pub fn is_newer_than(&self, committed: &Cursor, platform: Platform) -> bool {
        matches!(self.compare_age(committed, platform), Some(Ordering::Greater))
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Store key for a tag's cursor.
#[must_use]
pub fn cursor_key(platform: Platform, tag: &str) -> String {
    match platform {
        Platform::Reddit | Platform::Mastodon => format!("{}:max_id:{tag}", platform.slug()),
        Platform::Bluesky => format!("{}:last_cursor:{tag}", platform.slug()),
    }
}

fn position(platform: Platform, raw: &str) -> Option<u128> {
    match platform {
        Platform::Reddit => {
            let body = raw.split_once('_').map_or(raw, |(_, rest)| rest);
            u128::from_str_radix(body, 36).ok()
        }
        Platform::Mastodon => raw.parse::<u128>().ok(),
        Platform::Bluesky => None,
    }
}
