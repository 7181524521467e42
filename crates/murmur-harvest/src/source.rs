//! The page-fetch contract between the harvest cycle and an upstream API.

use std::future::Future;

use murmur_core::{Cursor, Platform, SnapshotFeed};

use crate::error::HarvestError;
use crate::normalize::Normalize;

/// Fixed page size requested from every platform.
pub const BATCH_LIMIT: u32 = 40;

/// How a tag moves through the rotation after a successful page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Leave the tag at the front until its history is exhausted.
    PinFront,
    /// Move the tag to the back so every tag advances one page per round.
    Requeue,
}

/// One page of upstream items, newest first.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor that fetches the next older page. `None` on a non-empty page
    /// means the upstream has nothing older.
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

pub trait PageSource: Send + Sync {
    type Item: Normalize + Send + Sync;

    fn platform(&self) -> Platform;

    fn rotation_policy(&self) -> RotationPolicy;

    /// Fetch the page at `cursor`, or the newest page when `cursor` is `None`.
    fn fetch_page(
        &self,
        tag: &str,
        cursor: Option<&Cursor>,
    ) -> impl Future<Output = Result<Page<Self::Item>, HarvestError>> + Send;
}

/// A feed read from its newest end on every fetch.
pub trait SnapshotSource: Send + Sync {
    type Item: Normalize + Send + Sync;

    fn feed(&self) -> SnapshotFeed;

    /// Fetch the newest items. `target` is the front of the feed's rotation,
    /// or `None` for a feed without one.
    fn fetch_latest(
        &self,
        target: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Self::Item>, HarvestError>> + Send;
}
