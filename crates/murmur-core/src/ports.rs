//! Collaborator traits for the shared mutable state of the pipeline.
//!
//! Implementations live in `murmur-db` (Postgres) and `murmur-harvest`
//! (in-memory, for tests and dry runs). Every implementation assumes a single
//! writer per `(platform, tag)`; none of them take a lock or lease.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::{Cursor, Platform};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Last-seen pagination marker per `(platform, tag)`. Last write wins.
pub trait CursorStore: Send + Sync {
    fn get(
        &self,
        platform: Platform,
        tag: &str,
    ) -> impl Future<Output = Result<Option<Cursor>, StoreError>> + Send;

    fn set(
        &self,
        platform: Platform,
        tag: &str,
        cursor: &Cursor,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn clear(&self, platform: Platform, tag: &str)
        -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Ordered work-list of tags per platform.
pub trait TagQueue: Send + Sync {
    /// The tag at the front, left in place.
    fn peek_front(
        &self,
        platform: Platform,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Move `tag` to the back of the rotation.
    fn requeue(
        &self,
        platform: Platform,
        tag: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove `tag` permanently. Returns `false` if it was already gone.
    fn retire(
        &self,
        platform: Platform,
        tag: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Append `tag` unless it is already queued. Returns `true` if it was added.
    fn push_back(
        &self,
        platform: Platform,
        tag: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Queued tags, front first.
    fn list(
        &self,
        platform: Platform,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// Topic carrying enriched envelopes to the indexer. Platform topics are the
/// platform slugs.
pub const ELASTIC_TOPIC: &str = "elastic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopOrder {
    #[default]
    Fifo,
    Lifo,
}

/// Byte queue keyed by topic.
pub trait MessageQueue: Send + Sync {
    fn push(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn pop(
        &self,
        topic: &str,
        order: PopOrder,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;
}
