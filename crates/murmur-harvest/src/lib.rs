//! Harvesting: platform clients, normalization, the per-tag cycle, and
//! cursorless snapshot feeds.

pub mod client;
pub mod cycle;
pub mod error;
pub mod harvester;
pub mod memory;
pub mod normalize;
pub mod retry;
pub mod snapshot;
pub mod source;
pub mod types;

pub use client::{
    BlueskyClient, HttpSettings, MastodonClient, MastodonPublicSource, RedditClient,
    RedditHotSource,
};
pub use cycle::{CycleOutcome, CycleReport, CycleSettings, HarvestCycle, RetireReason};
pub use error::HarvestError;
pub use harvester::Harvester;
pub use memory::{MemoryCursorStore, MemoryQueue, MemoryTagQueue};
pub use normalize::{normalize_tags, Normalize, NormalizeContext};
pub use retry::RetryPolicy;
pub use snapshot::SnapshotCycle;
pub use source::{Page, PageSource, RotationPolicy, SnapshotSource, BATCH_LIMIT};
