//! One harvest invocation: select a tag, fetch one page, emit, advance.
//!
//! ```text
//! SELECT_TAG ──(queue empty)──────────────────────────────▶ Idle
//!     │
//! FETCH_PAGE ──(error)── no state touched ────────────────▶ Err
//!     │
//!     ├──(zero items)── retire, clear cursor ─────────────▶ Retired
//!     │
//!     └──(items)── emit each ── commit cursor ── retire at
//!                  boundary or rotate per policy ─────────▶ Advanced
//! ```
//!
//! The cursor is committed before any retirement so an interrupted
//! retirement resumes on the boundary page rather than from the top of the
//! feed. A page whose cursor would point at newer content than the committed
//! one is neither emitted nor committed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use murmur_core::{
    AppConfig, Cursor, CursorStore, MessageQueue, Platform, SnapshotFeed, Stage, TagQueue,
};

use crate::error::HarvestError;
use crate::normalize::{Normalize, NormalizeContext};
use crate::source::{PageSource, RotationPolicy};

#[derive(Debug, Clone, Copy)]
pub struct CycleSettings {
    /// Tags whose pages reach content older than this are retired.
    pub historical_boundary: DateTime<Utc>,
    /// Upper bound on each queue push.
    pub emit_timeout: Duration,
}

impl CycleSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            historical_boundary: config.historical_boundary,
            emit_timeout: Duration::from_secs(config.emit_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    /// The upstream returned no items for the stored cursor.
    EmptyPage,
    /// The page reached past the historical boundary.
    HistoricalBoundary,
    /// The upstream returned items but no way to fetch older ones.
    NoOlderPage,
}

impl std::fmt::Display for RetireReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetireReason::EmptyPage => write!(f, "empty page"),
            RetireReason::HistoricalBoundary => write!(f, "historical boundary reached"),
            RetireReason::NoOlderPage => write!(f, "no older page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No tag queued for the platform.
    Idle,
    /// Zero items; the tag was retired.
    Retired(RetireReason),
    /// A page was processed and its cursor committed.
    Advanced {
        cursor: Option<Cursor>,
        retired: Option<RetireReason>,
    },
    /// The page's cursor points at newer content than the committed one.
    CursorRegression { proposed: Cursor, committed: Cursor },
    /// A snapshot feed's newest page was emitted. Nothing is committed.
    Snapshot(SnapshotFeed),
}

impl CycleOutcome {
    /// Short label recorded with harvest runs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Idle => "idle",
            CycleOutcome::Retired(_) | CycleOutcome::Advanced { retired: Some(_), .. } => "retired",
            CycleOutcome::Advanced { .. } => "advanced",
            CycleOutcome::CursorRegression { .. } => "cursor_regression",
            CycleOutcome::Snapshot(_) => "snapshot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub platform: Platform,
    pub tag: Option<String>,
    pub outcome: CycleOutcome,
    pub fetched: usize,
    pub emitted: usize,
    /// Items rejected by the normalizer or the validation gate.
    pub dropped: usize,
    /// Items that passed validation but could not be pushed in time.
    pub emit_failures: usize,
}

impl CycleReport {
    pub(crate) fn new(platform: Platform, tag: Option<String>, outcome: CycleOutcome) -> Self {
        Self {
            platform,
            tag,
            outcome,
            fetched: 0,
            emitted: 0,
            dropped: 0,
            emit_failures: 0,
        }
    }
}

/// Drives a single cycle against explicit collaborators.
pub struct HarvestCycle<'a, S, C, T, Q> {
    source: &'a S,
    cursors: &'a C,
    tags: &'a T,
    queue: &'a Q,
    settings: CycleSettings,
    rotation: RotationPolicy,
}

impl<'a, S, C, T, Q> HarvestCycle<'a, S, C, T, Q>
where
    S: PageSource,
    C: CursorStore,
    T: TagQueue,
    Q: MessageQueue,
{
    /// Uses the source's own rotation policy; override with [`Self::with_rotation`].
    pub fn new(
        source: &'a S,
        cursors: &'a C,
        tags: &'a T,
        queue: &'a Q,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            cursors,
            tags,
            queue,
            settings,
            rotation: source.rotation_policy(),
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    /// Run one cycle.
    ///
    /// # Errors
    ///
    /// Returns the page-fetch error unchanged (nothing has been mutated at
    /// that point), or a store error from the cursor store or tag queue.
    pub async fn run(&self) -> Result<CycleReport, HarvestError> {
        let platform = self.source.platform();

        let Some(tag) = self.tags.peek_front(platform).await? else {
            tracing::debug!(%platform, "no tags queued");
            return Ok(CycleReport::new(platform, None, CycleOutcome::Idle));
        };

        let committed = self.cursors.get(platform, &tag).await?;
        tracing::debug!(
            %platform,
            tag = %tag,
            cursor = ?committed.as_ref().map(Cursor::as_str),
            "fetching page"
        );

        let page = match self.source.fetch_page(&tag, committed.as_ref()).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    %platform,
                    tag = %tag,
                    transient = e.is_transient(),
                    error = %e,
                    "page fetch failed; cursor and queue left unchanged"
                );
                return Err(e);
            }
        };

        if page.items.is_empty() {
            self.retire(platform, &tag, RetireReason::EmptyPage).await?;
            return Ok(CycleReport::new(
                platform,
                Some(tag),
                CycleOutcome::Retired(RetireReason::EmptyPage),
            ));
        }

        if let (Some(proposed), Some(committed)) = (&page.next_cursor, &committed) {
            if proposed.is_newer_than(committed, platform) {
                tracing::error!(
                    %platform,
                    tag = %tag,
                    proposed = %proposed,
                    committed = %committed,
                    "page would move cursor toward newer content; not emitting or committing"
                );
                let mut report = CycleReport::new(
                    platform,
                    Some(tag),
                    CycleOutcome::CursorRegression {
                        proposed: proposed.clone(),
                        committed: committed.clone(),
                    },
                );
                report.fetched = page.items.len();
                return Ok(report);
            }
        }

        let mut report = CycleReport::new(platform, Some(tag.clone()), CycleOutcome::Idle);
        report.fetched = page.items.len();

        let ctx = NormalizeContext {
            tag: Some(&tag),
            fetched_at: Utc::now(),
        };
        for item in &page.items {
            emit_item(self.queue, self.settings.emit_timeout, item, &ctx, &mut report).await;
        }

        if let Some(cursor) = &page.next_cursor {
            self.cursors.set(platform, &tag, cursor).await?;
            tracing::info!(%platform, tag = %tag, cursor = %cursor, "cursor committed");
        }

        let oldest = page.items.iter().filter_map(Normalize::created_at).min();
        let retired = if page.next_cursor.is_none() {
            Some(RetireReason::NoOlderPage)
        } else if oldest.is_some_and(|t| t < self.settings.historical_boundary) {
            Some(RetireReason::HistoricalBoundary)
        } else {
            None
        };

        match retired {
            Some(reason) => self.retire(platform, &tag, reason).await?,
            None if self.rotation == RotationPolicy::Requeue => {
                self.tags.requeue(platform, &tag).await?;
            }
            None => {}
        }

        report.outcome = CycleOutcome::Advanced {
            cursor: page.next_cursor,
            retired,
        };
        tracing::info!(
            %platform,
            tag = %tag,
            fetched = report.fetched,
            emitted = report.emitted,
            dropped = report.dropped,
            emit_failures = report.emit_failures,
            "harvest cycle complete"
        );
        Ok(report)
    }

    /// Remove the tag from rotation, then drop its cursor.
    async fn retire(
        &self,
        platform: Platform,
        tag: &str,
        reason: RetireReason,
    ) -> Result<(), HarvestError> {
        let removed = self.tags.retire(platform, tag).await?;
        self.cursors.clear(platform, tag).await?;
        tracing::info!(%platform, tag, removed, %reason, "tag retired");
        Ok(())
    }
}

/// Normalize, validate, and push one item onto its platform topic, counting
/// the result in `report`. Failures drop the item, never the page.
pub(crate) async fn emit_item<I, Q>(
    queue: &Q,
    emit_timeout: Duration,
    item: &I,
    ctx: &NormalizeContext<'_>,
    report: &mut CycleReport,
) where
    I: Normalize,
    Q: MessageQueue,
{
    let platform = report.platform;

    let envelope = match item.normalize(ctx) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(%platform, tag = ?ctx.tag, error = %e, "malformed item dropped");
            report.dropped += 1;
            return;
        }
    };

    let envelope = match envelope.validated(Stage::Harvested) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(%platform, tag = ?ctx.tag, error = %e, "envelope failed validation; dropped");
            report.dropped += 1;
            return;
        }
    };

    let payload = match serde_json::to_vec(&envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(%platform, id = %envelope.data.id, error = %e, "envelope serialization failed; dropped");
            report.dropped += 1;
            return;
        }
    };

    let topic = platform.slug();
    match tokio::time::timeout(emit_timeout, queue.push(topic, &payload)).await {
        Ok(Ok(())) => report.emitted += 1,
        Ok(Err(e)) => {
            tracing::warn!(%platform, id = %envelope.data.id, topic, error = %e, "emit failed");
            report.emit_failures += 1;
        }
        Err(_) => {
            tracing::warn!(
                %platform,
                id = %envelope.data.id,
                topic,
                timeout_ms = emit_timeout.as_millis(),
                "emit timed out"
            );
            report.emit_failures += 1;
        }
    }
}

#[cfg(test)]
#[path = "cycle_test.rs"]
mod tests;
