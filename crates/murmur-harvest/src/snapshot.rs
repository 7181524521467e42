//! One snapshot invocation: take the feed's target, fetch its newest page,
//! emit every item, and send the target to the back of its rotation.
//!
//! Snapshot feeds keep no cursor and never retire a target. The target is
//! requeued even when the fetch fails.

use std::time::Duration;

use chrono::Utc;
use murmur_core::{MessageQueue, TagQueue};

use crate::cycle::{emit_item, CycleOutcome, CycleReport, CycleSettings};
use crate::error::HarvestError;
use crate::normalize::NormalizeContext;
use crate::source::SnapshotSource;

pub struct SnapshotCycle<'a, S, T, Q> {
    source: &'a S,
    targets: &'a T,
    queue: &'a Q,
    emit_timeout: Duration,
}

impl<'a, S, T, Q> SnapshotCycle<'a, S, T, Q>
where
    S: SnapshotSource,
    T: TagQueue,
    Q: MessageQueue,
{
    /// `targets` is only consulted for feeds that rotate.
    pub fn new(source: &'a S, targets: &'a T, queue: &'a Q, settings: CycleSettings) -> Self {
        Self {
            source,
            targets,
            queue,
            emit_timeout: settings.emit_timeout,
        }
    }

    /// # Errors
    ///
    /// Returns the fetch error after the target has been requeued, or a store
    /// error from the rotation.
    pub async fn run(&self) -> Result<CycleReport, HarvestError> {
        let feed = self.source.feed();
        let platform = feed.platform();

        let target = match feed.rotation() {
            None => None,
            Some(rotation) => match self.targets.peek_front(platform).await? {
                Some(target) => Some(target),
                None => {
                    tracing::debug!(%feed, rotation = rotation.slug(), "nothing on rotation");
                    return Ok(CycleReport::new(platform, None, CycleOutcome::Idle));
                }
            },
        };

        let fetched = self.source.fetch_latest(target.as_deref()).await;
        if let Some(target) = &target {
            self.targets.requeue(platform, target).await?;
        }
        let items = match fetched {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    %feed,
                    target = ?target,
                    transient = e.is_transient(),
                    error = %e,
                    "snapshot fetch failed"
                );
                return Err(e);
            }
        };

        let mut report = CycleReport::new(platform, target.clone(), CycleOutcome::Snapshot(feed));
        report.fetched = items.len();
        let ctx = NormalizeContext {
            tag: target.as_deref(),
            fetched_at: Utc::now(),
        };
        for item in &items {
            emit_item(self.queue, self.emit_timeout, item, &ctx, &mut report).await;
        }

        tracing::info!(
            %feed,
            target = ?target,
            fetched = report.fetched,
            emitted = report.emitted,
            dropped = report.dropped,
            emit_failures = report.emit_failures,
            "snapshot complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use murmur_core::{Platform, SnapshotFeed};

    use super::*;
    use crate::memory::{MemoryQueue, MemoryTagQueue};
    use crate::types::{MastodonStatus, RedditPost};

    struct ScriptedFeed<T> {
        feed: SnapshotFeed,
        result: Mutex<Option<Result<Vec<T>, HarvestError>>>,
        targets: Mutex<Vec<Option<String>>>,
    }

    impl<T> ScriptedFeed<T> {
        fn new(feed: SnapshotFeed, result: Result<Vec<T>, HarvestError>) -> Self {
            Self {
                feed,
                result: Mutex::new(Some(result)),
                targets: Mutex::new(Vec::new()),
            }
        }

        fn targets(&self) -> Vec<Option<String>> {
            self.targets.lock().unwrap().clone()
        }
    }

    impl<T> SnapshotSource for ScriptedFeed<T>
    where
        T: crate::normalize::Normalize + Send + Sync,
    {
        type Item = T;

        fn feed(&self) -> SnapshotFeed {
            self.feed
        }

        async fn fetch_latest(&self, target: Option<&str>) -> Result<Vec<T>, HarvestError> {
            self.targets.lock().unwrap().push(target.map(str::to_owned));
            let result = self.result.lock().unwrap().take();
            result.unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn settings() -> CycleSettings {
        CycleSettings {
            historical_boundary: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            emit_timeout: Duration::from_secs(1),
        }
    }

    fn reddit_post(id: &str) -> RedditPost {
        RedditPost {
            id: Some(id.to_owned()),
            created_utc: Some(1_717_000_000.0),
            title: Some(format!("Post {id}")),
            author: Some("someone".to_owned()),
            ..RedditPost::default()
        }
    }

    fn mastodon_status(id: &str) -> MastodonStatus {
        MastodonStatus {
            id: Some(id.to_owned()),
            created_at: Some("2024-05-30T10:00:00.000Z".to_owned()),
            content: Some(format!("<p>status {id}</p>")),
            ..MastodonStatus::default()
        }
    }

    #[tokio::test]
    async fn hot_feed_emits_newest_page_and_requeues_subreddit() {
        let source = ScriptedFeed::new(
            SnapshotFeed::RedditHot,
            Ok(vec![reddit_post("b2"), reddit_post("b1")]),
        );
        let hot = MemoryTagQueue::new();
        for subreddit in ["australia", "news"] {
            hot.push_back(Platform::Reddit, subreddit).await.unwrap();
        }
        let queue = MemoryQueue::new();

        let report = SnapshotCycle::new(&source, &hot, &queue, settings())
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, CycleOutcome::Snapshot(SnapshotFeed::RedditHot));
        assert_eq!(report.tag.as_deref(), Some("australia"));
        assert_eq!(report.emitted, 2);
        assert_eq!(source.targets(), [Some("australia".to_owned())]);
        assert_eq!(hot.list(Platform::Reddit).await.unwrap(), ["news", "australia"]);

        let messages = queue.drain("reddit").await;
        let envelope: serde_json::Value = serde_json::from_slice(&messages[0]).unwrap();
        assert_eq!(envelope["data"]["tags"], serde_json::json!(["australia"]));
    }

    #[tokio::test]
    async fn empty_hot_rotation_is_idle_without_fetching() {
        let source = ScriptedFeed::<RedditPost>::new(SnapshotFeed::RedditHot, Ok(Vec::new()));
        let report = SnapshotCycle::new(&source, &MemoryTagQueue::new(), &MemoryQueue::new(), settings())
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, CycleOutcome::Idle);
        assert!(source.targets().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_still_requeues_subreddit() {
        let source = ScriptedFeed::<RedditPost>::new(
            SnapshotFeed::RedditHot,
            Err(HarvestError::UnexpectedStatus {
                status: 500,
                url: "https://oauth.reddit.com/r/australia/new".to_owned(),
            }),
        );
        let hot = MemoryTagQueue::new();
        for subreddit in ["australia", "news"] {
            hot.push_back(Platform::Reddit, subreddit).await.unwrap();
        }
        let queue = MemoryQueue::new();

        let err = SnapshotCycle::new(&source, &hot, &queue, settings())
            .run()
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(hot.list(Platform::Reddit).await.unwrap(), ["news", "australia"]);
        assert_eq!(queue.len("reddit").await, 0);
    }

    #[tokio::test]
    async fn public_timeline_ignores_rotation_and_adds_no_tag() {
        let source = ScriptedFeed::new(
            SnapshotFeed::MastodonPublic,
            Ok(vec![mastodon_status("12"), mastodon_status("11")]),
        );
        let rotation = MemoryTagQueue::new();
        rotation.push_back(Platform::Mastodon, "auspol").await.unwrap();
        let queue = MemoryQueue::new();

        let report = SnapshotCycle::new(&source, &rotation, &queue, settings())
            .run()
            .await
            .unwrap();

        assert_eq!(report.tag, None);
        assert_eq!(report.emitted, 2);
        assert_eq!(source.targets(), [None]);
        assert_eq!(rotation.list(Platform::Mastodon).await.unwrap(), ["auspol"]);

        let messages = queue.drain("mastodon").await;
        let envelope: serde_json::Value = serde_json::from_slice(&messages[0]).unwrap();
        assert_eq!(envelope["data"]["tags"], serde_json::json!([]));
    }
}
