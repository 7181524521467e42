//! Platform dispatch over the three page sources and the snapshot feeds.

use murmur_core::{AppConfig, CursorStore, MessageQueue, Platform, SnapshotFeed, TagQueue};

use crate::client::{BlueskyClient, HttpSettings, MastodonClient, RedditClient};
use crate::cycle::{CycleReport, CycleSettings, HarvestCycle};
use crate::error::HarvestError;
use crate::snapshot::SnapshotCycle;

/// Holds one client per platform it was built for. Clients cache their
/// tokens, so keep a `Harvester` alive across cycles where possible.
#[derive(Default)]
pub struct Harvester {
    reddit: Option<RedditClient>,
    mastodon: Option<MastodonClient>,
    bluesky: Option<BlueskyClient>,
    settings: Option<CycleSettings>,
}

impl Harvester {
    /// Build clients for exactly `platforms`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Config`] if a requested platform has no
    /// credentials, or a client construction error.
    pub fn for_platforms(config: &AppConfig, platforms: &[Platform]) -> Result<Self, HarvestError> {
        let http = HttpSettings::from_config(config);
        let mut harvester = Self {
            settings: Some(CycleSettings::from_config(config)),
            ..Self::default()
        };
        for platform in platforms {
            match platform {
                Platform::Reddit => {
                    harvester.reddit = Some(RedditClient::new(config.reddit_credentials()?, &http)?);
                }
                Platform::Mastodon => {
                    harvester.mastodon =
                        Some(MastodonClient::new(config.mastodon_credentials()?, &http)?);
                }
                Platform::Bluesky => {
                    harvester.bluesky =
                        Some(BlueskyClient::new(config.bluesky_credentials()?, &http)?);
                }
            }
        }
        Ok(harvester)
    }

    /// Build clients for every platform that has credentials configured.
    ///
    /// # Errors
    ///
    /// Returns a client construction error.
    pub fn from_config(config: &AppConfig) -> Result<Self, HarvestError> {
        let platforms: Vec<Platform> = Platform::ALL
            .into_iter()
            .filter(|p| match p {
                Platform::Reddit => config.reddit.is_some(),
                Platform::Mastodon => config.mastodon.is_some(),
                Platform::Bluesky => config.bluesky.is_some(),
            })
            .collect();
        Self::for_platforms(config, &platforms)
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        let mut out = Vec::new();
        if self.reddit.is_some() {
            out.push(Platform::Reddit);
        }
        if self.mastodon.is_some() {
            out.push(Platform::Mastodon);
        }
        if self.bluesky.is_some() {
            out.push(Platform::Bluesky);
        }
        out
    }

    /// Snapshot feeds whose platform has a client.
    #[must_use]
    pub fn snapshot_feeds(&self) -> Vec<SnapshotFeed> {
        let platforms = self.platforms();
        SnapshotFeed::ALL
            .into_iter()
            .filter(|feed| platforms.contains(&feed.platform()))
            .collect()
    }

    /// Run one snapshot of `feed`. `targets` must be the feed's own rotation
    /// list; it is ignored by feeds without one.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::NotConfigured`] when the feed's platform has no
    /// client, otherwise whatever the snapshot returns.
    pub async fn run_snapshot<T, Q>(
        &self,
        feed: SnapshotFeed,
        targets: &T,
        queue: &Q,
    ) -> Result<CycleReport, HarvestError>
    where
        T: TagQueue,
        Q: MessageQueue,
    {
        let platform = feed.platform();
        let not_configured = || HarvestError::NotConfigured { platform };
        let settings = self.settings.ok_or_else(not_configured)?;
        match feed {
            SnapshotFeed::RedditHot => {
                let source = self.reddit.as_ref().ok_or_else(not_configured)?.hot();
                SnapshotCycle::new(&source, targets, queue, settings).run().await
            }
            SnapshotFeed::MastodonPublic => {
                let source = self.mastodon.as_ref().ok_or_else(not_configured)?.public_timeline();
                SnapshotCycle::new(&source, targets, queue, settings).run().await
            }
        }
    }

    /// Run one cycle for `platform` against the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::NotConfigured`] when no client was built for
    /// `platform`, otherwise whatever the cycle returns.
    pub async fn run_cycle<C, T, Q>(
        &self,
        platform: Platform,
        cursors: &C,
        tags: &T,
        queue: &Q,
    ) -> Result<CycleReport, HarvestError>
    where
        C: CursorStore,
        T: TagQueue,
        Q: MessageQueue,
    {
        let not_configured = || HarvestError::NotConfigured { platform };
        let settings = self.settings.ok_or_else(not_configured)?;
        match platform {
            Platform::Reddit => {
                let source = self.reddit.as_ref().ok_or_else(not_configured)?;
                HarvestCycle::new(source, cursors, tags, queue, settings).run().await
            }
            Platform::Mastodon => {
                let source = self.mastodon.as_ref().ok_or_else(not_configured)?;
                HarvestCycle::new(source, cursors, tags, queue, settings).run().await
            }
            Platform::Bluesky => {
                let source = self.bluesky.as_ref().ok_or_else(not_configured)?;
                HarvestCycle::new(source, cursors, tags, queue, settings).run().await
            }
        }
    }
}
