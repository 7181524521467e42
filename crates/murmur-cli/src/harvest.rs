//! Harvest command handlers.

use murmur_core::{AppConfig, Platform, Rotation, SnapshotFeed};
use murmur_db::{HarvestRunSummary, PgCursorStore, PgMessageQueue, PgTagQueue, PoolConfig};
use murmur_harvest::{
    CycleOutcome, CycleReport, Harvester, MemoryCursorStore, MemoryQueue, MemoryTagQueue,
};

use crate::fail_run_best_effort;

/// Run up to `cycles` harvest cycles for `platform`, recording each one as a
/// harvest run.
///
/// Stops early once the platform has no queued tags.
///
/// # Errors
///
/// Returns an error if credentials for `platform` are missing, a run row
/// cannot be written, or a cycle fails. The failing run is marked `failed`.
pub(crate) async fn run_harvest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    platform: Platform,
    cycles: u32,
) -> anyhow::Result<()> {
    let harvester = Harvester::for_platforms(config, &[platform])?;
    let pool_config = PoolConfig::from_app_config(config);
    let cursors = PgCursorStore::new(pool.clone(), pool_config);
    let tags = PgTagQueue::new(pool.clone(), pool_config);
    let queue = PgMessageQueue::new(pool.clone(), pool_config);

    let mut emitted = 0usize;
    for cycle in 1..=cycles {
        let run = murmur_db::create_harvest_run(pool, platform, "cli").await?;
        if let Err(e) = murmur_db::start_harvest_run(pool, run.id).await {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }

        let report = match harvester.run_cycle(platform, &cursors, &tags, &queue).await {
            Ok(report) => report,
            Err(e) => {
                fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
                return Err(e.into());
            }
        };

        if let Err(e) = murmur_db::complete_harvest_run(pool, run.id, summary(&report)).await {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }

        println!("cycle {cycle}: {}", describe(&report));
        emitted += report.emitted;
        if report.outcome == CycleOutcome::Idle {
            break;
        }
    }

    println!("emitted {emitted} envelopes to topic {}", platform.slug());
    Ok(())
}

/// Run one cycle against in-memory collaborators seeded from the tag file and
/// print every envelope that would have been emitted.
///
/// # Errors
///
/// Returns an error if the tag file cannot be loaded, credentials are
/// missing, or the page fetch fails.
pub(crate) async fn run_harvest_dry(config: &AppConfig, platform: Platform) -> anyhow::Result<()> {
    let tags_file = murmur_core::load_tags(&config.tags_path)?;
    let harvester = Harvester::for_platforms(config, &[platform])?;

    let cursors = MemoryCursorStore::new();
    let tags = MemoryTagQueue::from_tags(&tags_file);
    let queue = MemoryQueue::new();

    let report = harvester.run_cycle(platform, &cursors, &tags, &queue).await?;

    for payload in queue.drain(platform.slug()).await {
        let envelope: serde_json::Value = serde_json::from_slice(&payload)?;
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    println!("dry-run: {}", describe(&report));
    Ok(())
}

/// Run up to `cycles` snapshots of `feed`, recording each as a harvest run.
///
/// # Errors
///
/// Returns an error if credentials for the feed's platform are missing, a run
/// row cannot be written, or a fetch fails. The failing run is marked `failed`.
pub(crate) async fn run_snapshot(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    feed: SnapshotFeed,
    cycles: u32,
) -> anyhow::Result<()> {
    let platform = feed.platform();
    let harvester = Harvester::for_platforms(config, &[platform])?;
    let pool_config = PoolConfig::from_app_config(config);
    let targets = PgTagQueue::for_rotation(
        pool.clone(),
        pool_config,
        feed.rotation().unwrap_or(Rotation::Hot),
    );
    let queue = PgMessageQueue::new(pool.clone(), pool_config);

    let mut emitted = 0usize;
    for cycle in 1..=cycles {
        let run = murmur_db::create_harvest_run(pool, platform, "cli").await?;
        if let Err(e) = murmur_db::start_harvest_run(pool, run.id).await {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }

        let report = match harvester.run_snapshot(feed, &targets, &queue).await {
            Ok(report) => report,
            Err(e) => {
                fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
                return Err(e.into());
            }
        };

        if let Err(e) = murmur_db::complete_harvest_run(pool, run.id, summary(&report)).await {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }

        println!("cycle {cycle}: {}", describe(&report));
        emitted += report.emitted;
        if report.outcome == CycleOutcome::Idle {
            break;
        }
    }

    println!("emitted {emitted} envelopes to topic {}", platform.slug());
    Ok(())
}

/// One snapshot against an in-memory rotation seeded from the tag file,
/// printing every envelope that would have been emitted.
///
/// # Errors
///
/// Returns an error if the tag file cannot be loaded, credentials are
/// missing, or the fetch fails.
pub(crate) async fn run_snapshot_dry(config: &AppConfig, feed: SnapshotFeed) -> anyhow::Result<()> {
    let tags_file = murmur_core::load_tags(&config.tags_path)?;
    let harvester = Harvester::for_platforms(config, &[feed.platform()])?;

    let targets = MemoryTagQueue::from_rotation(&tags_file, feed.rotation().unwrap_or(Rotation::Hot));
    let queue = MemoryQueue::new();

    let report = harvester.run_snapshot(feed, &targets, &queue).await?;

    for payload in queue.drain(feed.platform().slug()).await {
        let envelope: serde_json::Value = serde_json::from_slice(&payload)?;
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    println!("dry-run: {}", describe(&report));
    Ok(())
}

fn summary(report: &CycleReport) -> HarvestRunSummary<'_> {
    HarvestRunSummary {
        tag: report.tag.as_deref(),
        outcome: report.outcome.label(),
        items_emitted: i32::try_from(report.emitted).unwrap_or(i32::MAX),
        items_dropped: i32::try_from(report.dropped + report.emit_failures).unwrap_or(i32::MAX),
    }
}

fn describe(report: &CycleReport) -> String {
    let counts = format!(
        "{} fetched, {} emitted, {} dropped, {} emit failures ({})",
        report.fetched,
        report.emitted,
        report.dropped,
        report.emit_failures,
        report.outcome.label()
    );
    match (&report.outcome, report.tag.as_deref()) {
        (CycleOutcome::Snapshot(feed), Some(target)) => format!("{feed} {target}: {counts}"),
        (CycleOutcome::Snapshot(feed), None) => format!("{feed}: {counts}"),
        (_, Some(tag)) => format!("{} tag {tag}: {counts}", report.platform),
        (_, None) => format!("no {} tags queued", report.platform),
    }
}
