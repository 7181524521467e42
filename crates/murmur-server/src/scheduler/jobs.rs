//! Job bodies. Failures are logged, never propagated, so one bad tick does
//! not stop the schedule.

use std::future::Future;

use murmur_core::{Platform, Rotation, SnapshotFeed};
use murmur_db::{HarvestRunSummary, PgCursorStore, PgMessageQueue, PgTagQueue, PoolConfig};
use murmur_harvest::{CycleReport, HarvestError};

use super::JobContext;

const TRIGGER: &str = "scheduler";

/// One harvest cycle for `platform`, recorded as a harvest run.
pub(super) async fn run_harvest_job(context: &JobContext, platform: Platform) {
    let pool = &context.pool;
    let pool_config = context.pool_config;
    let cursors = PgCursorStore::new(pool.clone(), pool_config);
    let tags = PgTagQueue::new(pool.clone(), pool_config);
    let queue = PgMessageQueue::new(pool.clone(), pool_config);

    record_run(
        pool,
        platform,
        context.harvester.run_cycle(platform, &cursors, &tags, &queue),
    )
    .await;
}

/// One snapshot of `feed`, recorded as a harvest run on the feed's platform.
pub(super) async fn run_snapshot_job(context: &JobContext, feed: SnapshotFeed) {
    let pool = &context.pool;
    let pool_config = context.pool_config;
    let targets = PgTagQueue::for_rotation(
        pool.clone(),
        pool_config,
        feed.rotation().unwrap_or(Rotation::Hot),
    );
    let queue = PgMessageQueue::new(pool.clone(), pool_config);

    record_run(
        pool,
        feed.platform(),
        context.harvester.run_snapshot(feed, &targets, &queue),
    )
    .await;
}

/// Wraps one cycle in a harvest run row. The cycle future is not polled
/// until the run has been started.
async fn record_run<F>(pool: &sqlx::PgPool, platform: Platform, cycle: F)
where
    F: Future<Output = Result<CycleReport, HarvestError>>,
{
    let run = match murmur_db::create_harvest_run(pool, platform, TRIGGER).await {
        Ok(run) => run,
        Err(e) => {
            tracing::error!(%platform, error = %e, "scheduler: failed to create harvest run");
            return;
        }
    };
    if let Err(e) = murmur_db::start_harvest_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return;
    }

    match cycle.await {
        Ok(report) => {
            if let Err(e) = murmur_db::complete_harvest_run(pool, run.id, summary(&report)).await {
                fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            }
        }
        Err(e) => {
            if e.is_transient() {
                tracing::warn!(%platform, error = %e, "scheduler: harvest cycle failed; will retry next tick");
            } else {
                tracing::error!(%platform, error = %e, "scheduler: harvest cycle failed");
            }
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        }
    }
}

/// Drain up to `batch` messages from each platform topic into `elastic`.
pub(super) async fn run_enrich_job(context: &JobContext, batch: usize) {
    let queue = PgMessageQueue::new(context.pool.clone(), context.pool_config);
    for platform in Platform::ALL {
        match murmur_sentiment::process_batch(&queue, platform.slug(), batch).await {
            Ok(report) if report.popped > 0 => {
                tracing::info!(
                    %platform,
                    enriched = report.enriched,
                    dropped = report.dropped,
                    "scheduler: enrichment batch done"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(%platform, error = %e, "scheduler: enrichment batch failed");
            }
        }
    }
}

/// Index up to `batch` enriched envelopes.
pub(super) async fn run_index_job(context: &JobContext, batch: usize) {
    let Some(client) = context.elastic.as_ref() else {
        return;
    };
    let queue = PgMessageQueue::new(context.pool.clone(), context.pool_config);
    match murmur_index::index_batch(&queue, client, batch).await {
        Ok(report) if report.popped > 0 => {
            tracing::info!(
                created = report.created,
                duplicates = report.duplicates,
                requeued = report.requeued,
                rejected = report.rejected,
                "scheduler: indexing batch done"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "scheduler: indexing batch failed"),
    }
}

fn summary(report: &CycleReport) -> HarvestRunSummary<'_> {
    HarvestRunSummary {
        tag: report.tag.as_deref(),
        outcome: report.outcome.label(),
        items_emitted: i32::try_from(report.emitted).unwrap_or(i32::MAX),
        items_dropped: i32::try_from(report.dropped + report.emit_failures).unwrap_or(i32::MAX),
    }
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = murmur_db::fail_harvest_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %mark_err, "scheduler: failed to mark harvest run as failed");
    }
}
