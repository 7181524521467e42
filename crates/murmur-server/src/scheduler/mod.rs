//! Background job scheduler.
//!
//! Registers one harvest job per configured platform, one enrichment job, and
//! (when an index is configured) one indexing job. Snapshot feeds are opt-in:
//! each is registered only when its cron variable is set. Each job skips a
//! tick while its previous run is still in flight, which keeps each
//! `(platform, tag)` to a single writer within this process.

mod jobs;

use std::sync::Arc;

use murmur_core::{Platform, SnapshotFeed};
use murmur_db::PoolConfig;
use murmur_harvest::Harvester;
use murmur_index::ElasticClient;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const DEFAULT_CRON: &str = "0 * * * * *";
const DEFAULT_BATCH: usize = 100;

/// Everything a job needs, shared across ticks.
pub struct JobContext {
    pub pool: PgPool,
    pub pool_config: PoolConfig,
    pub harvester: Harvester,
    pub elastic: Option<ElasticClient>,
}

/// Builds and starts the scheduler. Keep the returned handle alive; dropping
/// it stops every job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a job cannot be registered or the
/// scheduler fails to start.
pub async fn build_scheduler(context: Arc<JobContext>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    for platform in context.harvester.platforms() {
        register_harvest_job(&scheduler, Arc::clone(&context), platform).await?;
    }
    for feed in context.harvester.snapshot_feeds() {
        match std::env::var(snapshot_cron_var(feed)) {
            Ok(cron) => register_snapshot_job(&scheduler, Arc::clone(&context), feed, cron).await?,
            Err(_) => tracing::debug!(%feed, "scheduler: snapshot feed not scheduled"),
        }
    }
    register_enrich_job(&scheduler, Arc::clone(&context)).await?;
    if context.elastic.is_some() {
        register_index_job(&scheduler, Arc::clone(&context)).await?;
    } else {
        tracing::warn!("scheduler: no search index configured; indexing job not registered");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

fn cron_from_env(var: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| DEFAULT_CRON.to_string())
}

async fn register_harvest_job(
    scheduler: &JobScheduler,
    context: Arc<JobContext>,
    platform: Platform,
) -> Result<(), JobSchedulerError> {
    let cron = cron_from_env("MURMUR_HARVEST_CRON");
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let context = Arc::clone(&context);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::debug!(%platform, "scheduler: previous harvest still running; skipping tick");
                return;
            };
            jobs::run_harvest_job(&context, platform).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, %platform, "scheduler: registered harvest job");
    Ok(())
}

/// `MURMUR_REDDIT_HOT_CRON`, `MURMUR_MASTODON_PUBLIC_CRON`.
fn snapshot_cron_var(feed: SnapshotFeed) -> String {
    format!("MURMUR_{}_CRON", feed.slug().replace('-', "_").to_ascii_uppercase())
}

async fn register_snapshot_job(
    scheduler: &JobScheduler,
    context: Arc<JobContext>,
    feed: SnapshotFeed,
    cron: String,
) -> Result<(), JobSchedulerError> {
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let context = Arc::clone(&context);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::debug!(%feed, "scheduler: previous snapshot still running; skipping tick");
                return;
            };
            jobs::run_snapshot_job(&context, feed).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, %feed, "scheduler: registered snapshot job");
    Ok(())
}

async fn register_enrich_job(
    scheduler: &JobScheduler,
    context: Arc<JobContext>,
) -> Result<(), JobSchedulerError> {
    let cron = cron_from_env("MURMUR_ENRICH_CRON");
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let context = Arc::clone(&context);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::debug!("scheduler: previous enrichment still running; skipping tick");
                return;
            };
            jobs::run_enrich_job(&context, DEFAULT_BATCH).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered enrichment job");
    Ok(())
}

async fn register_index_job(
    scheduler: &JobScheduler,
    context: Arc<JobContext>,
) -> Result<(), JobSchedulerError> {
    let cron = cron_from_env("MURMUR_INDEX_CRON");
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let context = Arc::clone(&context);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::debug!("scheduler: previous indexing still running; skipping tick");
                return;
            };
            jobs::run_index_job(&context, DEFAULT_BATCH).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered indexing job");
    Ok(())
}
