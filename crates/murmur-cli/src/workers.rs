//! Enrichment and indexing batch commands.

use murmur_core::{AppConfig, Platform};
use murmur_db::{PgMessageQueue, PoolConfig};
use murmur_index::ElasticClient;

/// Enrich up to `batch` envelopes from `topic`, or from every platform topic
/// when `topic` is `None`.
///
/// # Errors
///
/// Returns an error for an unknown topic or when the queue cannot be read.
pub(crate) async fn run_process(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    topic: Option<&str>,
    batch: usize,
) -> anyhow::Result<()> {
    let queue = PgMessageQueue::new(pool.clone(), PoolConfig::from_app_config(config));
    let topics: Vec<&str> = match topic {
        Some(topic) => vec![topic],
        None => Platform::ALL.iter().map(|p| p.slug()).collect(),
    };

    for topic in topics {
        let report = murmur_sentiment::process_batch(&queue, topic, batch).await?;
        println!(
            "{topic}: {} popped, {} enriched, {} dropped, {} push failures",
            report.popped, report.enriched, report.dropped, report.push_failures
        );
    }
    Ok(())
}

/// Index up to `batch` enriched envelopes.
///
/// # Errors
///
/// Returns an error if Elasticsearch is not configured or the queue cannot
/// be read.
pub(crate) async fn run_index(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    batch: usize,
) -> anyhow::Result<()> {
    let client = ElasticClient::new(config.elastic_config()?, config.http_timeout_secs)?;
    let queue = PgMessageQueue::new(pool.clone(), PoolConfig::from_app_config(config));

    let report = murmur_index::index_batch(&queue, &client, batch).await?;
    println!(
        "{} popped, {} created, {} duplicates, {} dropped, {} requeued, {} rejected",
        report.popped,
        report.created,
        report.duplicates,
        report.dropped,
        report.requeued,
        report.rejected
    );
    Ok(())
}
