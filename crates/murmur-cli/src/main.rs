mod harvest;
mod search;
mod tags;
mod workers;

use clap::{Parser, Subcommand};
use murmur_core::{Platform, SnapshotFeed};
use tracing_subscriber::EnvFilter;

use crate::tags::TagsCommands;

#[derive(Debug, Parser)]
#[command(name = "murmur")]
#[command(about = "Harvest, enrich, and index social media posts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run harvest cycles for one platform
    Harvest {
        /// reddit, mastodon, or bluesky
        #[arg(long)]
        platform: Platform,

        /// Number of cycles to run; stops early when no tag is queued
        #[arg(long, default_value = "1")]
        cycles: u32,

        /// Run one cycle against in-memory state seeded from the tag file and
        /// print the envelopes instead of emitting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Emit the newest page of a cursorless feed
    Snapshot {
        /// reddit-hot or mastodon-public
        #[arg(long)]
        feed: SnapshotFeed,

        #[arg(long, default_value = "1")]
        cycles: u32,

        /// Fetch once against in-memory state seeded from the tag file and
        /// print the envelopes instead of emitting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Enrich harvested envelopes and forward them to the index topic
    Process {
        /// Platform topic to drain; all platform topics when omitted
        #[arg(long)]
        topic: Option<String>,

        #[arg(long, default_value = "100")]
        batch: usize,
    },
    /// Write enriched envelopes to the search index
    Index {
        #[arg(long, default_value = "100")]
        batch: usize,
    },
    /// Manage the tag rotation
    Tags {
        #[command(subcommand)]
        command: TagsCommands,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Query indexed posts
    Search {
        /// Words matched against post content (repeatable)
        #[arg(long)]
        content: Vec<String>,

        /// Exact post tags (repeatable)
        #[arg(long)]
        tags: Vec<String>,

        /// Exact enrichment keywords (repeatable)
        #[arg(long)]
        keywords: Vec<String>,

        /// Match any clause instead of all of them
        #[arg(long)]
        or: bool,

        #[arg(long)]
        max_docs: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = murmur_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if cli.command.needs_database() {
        let pool_config = murmur_db::PoolConfig::from_app_config(&config);
        let pool = murmur_db::connect_pool(&config.database_url, pool_config).await?;
        run_with_pool(&pool, &config, cli.command).await
    } else {
        run_offline(&config, cli.command).await
    }
}

impl Commands {
    fn needs_database(&self) -> bool {
        !matches!(
            self,
            Commands::Search { .. }
                | Commands::Harvest { dry_run: true, .. }
                | Commands::Snapshot { dry_run: true, .. }
        )
    }
}

async fn run_offline(config: &murmur_core::AppConfig, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            content,
            tags,
            keywords,
            or,
            max_docs,
        } => search::run_search(config, search::request(content, tags, keywords, or, max_docs)).await,
        Commands::Harvest { platform, .. } => harvest::run_harvest_dry(config, platform).await,
        Commands::Snapshot { feed, .. } => harvest::run_snapshot_dry(config, feed).await,
        _ => anyhow::bail!("command requires a database connection"),
    }
}

async fn run_with_pool(
    pool: &sqlx::PgPool,
    config: &murmur_core::AppConfig,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Harvest {
            platform, cycles, ..
        } => harvest::run_harvest(pool, config, platform, cycles).await,
        Commands::Snapshot { feed, cycles, .. } => {
            harvest::run_snapshot(pool, config, feed, cycles).await
        }
        Commands::Process { topic, batch } => {
            workers::run_process(pool, config, topic.as_deref(), batch).await
        }
        Commands::Index { batch } => workers::run_index(pool, config, batch).await,
        Commands::Tags { command } => tags::run_tags(pool, config, command).await,
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            murmur_db::ping(pool).await?;
            println!("database connection ok");
            Ok(())
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = murmur_db::run_migrations(pool).await?;
            println!("applied {applied} migrations");
            Ok(())
        }
        Commands::Search { .. } => run_offline(config, command).await,
    }
}

/// Attempt to mark a harvest run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = murmur_db::fail_harvest_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark harvest run as failed");
    }
}

#[cfg(test)]
mod tests;
