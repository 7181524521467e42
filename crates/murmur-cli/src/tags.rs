//! Tag rotation commands.

use clap::Subcommand;
use murmur_core::{AppConfig, CursorStore, Platform, Rotation, TagQueue};
use murmur_db::{PgCursorStore, PgTagQueue, PoolConfig};

#[derive(Debug, Subcommand)]
pub enum TagsCommands {
    /// Queue every tag from the tag file that is not already queued
    Seed,
    /// Show queued tags in rotation order
    List {
        #[arg(long)]
        platform: Option<Platform>,

        /// Show the hot-subreddit rotation instead of the history walk
        #[arg(long)]
        hot: bool,
    },
    /// Remove a tag from rotation and drop its cursor
    Retire {
        #[arg(long)]
        platform: Platform,

        #[arg(long)]
        tag: String,

        /// Remove from the hot-subreddit rotation; hot entries have no cursor
        #[arg(long)]
        hot: bool,
    },
}

pub(crate) async fn run_tags(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: TagsCommands,
) -> anyhow::Result<()> {
    let pool_config = PoolConfig::from_app_config(config);

    match command {
        TagsCommands::Seed => {
            let file = murmur_core::load_tags(&config.tags_path)?;
            let added = murmur_db::seed_tags(pool, &file).await?;
            println!(
                "queued {added} new tags from {}",
                config.tags_path.display()
            );
        }
        TagsCommands::List { platform, hot } => {
            let rotation = if hot { Rotation::Hot } else { Rotation::History };
            let tags = PgTagQueue::for_rotation(pool.clone(), pool_config, rotation);
            let platforms = platform.map_or_else(|| Platform::ALL.to_vec(), |p| vec![p]);
            for platform in platforms {
                let queued = tags.list(platform).await?;
                println!("{platform} ({}):", queued.len());
                for (position, tag) in queued.iter().enumerate() {
                    println!("  {}. {tag}", position + 1);
                }
            }
        }
        TagsCommands::Retire { platform, tag, hot: true } => {
            let tags = PgTagQueue::for_rotation(pool.clone(), pool_config, Rotation::Hot);
            if tags.retire(platform, &tag).await? {
                println!("removed {platform} {tag} from the hot rotation");
            } else {
                println!("{platform} {tag} was not on the hot rotation");
            }
        }
        TagsCommands::Retire { platform, tag, hot: false } => {
            let removed = PgTagQueue::new(pool.clone(), pool_config)
                .retire(platform, &tag)
                .await?;
            PgCursorStore::new(pool.clone(), pool_config)
                .clear(platform, &tag)
                .await?;
            if removed {
                println!("retired {platform} tag {tag}");
            } else {
                println!("{platform} tag {tag} was not queued; cursor cleared");
            }
        }
    }
    Ok(())
}
