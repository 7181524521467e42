use super::*;
use murmur_index::Combine;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["murmur", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Ping
        }
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["murmur", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Migrate
        }
    ));
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["murmur"]).is_err());
}

#[test]
fn harvest_defaults_to_one_live_cycle() {
    let cli = Cli::try_parse_from(["murmur", "harvest", "--platform", "reddit"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Harvest {
            platform: Platform::Reddit,
            cycles: 1,
            dry_run: false,
        }
    ));
    assert!(cli.command.needs_database());
}

#[test]
fn harvest_dry_run_skips_the_database() {
    let cli = Cli::try_parse_from([
        "murmur",
        "harvest",
        "--platform",
        "bluesky",
        "--cycles",
        "5",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Harvest {
            platform: Platform::Bluesky,
            cycles: 5,
            dry_run: true,
        }
    ));
    assert!(!cli.command.needs_database());
}

#[test]
fn harvest_rejects_unknown_platform() {
    let err = Cli::try_parse_from(["murmur", "harvest", "--platform", "myspace"]).unwrap_err();
    assert!(err.to_string().contains("myspace"));
}

#[test]
fn harvest_requires_platform() {
    assert!(Cli::try_parse_from(["murmur", "harvest"]).is_err());
}

#[test]
fn process_without_topic_drains_all_platforms() {
    let cli = Cli::try_parse_from(["murmur", "process"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Process {
            topic: None,
            batch: 100
        }
    ));
}

#[test]
fn process_with_topic_and_batch() {
    let cli =
        Cli::try_parse_from(["murmur", "process", "--topic", "mastodon", "--batch", "25"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Process {
            topic: Some(ref t),
            batch: 25
        } if t == "mastodon"
    ));
}

#[test]
fn parses_index_batch() {
    let cli = Cli::try_parse_from(["murmur", "index", "--batch", "10"]).unwrap();
    assert!(matches!(cli.command, Commands::Index { batch: 10 }));
}

#[test]
fn parses_tags_subcommands() {
    let cli = Cli::try_parse_from(["murmur", "tags", "seed"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Tags {
            command: TagsCommands::Seed
        }
    ));

    let cli = Cli::try_parse_from(["murmur", "tags", "list", "--platform", "mastodon"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Tags {
            command: TagsCommands::List {
                platform: Some(Platform::Mastodon),
                hot: false,
            }
        }
    ));

    let cli = Cli::try_parse_from([
        "murmur",
        "tags",
        "retire",
        "--platform",
        "reddit",
        "--tag",
        "sydney",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Tags {
            command: TagsCommands::Retire {
                platform: Platform::Reddit,
                ref tag,
                hot: false,
            }
        } if tag == "sydney"
    ));
}

#[test]
fn tags_hot_flag_selects_the_hot_rotation() {
    let cli =
        Cli::try_parse_from(["murmur", "tags", "list", "--platform", "reddit", "--hot"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Tags {
            command: TagsCommands::List {
                platform: Some(Platform::Reddit),
                hot: true,
            }
        }
    ));

    let cli = Cli::try_parse_from([
        "murmur", "tags", "retire", "--platform", "reddit", "--tag", "AusPol", "--hot",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Tags {
            command: TagsCommands::Retire { hot: true, .. }
        }
    ));
}

#[test]
fn snapshot_parses_feed_and_cycles() {
    let cli = Cli::try_parse_from([
        "murmur",
        "snapshot",
        "--feed",
        "reddit-hot",
        "--cycles",
        "3",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Snapshot {
            feed: SnapshotFeed::RedditHot,
            cycles: 3,
            dry_run: false,
        }
    ));
    assert!(cli.command.needs_database());
}

#[test]
fn snapshot_dry_run_skips_the_database() {
    let cli = Cli::try_parse_from(["murmur", "snapshot", "--feed", "mastodon-public", "--dry-run"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Snapshot {
            feed: SnapshotFeed::MastodonPublic,
            cycles: 1,
            dry_run: true,
        }
    ));
    assert!(!cli.command.needs_database());
}

#[test]
fn snapshot_rejects_unknown_feed() {
    assert!(Cli::try_parse_from(["murmur", "snapshot", "--feed", "bluesky-hot"]).is_err());
    assert!(Cli::try_parse_from(["murmur", "snapshot"]).is_err());
}

#[test]
fn tags_retire_requires_tag() {
    assert!(Cli::try_parse_from(["murmur", "tags", "retire", "--platform", "reddit"]).is_err());
}

#[test]
fn search_collects_repeated_terms() {
    let cli = Cli::try_parse_from([
        "murmur",
        "search",
        "--content",
        "housing",
        "--content",
        "rent",
        "--tags",
        "sydney",
        "--or",
        "--max-docs",
        "50",
    ])
    .unwrap();
    assert!(!cli.command.needs_database());

    let Commands::Search {
        content,
        tags,
        keywords,
        or,
        max_docs,
    } = cli.command
    else {
        panic!("unexpected command variant");
    };
    let request = search::request(content, tags, keywords, or, max_docs);

    assert_eq!(request.content, ["housing", "rent"]);
    assert_eq!(request.tags, ["sydney"]);
    assert!(request.keywords.is_empty());
    assert_eq!(request.combine, Combine::Or);
    assert_eq!(request.max_docs, Some(50));
}

#[test]
fn search_defaults_to_and() {
    let request = search::request(vec![], vec!["perth".to_owned()], vec![], false, None);
    assert_eq!(request.combine, Combine::And);
    assert_eq!(request.max_docs(), murmur_index::DEFAULT_MAX_DOCS);
}
