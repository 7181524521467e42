//! Live integration tests for murmur-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/murmur-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use murmur_core::{
    Cursor, CursorStore, MessageQueue, Platform, PopOrder, Rotation, TagQueue, TagsFile,
};
use murmur_db::{
    complete_harvest_run, create_harvest_run, fail_harvest_run, get_harvest_run,
    list_harvest_runs, queue_depth, seed_tags, start_harvest_run, DbError, HarvestRunSummary,
    PgCursorStore, PgMessageQueue, PgTagQueue, PoolConfig,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Cursor store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn cursor_set_get_clear(pool: PgPool) {
    let store = PgCursorStore::new(pool.clone(), PoolConfig::default());

    assert!(store.get(Platform::Mastodon, "sydney").await.unwrap().is_none());

    store
        .set(Platform::Mastodon, "sydney", &Cursor::new("100"))
        .await
        .unwrap();
    store
        .set(Platform::Mastodon, "sydney", &Cursor::new("60"))
        .await
        .unwrap();
    assert_eq!(
        store.get(Platform::Mastodon, "sydney").await.unwrap(),
        Some(Cursor::new("60")),
        "last write wins"
    );

    let key: String = sqlx::query_scalar("SELECT cursor_key FROM harvest_cursors")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(key, "mastodon:max_id:sydney");

    store.clear(Platform::Mastodon, "sydney").await.unwrap();
    assert!(store.get(Platform::Mastodon, "sydney").await.unwrap().is_none());
    // clearing an absent cursor is not an error
    store.clear(Platform::Mastodon, "sydney").await.unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
async fn cursors_are_scoped_by_platform(pool: PgPool) {
    let store = PgCursorStore::new(pool, PoolConfig::default());

    store
        .set(Platform::Reddit, "sydney", &Cursor::new("t3_abc"))
        .await
        .unwrap();
    store
        .set(Platform::Bluesky, "sydney", &Cursor::new("opaque"))
        .await
        .unwrap();

    assert_eq!(
        store.get(Platform::Reddit, "sydney").await.unwrap(),
        Some(Cursor::new("t3_abc"))
    );
    assert_eq!(
        store.get(Platform::Bluesky, "sydney").await.unwrap(),
        Some(Cursor::new("opaque"))
    );
    assert!(store.get(Platform::Mastodon, "sydney").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Tag rotation queue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn tag_queue_rotation(pool: PgPool) {
    let tags = PgTagQueue::new(pool, PoolConfig::default());

    for tag in ["melbourne", "sydney", "perth"] {
        assert!(tags.push_back(Platform::Reddit, tag).await.unwrap());
    }
    assert!(!tags.push_back(Platform::Reddit, "sydney").await.unwrap());

    assert_eq!(
        tags.peek_front(Platform::Reddit).await.unwrap().as_deref(),
        Some("melbourne")
    );

    tags.requeue(Platform::Reddit, "melbourne").await.unwrap();
    assert_eq!(
        tags.list(Platform::Reddit).await.unwrap(),
        ["sydney", "perth", "melbourne"]
    );

    assert!(tags.retire(Platform::Reddit, "sydney").await.unwrap());
    assert!(!tags.retire(Platform::Reddit, "sydney").await.unwrap());
    assert_eq!(
        tags.list(Platform::Reddit).await.unwrap(),
        ["perth", "melbourne"]
    );
    assert!(tags.peek_front(Platform::Mastodon).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_tags_is_idempotent(pool: PgPool) {
    let file = TagsFile {
        reddit: vec!["melbourne".to_string(), "sydney".to_string()],
        mastodon: vec!["auspol".to_string()],
        bluesky: vec!["australia".to_string()],
        reddit_hot: vec!["sydney".to_string()],
    };

    assert_eq!(seed_tags(&pool, &file).await.unwrap(), 5);
    assert_eq!(seed_tags(&pool, &file).await.unwrap(), 0);

    let tags = PgTagQueue::new(pool.clone(), PoolConfig::default());
    assert_eq!(
        tags.list(Platform::Reddit).await.unwrap(),
        ["melbourne", "sydney"]
    );
    assert_eq!(tags.list(Platform::Bluesky).await.unwrap(), ["australia"]);

    let hot = PgTagQueue::for_rotation(pool, PoolConfig::default(), Rotation::Hot);
    assert_eq!(hot.list(Platform::Reddit).await.unwrap(), ["sydney"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rotations_do_not_share_entries(pool: PgPool) {
    let history = PgTagQueue::new(pool.clone(), PoolConfig::default());
    let hot = PgTagQueue::for_rotation(pool, PoolConfig::default(), Rotation::Hot);

    assert!(history.push_back(Platform::Reddit, "sydney").await.unwrap());
    assert!(hot.push_back(Platform::Reddit, "sydney").await.unwrap());
    assert!(hot.push_back(Platform::Reddit, "news").await.unwrap());

    hot.requeue(Platform::Reddit, "sydney").await.unwrap();
    assert_eq!(hot.list(Platform::Reddit).await.unwrap(), ["news", "sydney"]);

    assert!(history.retire(Platform::Reddit, "sydney").await.unwrap());
    assert!(history.list(Platform::Reddit).await.unwrap().is_empty());
    assert_eq!(hot.list(Platform::Reddit).await.unwrap(), ["news", "sydney"]);
}

// ---------------------------------------------------------------------------
// Message queue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn message_queue_pops_by_order(pool: PgPool) {
    let queue = PgMessageQueue::new(pool.clone(), PoolConfig::default());

    for payload in [b"one".as_slice(), b"two", b"three"] {
        queue.push("reddit", payload).await.unwrap();
    }
    queue.push("elastic", b"other topic").await.unwrap();
    assert_eq!(queue_depth(&pool, "reddit").await.unwrap(), 3);

    assert_eq!(
        queue.pop("reddit", PopOrder::Fifo).await.unwrap().as_deref(),
        Some(b"one".as_slice())
    );
    assert_eq!(
        queue.pop("reddit", PopOrder::Lifo).await.unwrap().as_deref(),
        Some(b"three".as_slice())
    );
    assert_eq!(
        queue.pop("reddit", PopOrder::Fifo).await.unwrap().as_deref(),
        Some(b"two".as_slice())
    );
    assert!(queue.pop("reddit", PopOrder::Fifo).await.unwrap().is_none());
    assert_eq!(queue_depth(&pool, "elastic").await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Harvest runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn harvest_run_lifecycle(pool: PgPool) {
    let run = create_harvest_run(&pool, Platform::Mastodon, "cli")
        .await
        .unwrap();
    assert_eq!(run.status, "queued");
    assert_eq!(run.platform, "mastodon");

    start_harvest_run(&pool, run.id).await.unwrap();
    complete_harvest_run(
        &pool,
        run.id,
        HarvestRunSummary {
            tag: Some("auspol"),
            outcome: "advanced",
            items_emitted: 38,
            items_dropped: 2,
        },
    )
    .await
    .unwrap();

    let done = get_harvest_run(&pool, run.id).await.unwrap();
    assert_eq!(done.status, "succeeded");
    assert_eq!(done.tag.as_deref(), Some("auspol"));
    assert_eq!(done.items_emitted, 38);
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn harvest_run_rejects_invalid_transitions(pool: PgPool) {
    let run = create_harvest_run(&pool, Platform::Reddit, "scheduler")
        .await
        .unwrap();

    let err = fail_harvest_run(&pool, run.id, "boom").await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidRunTransition {
            expected_status: "running",
            ..
        }
    ));

    start_harvest_run(&pool, run.id).await.unwrap();
    fail_harvest_run(&pool, run.id, "upstream 503").await.unwrap();
    assert!(start_harvest_run(&pool, run.id).await.is_err());

    let runs = list_harvest_runs(&pool, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].error_message.as_deref(), Some("upstream 503"));
    assert!(matches!(
        get_harvest_run(&pool, run.id + 1000).await,
        Err(DbError::NotFound)
    ));
}
