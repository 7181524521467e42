//! Offline unit tests for murmur-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use murmur_core::{AppConfig, Environment, StoreError};
use murmur_db::{DbError, HarvestRunRow, PoolConfig};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        tags_path: PathBuf::from("./config/tags.yaml"),
        historical_boundary: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        http_timeout_secs: 30,
        emit_timeout_secs: 5,
        user_agent: "ua".to_string(),
        max_retries: 2,
        retry_backoff_base_ms: 500,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        reddit: None,
        mastodon: None,
        bluesky: None,
        elastic: None,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout(), Duration::from_secs(9));
}

#[test]
fn db_errors_become_store_backend_errors() {
    let err: StoreError = DbError::NotFound.into();
    assert!(matches!(err, StoreError::Backend(msg) if msg == "record not found"));
}

/// Compile-time smoke test: confirm that [`HarvestRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn harvest_run_row_has_expected_fields() {
    let row = HarvestRunRow {
        id: 1_i64,
        public_id: uuid::Uuid::new_v4(),
        platform: "mastodon".to_string(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        tag: None,
        outcome: None,
        items_emitted: 0_i32,
        items_dropped: 0_i32,
        error_message: None,
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.platform, "mastodon");
    assert_eq!(row.status, "queued");
    assert!(row.tag.is_none());
    assert_eq!(row.items_emitted, 0);
}
