//! Database operations for `harvest_runs`.

use chrono::{DateTime, Utc};
use murmur_core::Platform;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, platform, trigger_source, status, tag, outcome, \
     items_emitted, items_dropped, error_message, started_at, completed_at, created_at";

/// A row from the `harvest_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HarvestRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub platform: String,
    pub trigger_source: String,
    pub status: String,
    /// The tag the cycle selected; `None` until completion or when the queue was empty.
    pub tag: Option<String>,
    pub outcome: Option<String>,
    pub items_emitted: i32,
    pub items_dropped: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What a finished cycle reports back to its run row.
#[derive(Debug, Clone, Copy)]
pub struct HarvestRunSummary<'a> {
    pub tag: Option<&'a str>,
    pub outcome: &'a str,
    pub items_emitted: i32,
    pub items_dropped: i32,
}

/// Creates a new harvest run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_harvest_run(
    pool: &PgPool,
    platform: Platform,
    trigger_source: &str,
) -> Result<HarvestRunRow, DbError> {
    let row = sqlx::query_as::<_, HarvestRunRow>(&format!(
        "INSERT INTO harvest_runs (public_id, platform, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(platform.slug())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_harvest_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE harvest_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` and records what the cycle did.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_harvest_run(
    pool: &PgPool,
    id: i64,
    summary: HarvestRunSummary<'_>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE harvest_runs \
         SET status = 'succeeded', completed_at = NOW(), tag = $1, outcome = $2, \
             items_emitted = $3, items_dropped = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(summary.tag)
    .bind(summary.outcome)
    .bind(summary.items_emitted)
    .bind(summary.items_dropped)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_harvest_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE harvest_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_harvest_run(pool: &PgPool, id: i64) -> Result<HarvestRunRow, DbError> {
    sqlx::query_as::<_, HarvestRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM harvest_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_harvest_runs(pool: &PgPool, limit: i64) -> Result<Vec<HarvestRunRow>, DbError> {
    let rows = sqlx::query_as::<_, HarvestRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM harvest_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
