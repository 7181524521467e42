//! Postgres-backed [`CursorStore`].

use std::time::Duration;

use murmur_core::{cursor_key, Cursor, CursorStore, Platform, StoreError};
use sqlx::PgPool;

use crate::{store_error, PoolConfig};

#[derive(Debug, Clone)]
pub struct PgCursorStore {
    pool: PgPool,
    acquire_timeout: Duration,
}

impl PgCursorStore {
    #[must_use]
    pub fn new(pool: PgPool, config: PoolConfig) -> Self {
        Self {
            pool,
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

impl CursorStore for PgCursorStore {
    async fn get(&self, platform: Platform, tag: &str) -> Result<Option<Cursor>, StoreError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT cursor FROM harvest_cursors WHERE cursor_key = $1",
        )
        .bind(cursor_key(platform, tag))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(value.map(Cursor::from))
    }

    async fn set(&self, platform: Platform, tag: &str, cursor: &Cursor) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO harvest_cursors (cursor_key, platform, tag, cursor) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (cursor_key) DO UPDATE SET \
                 cursor = EXCLUDED.cursor, \
                 updated_at = NOW()",
        )
        .bind(cursor_key(platform, tag))
        .bind(platform.slug())
        .bind(tag)
        .bind(cursor.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(())
    }

    async fn clear(&self, platform: Platform, tag: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM harvest_cursors WHERE cursor_key = $1")
            .bind(cursor_key(platform, tag))
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(())
    }
}
