//! Postgres-backed [`TagQueue`].
//!
//! Each `(rotation, platform)` list is ordered by `position`; the front is the
//! lowest. Requeueing moves a tag past the current maximum. Retiring deletes
//! the row.

use std::time::Duration;

use murmur_core::{Platform, Rotation, StoreError, TagQueue};
use sqlx::PgPool;

use crate::{store_error, PoolConfig};

#[derive(Debug, Clone)]
pub struct PgTagQueue {
    pool: PgPool,
    rotation: Rotation,
    acquire_timeout: Duration,
}

impl PgTagQueue {
    /// The history rotation walked by the harvest cycle.
    #[must_use]
    pub fn new(pool: PgPool, config: PoolConfig) -> Self {
        Self::for_rotation(pool, config, Rotation::History)
    }

    #[must_use]
    pub fn for_rotation(pool: PgPool, config: PoolConfig, rotation: Rotation) -> Self {
        Self {
            pool,
            rotation,
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

impl TagQueue for PgTagQueue {
    async fn peek_front(&self, platform: Platform) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT tag FROM harvest_tags \
             WHERE rotation = $1 AND platform = $2 \
             ORDER BY position ASC, id ASC \
             LIMIT 1",
        )
        .bind(self.rotation.slug())
        .bind(platform.slug())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))
    }

    async fn requeue(&self, platform: Platform, tag: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE harvest_tags \
             SET position = ( \
                 SELECT COALESCE(MAX(position), 0) + 1 FROM harvest_tags \
                 WHERE rotation = $1 AND platform = $2 \
             ) \
             WHERE rotation = $1 AND platform = $2 AND tag = $3",
        )
        .bind(self.rotation.slug())
        .bind(platform.slug())
        .bind(tag)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(())
    }

    async fn retire(&self, platform: Platform, tag: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM harvest_tags WHERE rotation = $1 AND platform = $2 AND tag = $3",
        )
        .bind(self.rotation.slug())
        .bind(platform.slug())
        .bind(tag)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(result.rows_affected() > 0)
    }

    async fn push_back(&self, platform: Platform, tag: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO harvest_tags (rotation, platform, tag, position) \
             SELECT $1, $2, $3, COALESCE(MAX(position), 0) + 1 FROM harvest_tags \
             WHERE rotation = $1 AND platform = $2 \
             ON CONFLICT (rotation, platform, tag) DO NOTHING",
        )
        .bind(self.rotation.slug())
        .bind(platform.slug())
        .bind(tag)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, platform: Platform) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT tag FROM harvest_tags \
             WHERE rotation = $1 AND platform = $2 \
             ORDER BY position ASC, id ASC",
        )
        .bind(self.rotation.slug())
        .bind(platform.slug())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, self.acquire_timeout))
    }
}
