//! Postgres-backed [`MessageQueue`].
//!
//! Pops use `FOR UPDATE SKIP LOCKED` so concurrent consumers of one topic never
//! receive the same message.

use std::time::Duration;

use murmur_core::{MessageQueue, PopOrder, StoreError};
use sqlx::PgPool;

use crate::{store_error, DbError, PoolConfig};

const POP_OLDEST: &str = "DELETE FROM queue_messages \
     WHERE id = ( \
         SELECT id FROM queue_messages WHERE topic = $1 \
         ORDER BY id ASC LIMIT 1 FOR UPDATE SKIP LOCKED \
     ) \
     RETURNING payload";

const POP_NEWEST: &str = "DELETE FROM queue_messages \
     WHERE id = ( \
         SELECT id FROM queue_messages WHERE topic = $1 \
         ORDER BY id DESC LIMIT 1 FOR UPDATE SKIP LOCKED \
     ) \
     RETURNING payload";

#[derive(Debug, Clone)]
pub struct PgMessageQueue {
    pool: PgPool,
    acquire_timeout: Duration,
}

impl PgMessageQueue {
    #[must_use]
    pub fn new(pool: PgPool, config: PoolConfig) -> Self {
        Self {
            pool,
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

impl MessageQueue for PgMessageQueue {
    async fn push(&self, topic: &str, payload: &[u8]) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO queue_messages (topic, payload) VALUES ($1, $2)")
            .bind(topic)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, self.acquire_timeout))?;

        Ok(())
    }

    async fn pop(&self, topic: &str, order: PopOrder) -> Result<Option<Vec<u8>>, StoreError> {
        let sql = match order {
            PopOrder::Fifo => POP_OLDEST,
            PopOrder::Lifo => POP_NEWEST,
        };
        sqlx::query_scalar::<_, Vec<u8>>(sql)
            .bind(topic)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, self.acquire_timeout))
    }
}

/// Number of messages waiting on `topic`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn queue_depth(pool: &PgPool, topic: &str) -> Result<i64, DbError> {
    let depth = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_messages WHERE topic = $1")
        .bind(topic)
        .fetch_one(pool)
        .await?;
    Ok(depth)
}
