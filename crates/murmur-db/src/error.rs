use std::time::Duration;

use murmur_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("harvest run {id} is not in '{expected_status}' state")]
    InvalidRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Collaborator-facing error for a failed query. Pool exhaustion becomes
/// [`StoreError::Timeout`] so a slow database reads differently from a broken one.
pub(crate) fn store_error(err: sqlx::Error, acquire_timeout: Duration) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(acquire_timeout),
        other => DbError::Sqlx(other).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_maps_to_store_timeout() {
        let err = store_error(sqlx::Error::PoolTimedOut, Duration::from_secs(3));
        assert!(matches!(err, StoreError::Timeout(d) if d == Duration::from_secs(3)));

        let err = store_error(sqlx::Error::RowNotFound, Duration::from_secs(3));
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
