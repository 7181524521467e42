use murmur_core::{Platform, Rotation, TagsFile};
use sqlx::PgPool;

use crate::DbError;

/// Append every tag in `tags` to its rotation list, skipping tags that are
/// already queued there.
///
/// Returns the number of tags newly queued. All inserts run inside a single
/// transaction; if any fails the batch is rolled back. A tag retired earlier
/// is queued again, starting from the newest page.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_tags(pool: &PgPool, tags: &TagsFile) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for rotation in [Rotation::History, Rotation::Hot] {
        for platform in Platform::ALL {
            for tag in tags.rotation_for(rotation, platform) {
                let result = sqlx::query(
                    "INSERT INTO harvest_tags (rotation, platform, tag, position) \
                     SELECT $1, $2, $3, COALESCE(MAX(position), 0) + 1 \
                     FROM harvest_tags WHERE rotation = $1 AND platform = $2 \
                     ON CONFLICT (rotation, platform, tag) DO NOTHING",
                )
                .bind(rotation.slug())
                .bind(platform.slug())
                .bind(tag.trim())
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() > 0 {
                    count += 1;
                }
            }
        }
    }

    tx.commit().await?;
    Ok(count)
}
