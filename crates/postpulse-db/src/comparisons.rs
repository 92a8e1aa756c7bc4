//! Database operations for `content_comparisons`.
//!
//! Comparison results are produced by a separate job; this crate only reads
//! them for the snapshot view and writes them for seeding and tests.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::DbError;

/// Comparison results for the given content ids, keyed by content id.
/// Ids with no stored result are absent from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_comparisons(
    pool: &PgPool,
    user_id: &str,
    content_ids: &[String],
) -> Result<HashMap<String, serde_json::Value>, DbError> {
    if content_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (String, serde_json::Value)>(
        "SELECT content_id, result \
         FROM content_comparisons \
         WHERE user_id = $1 AND content_id = ANY($2::text[])",
    )
    .bind(user_id)
    .bind(content_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Store or replace the comparison result for one content id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_comparison(
    pool: &PgPool,
    user_id: &str,
    content_id: &str,
    result: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO content_comparisons (user_id, content_id, result, computed_at) \
         VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (user_id, content_id) DO UPDATE SET \
             result      = EXCLUDED.result, \
             computed_at = NOW()",
    )
    .bind(user_id)
    .bind(content_id)
    .bind(result)
    .execute(pool)
    .await?;

    Ok(())
}
