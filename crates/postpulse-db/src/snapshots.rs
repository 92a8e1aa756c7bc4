//! Database operations for `post_snapshots`.
//!
//! The full snapshot document is stored as JSONB; `status`, `score`,
//! `content_id` and `generated_at` are lifted into columns for filtering
//! and ordering.

use chrono::{DateTime, Utc};
use postpulse_analytics::{Snapshot, SnapshotStatus, StoredSnapshot};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `post_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub user_id: String,
    pub snapshot_id: String,
    pub content_id: Option<String>,
    pub status: String,
    pub score: Decimal,
    pub document: serde_json::Value,
    pub generated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SnapshotRow {
    /// Decode the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Document`] if the JSONB no longer matches the
    /// snapshot shape.
    pub fn into_stored(self) -> Result<StoredSnapshot, DbError> {
        let snapshot: Snapshot = serde_json::from_value(self.document)?;
        Ok(StoredSnapshot {
            snapshot,
            updated_at: self.updated_at,
        })
    }
}

/// Scores are already rounded to 3 decimals; NUMERIC(10,3) keeps them exact.
fn score_column(score: f64) -> Decimal {
    Decimal::from_f64(score)
        .map(|d| d.round_dp(3))
        .unwrap_or(Decimal::ZERO)
}

/// Ids of every snapshot stored for the user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_snapshot_ids(pool: &PgPool, user_id: &str) -> Result<Vec<String>, DbError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT snapshot_id FROM post_snapshots WHERE user_id = $1 ORDER BY snapshot_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Delete one batch of snapshots. The statement commits on its own.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_snapshots(
    pool: &PgPool,
    user_id: &str,
    snapshot_ids: &[String],
) -> Result<u64, DbError> {
    if snapshot_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "DELETE FROM post_snapshots WHERE user_id = $1 AND snapshot_id = ANY($2::text[])",
    )
    .bind(user_id)
    .bind(snapshot_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Insert-or-merge one batch of snapshots inside a single transaction.
///
/// Uses one `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT` so the whole batch
/// is written in one round-trip.
///
/// # Errors
///
/// Returns [`DbError::Document`] if a snapshot cannot be serialized, or
/// [`DbError::Sqlx`] if the write or commit fails. Nothing from the batch is
/// kept on error.
pub async fn upsert_snapshots(
    pool: &PgPool,
    user_id: &str,
    snapshots: &[Snapshot],
) -> Result<u64, DbError> {
    if snapshots.is_empty() {
        return Ok(0);
    }

    let mut snapshot_ids: Vec<String> = Vec::with_capacity(snapshots.len());
    let mut content_ids: Vec<Option<String>> = Vec::with_capacity(snapshots.len());
    let mut statuses: Vec<String> = Vec::with_capacity(snapshots.len());
    let mut scores: Vec<Decimal> = Vec::with_capacity(snapshots.len());
    let mut documents: Vec<serde_json::Value> = Vec::with_capacity(snapshots.len());
    let mut generated_ats: Vec<DateTime<Utc>> = Vec::with_capacity(snapshots.len());

    for snapshot in snapshots {
        snapshot_ids.push(snapshot.snapshot_id.clone());
        content_ids.push(snapshot.content_id.clone());
        statuses.push(snapshot.status.as_str().to_string());
        scores.push(score_column(snapshot.score));
        documents.push(serde_json::to_value(snapshot)?);
        generated_ats.push(snapshot.generated_at);
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO post_snapshots \
             (user_id, snapshot_id, content_id, status, score, document, generated_at) \
         SELECT $1, * FROM UNNEST(\
              $2::text[], $3::text[], $4::text[], $5::numeric[], $6::jsonb[], $7::timestamptz[]) \
         ON CONFLICT (user_id, snapshot_id) DO UPDATE SET \
             content_id   = EXCLUDED.content_id, \
             status       = EXCLUDED.status, \
             score        = EXCLUDED.score, \
             document     = EXCLUDED.document, \
             generated_at = EXCLUDED.generated_at, \
             updated_at   = NOW()",
    )
    .bind(user_id)
    .bind(&snapshot_ids)
    .bind(&content_ids)
    .bind(&statuses)
    .bind(&scores)
    .bind(&documents)
    .bind(&generated_ats)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(result.rows_affected())
}

/// Stored snapshots for a user, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Document`] if a
/// stored document cannot be decoded.
pub async fn list_snapshots(
    pool: &PgPool,
    user_id: &str,
    status: Option<SnapshotStatus>,
    limit: i64,
) -> Result<Vec<StoredSnapshot>, DbError> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT user_id, snapshot_id, content_id, status, score, document, \
                generated_at, updated_at \
         FROM post_snapshots \
         WHERE user_id = $1 \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY generated_at DESC, snapshot_id ASC \
         LIMIT $3",
    )
    .bind(user_id)
    .bind(status.map(SnapshotStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SnapshotRow::into_stored).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_column_keeps_three_decimals() {
        assert_eq!(score_column(1.23456), Decimal::new(1235, 3));
        assert_eq!(score_column(-0.5), Decimal::new(-5, 1));
        assert_eq!(score_column(f64::NAN), Decimal::ZERO);
    }
}
