//! Database operations for `content_records`.

use chrono::{DateTime, Utc};
use postpulse_core::ContentRecord;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `content_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentRow {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub hashtags: Vec<String>,
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ContentRow> for ContentRecord {
    fn from(row: ContentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            text: row.text,
            hashtags: row.hashtags,
            content_type: row.content_type,
            created_at: row.created_at,
        }
    }
}

/// Every content record owned by a user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_records(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ContentRecord>, DbError> {
    let rows = sqlx::query_as::<_, ContentRow>(
        "SELECT id, user_id, text, hashtags, content_type, created_at \
         FROM content_records \
         WHERE user_id = $1 \
         ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ContentRecord::from).collect())
}

/// Insert or replace one content record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_content_record(pool: &PgPool, record: &ContentRecord) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO content_records (id, user_id, text, hashtags, content_type, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (id) DO UPDATE SET \
             user_id      = EXCLUDED.user_id, \
             text         = EXCLUDED.text, \
             hashtags     = EXCLUDED.hashtags, \
             content_type = EXCLUDED.content_type, \
             created_at   = EXCLUDED.created_at",
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.text)
    .bind(&record.hashtags)
    .bind(&record.content_type)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
