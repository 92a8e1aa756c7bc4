//! Database operations for `engagement_records`.

use chrono::{DateTime, Utc};
use postpulse_core::{AudienceBreakdown, EngagementRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `engagement_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EngagementRow {
    pub id: String,
    pub user_id: String,
    pub content_id: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub saves: i64,
    pub reach: i64,
    pub engagement_rate: Option<f64>,
    pub save_rate: Option<f64>,
    pub content_text: Option<String>,
    pub hashtags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub audience: Option<serde_json::Value>,
}

impl From<EngagementRow> for EngagementRecord {
    fn from(row: EngagementRow) -> Self {
        // A malformed audience document is treated as missing.
        let audience = row
            .audience
            .and_then(|v| serde_json::from_value::<AudienceBreakdown>(v).ok());

        Self {
            id: Some(row.id),
            user_id: row.user_id,
            content_id: row.content_id,
            likes: count(row.likes),
            comments: count(row.comments),
            shares: count(row.shares),
            saves: count(row.saves),
            reach: count(row.reach),
            engagement_rate: row.engagement_rate,
            save_rate: row.save_rate,
            content_text: row.content_text,
            hashtags: row.hashtags,
            published_at: row.published_at,
            recorded_at: row.recorded_at,
            audience,
        }
    }
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Every engagement record for a user, oldest first. No date filtering.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_engagement_records(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<EngagementRecord>, DbError> {
    let rows = sqlx::query_as::<_, EngagementRow>(
        "SELECT id, user_id, content_id, likes, comments, shares, saves, reach, \
                engagement_rate, save_rate, content_text, hashtags, \
                published_at, recorded_at, audience \
         FROM engagement_records \
         WHERE user_id = $1 \
         ORDER BY COALESCE(published_at, recorded_at) ASC NULLS LAST, id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EngagementRecord::from).collect())
}

/// Insert or replace one engagement record. A record without an id is
/// assigned a fresh UUID. Returns the stored id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails, or [`DbError::Document`] if
/// the audience breakdown cannot be serialized.
pub async fn upsert_engagement_record(
    pool: &PgPool,
    record: &EngagementRecord,
) -> Result<String, DbError> {
    let id = record
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let audience = record
        .audience
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    sqlx::query(
        "INSERT INTO engagement_records \
             (id, user_id, content_id, likes, comments, shares, saves, reach, \
              engagement_rate, save_rate, content_text, hashtags, \
              published_at, recorded_at, audience) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (id) DO UPDATE SET \
             user_id         = EXCLUDED.user_id, \
             content_id      = EXCLUDED.content_id, \
             likes           = EXCLUDED.likes, \
             comments        = EXCLUDED.comments, \
             shares          = EXCLUDED.shares, \
             saves           = EXCLUDED.saves, \
             reach           = EXCLUDED.reach, \
             engagement_rate = EXCLUDED.engagement_rate, \
             save_rate       = EXCLUDED.save_rate, \
             content_text    = EXCLUDED.content_text, \
             hashtags        = EXCLUDED.hashtags, \
             published_at    = EXCLUDED.published_at, \
             recorded_at     = EXCLUDED.recorded_at, \
             audience        = EXCLUDED.audience",
    )
    .bind(&id)
    .bind(&record.user_id)
    .bind(&record.content_id)
    .bind(column(record.likes))
    .bind(column(record.comments))
    .bind(column(record.shares))
    .bind(column(record.saves))
    .bind(column(record.reach))
    .bind(record.engagement_rate)
    .bind(record.save_rate)
    .bind(&record.content_text)
    .bind(&record.hashtags)
    .bind(record.published_at)
    .bind(record.recorded_at)
    .bind(audience)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Distinct users that have at least one engagement record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_users_with_engagement(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let users = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT user_id FROM engagement_records ORDER BY user_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
