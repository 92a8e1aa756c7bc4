//! [`SnapshotStore`] backed by PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use postpulse_analytics::{AnalyticsError, Snapshot, SnapshotStatus, SnapshotStore, StoredSnapshot};
use postpulse_core::{ContentRecord, EngagementRecord};
use sqlx::PgPool;

use crate::{comparisons, content, engagement, snapshots, DbError};

#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_error(operation: &'static str) -> impl FnOnce(DbError) -> AnalyticsError {
    move |e| AnalyticsError::store(operation, e)
}

fn to_count(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn list_engagement_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<EngagementRecord>, AnalyticsError> {
        engagement::list_engagement_records(&self.pool, user_id)
            .await
            .map_err(store_error("list_engagement_records"))
    }

    async fn list_content_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<ContentRecord>, AnalyticsError> {
        content::list_content_records(&self.pool, user_id)
            .await
            .map_err(store_error("list_content_records"))
    }

    async fn list_snapshot_ids(&self, user_id: &str) -> Result<Vec<String>, AnalyticsError> {
        snapshots::list_snapshot_ids(&self.pool, user_id)
            .await
            .map_err(store_error("list_snapshot_ids"))
    }

    async fn delete_snapshots(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<usize, AnalyticsError> {
        snapshots::delete_snapshots(&self.pool, user_id, ids)
            .await
            .map(to_count)
            .map_err(store_error("delete_snapshots"))
    }

    async fn upsert_snapshots(
        &self,
        user_id: &str,
        batch: &[Snapshot],
    ) -> Result<usize, AnalyticsError> {
        snapshots::upsert_snapshots(&self.pool, user_id, batch)
            .await
            .map(to_count)
            .map_err(store_error("upsert_snapshots"))
    }

    async fn list_snapshots(
        &self,
        user_id: &str,
        status: Option<SnapshotStatus>,
        limit: usize,
    ) -> Result<Vec<StoredSnapshot>, AnalyticsError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        snapshots::list_snapshots(&self.pool, user_id, status, limit)
            .await
            .map_err(store_error("list_snapshots"))
    }

    async fn list_comparisons(
        &self,
        user_id: &str,
        content_ids: &[String],
    ) -> Result<HashMap<String, serde_json::Value>, AnalyticsError> {
        comparisons::list_comparisons(&self.pool, user_id, content_ids)
            .await
            .map_err(store_error("list_comparisons"))
    }
}
