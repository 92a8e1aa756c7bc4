//! Storage seam for the snapshot pipeline.
//!
//! Implementors: `PgSnapshotStore` (postpulse-db, PostgreSQL via sqlx) and
//! [`MemoryStore`](crate::memory::MemoryStore) for tests and offline previews.
//! Each `delete_snapshots` / `upsert_snapshots` call is one committed batch;
//! batching itself is the persister's job.

use std::collections::HashMap;

use async_trait::async_trait;
use postpulse_core::{ContentRecord, EngagementRecord};
use serde_json::Value;

use crate::error::AnalyticsError;
use crate::snapshot::{Snapshot, SnapshotStatus, StoredSnapshot};

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    // --- Source records ---

    /// All engagement records for a user. No date filtering.
    async fn list_engagement_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<EngagementRecord>, AnalyticsError>;

    /// All content records for a user.
    async fn list_content_records(&self, user_id: &str)
        -> Result<Vec<ContentRecord>, AnalyticsError>;

    // --- Snapshot collection ---

    /// Ids of every snapshot currently stored for the user.
    async fn list_snapshot_ids(&self, user_id: &str) -> Result<Vec<String>, AnalyticsError>;

    /// Delete one batch of snapshots and commit. Returns the number removed.
    async fn delete_snapshots(&self, user_id: &str, ids: &[String])
        -> Result<usize, AnalyticsError>;

    /// Insert-or-merge one batch of snapshots keyed by `snapshot_id` and
    /// commit. Returns the number written.
    async fn upsert_snapshots(
        &self,
        user_id: &str,
        snapshots: &[Snapshot],
    ) -> Result<usize, AnalyticsError>;

    /// Stored snapshots, newest first, optionally filtered by status.
    async fn list_snapshots(
        &self,
        user_id: &str,
        status: Option<SnapshotStatus>,
        limit: usize,
    ) -> Result<Vec<StoredSnapshot>, AnalyticsError>;

    // --- Collaborator data ---

    /// Externally computed comparison results keyed by content id.
    async fn list_comparisons(
        &self,
        user_id: &str,
        content_ids: &[String],
    ) -> Result<HashMap<String, Value>, AnalyticsError>;
}
