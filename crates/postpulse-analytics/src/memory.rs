//! In-process [`SnapshotStore`] used by tests and offline previews.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use postpulse_core::{ContentRecord, EngagementRecord};
use serde_json::Value;

use crate::error::AnalyticsError;
use crate::snapshot::{Snapshot, SnapshotStatus, StoredSnapshot};
use crate::store::SnapshotStore;

/// One committed batch, recorded in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Delete(usize),
    Upsert(usize),
}

#[derive(Debug, Default)]
struct MemoryState {
    engagement: Vec<EngagementRecord>,
    content: Vec<ContentRecord>,
    snapshots: BTreeMap<(String, String), StoredSnapshot>,
    comparisons: HashMap<(String, String), Value>,
    batches: Vec<BatchOp>,
    fail_upserts: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with source records.
    #[must_use]
    pub fn with_records(engagement: Vec<EngagementRecord>, content: Vec<ContentRecord>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            state.engagement = engagement;
            state.content = content;
        }
        store
    }

    pub fn push_engagement(&self, record: EngagementRecord) {
        self.lock().engagement.push(record);
    }

    pub fn insert_comparison(&self, user_id: &str, content_id: &str, result: Value) {
        self.lock()
            .comparisons
            .insert((user_id.to_string(), content_id.to_string()), result);
    }

    /// Every batch committed so far.
    #[must_use]
    pub fn batches(&self) -> Vec<BatchOp> {
        self.lock().batches.clone()
    }

    /// Stored snapshots for a user, in id order.
    #[must_use]
    pub fn snapshots_for(&self, user_id: &str) -> Vec<Snapshot> {
        self.lock()
            .snapshots
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, stored)| stored.snapshot.clone())
            .collect()
    }

    /// Make every subsequent upsert fail, to exercise partial-failure paths.
    pub fn fail_upserts(&self, fail: bool) {
        self.lock().fail_upserts = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("simulated upsert failure")]
struct SimulatedFailure;

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn list_engagement_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<EngagementRecord>, AnalyticsError> {
        Ok(self
            .lock()
            .engagement
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_content_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<ContentRecord>, AnalyticsError> {
        Ok(self
            .lock()
            .content
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_snapshot_ids(&self, user_id: &str) -> Result<Vec<String>, AnalyticsError> {
        Ok(self
            .lock()
            .snapshots
            .keys()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn delete_snapshots(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<usize, AnalyticsError> {
        let mut state = self.lock();
        let removed = ids
            .iter()
            .filter(|id| {
                state
                    .snapshots
                    .remove(&(user_id.to_string(), (*id).clone()))
                    .is_some()
            })
            .count();
        state.batches.push(BatchOp::Delete(ids.len()));
        Ok(removed)
    }

    async fn upsert_snapshots(
        &self,
        user_id: &str,
        snapshots: &[Snapshot],
    ) -> Result<usize, AnalyticsError> {
        let mut state = self.lock();
        if state.fail_upserts {
            return Err(AnalyticsError::store("upsert_snapshots", SimulatedFailure));
        }
        let now = Utc::now();
        for snapshot in snapshots {
            state.snapshots.insert(
                (user_id.to_string(), snapshot.snapshot_id.clone()),
                StoredSnapshot {
                    snapshot: snapshot.clone(),
                    updated_at: now,
                },
            );
        }
        state.batches.push(BatchOp::Upsert(snapshots.len()));
        Ok(snapshots.len())
    }

    async fn list_snapshots(
        &self,
        user_id: &str,
        status: Option<SnapshotStatus>,
        limit: usize,
    ) -> Result<Vec<StoredSnapshot>, AnalyticsError> {
        let state = self.lock();
        let mut rows: Vec<StoredSnapshot> = state
            .snapshots
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, stored)| stored)
            .filter(|stored| status.map_or(true, |s| stored.snapshot.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.snapshot
                .generated_at
                .cmp(&a.snapshot.generated_at)
                .then_with(|| a.snapshot.snapshot_id.cmp(&b.snapshot.snapshot_id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn list_comparisons(
        &self,
        user_id: &str,
        content_ids: &[String],
    ) -> Result<HashMap<String, Value>, AnalyticsError> {
        let state = self.lock();
        Ok(content_ids
            .iter()
            .filter_map(|id| {
                state
                    .comparisons
                    .get(&(user_id.to_string(), id.clone()))
                    .map(|v| (id.clone(), v.clone()))
            })
            .collect())
    }
}
