//! Run orchestration: load, score, annotate, persist, and read back.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use postpulse_core::{DEFAULT_SNAPSHOT_WINDOW_DAYS, MAX_SNAPSHOT_BATCH_SIZE};
use serde::Deserialize;

use crate::error::AnalyticsError;
use crate::features::{FeatureExtractor, PostText};
use crate::guard::UserRunGuard;
use crate::loader::{load_window, LoadedRecord};
use crate::metrics::{normalize, MetricBundle, PopulationStatistics};
use crate::persister::{effective_batch_size, persist_snapshots};
use crate::persona::build_persona_insight;
use crate::scorer::{metric_deltas, score_bundle};
use crate::snapshot::{
    RunOutcome, RunSummary, Snapshot, SnapshotStatus, SnapshotView, SourceContent,
};
use crate::store::SnapshotStore;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;

/// One regeneration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub user_id: String,
    /// Falls back to the service default when `None`.
    pub window_days: Option<u32>,
    pub dry_run: bool,
}

impl RunRequest {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            window_days: None,
            dry_run: false,
        }
    }
}

/// Read-side filters for stored snapshots.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotQuery {
    pub status: Option<SnapshotStatus>,
    pub limit: Option<i64>,
}

/// Default to 50 rows, never fewer than 1 or more than 200.
#[must_use]
pub fn normalize_limit(limit: Option<i64>) -> usize {
    let clamped = limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    usize::try_from(clamped).unwrap_or(1)
}

/// Score every loaded record against the population of the same set and
/// assemble its snapshot document.
///
/// Pure: no I/O, and `now` is stamped on every snapshot as `generated_at`.
#[must_use]
pub fn compute_snapshots(
    records: &[LoadedRecord],
    extractor: &FeatureExtractor,
    user_id: &str,
    window_days: u32,
    now: DateTime<Utc>,
) -> Vec<Snapshot> {
    let bundles: Vec<MetricBundle> = records.iter().map(|r| normalize(&r.engagement)).collect();
    let stats = PopulationStatistics::from_bundles(&bundles);
    let mut keys = SnapshotKeys::new(records);

    records
        .iter()
        .zip(&bundles)
        .map(|(record, bundle)| {
            let score = score_bundle(bundle, &stats);
            let content = SourceContent::resolve(&record.engagement, record.content.as_ref());
            let features = extractor.extract(&PostText::new(&content.text, &content.hashtags));
            let engagement_id = record.engagement.id.clone();
            let content_id = record
                .engagement
                .content_id
                .clone()
                .or_else(|| record.content.as_ref().map(|c| c.id.clone()));

            Snapshot {
                snapshot_id: keys.assign(engagement_id.as_deref(), content_id.as_deref()),
                user_id: user_id.to_string(),
                engagement_id,
                content_id,
                status: score.status,
                score: score.composite,
                z_scores: score.z_scores,
                metrics: *bundle,
                deltas: metric_deltas(bundle, &stats),
                persona: build_persona_insight(record.engagement.audience.as_ref()),
                features,
                content,
                window_days,
                generated_at: now,
            }
        })
        .collect()
}

/// Assigns one distinct snapshot id per record within a run.
///
/// Every non-blank engagement id is reserved up front, so a content-id
/// fallback can never claim an id another record owns.
struct SnapshotKeys {
    reserved: HashSet<String>,
    assigned: HashSet<String>,
}

impl SnapshotKeys {
    fn new(records: &[LoadedRecord]) -> Self {
        Self {
            reserved: records
                .iter()
                .filter_map(|r| r.engagement.id.as_deref())
                .filter(|id| !id.trim().is_empty())
                .map(str::to_string)
                .collect(),
            assigned: HashSet::with_capacity(records.len()),
        }
    }

    /// Engagement id, else content id, else a fresh random id. Blank or
    /// already-taken candidates are skipped.
    fn assign(&mut self, engagement_id: Option<&str>, content_id: Option<&str>) -> String {
        let present = |id: &&str| !id.trim().is_empty();

        if let Some(id) = engagement_id.filter(present) {
            if self.assigned.insert(id.to_string()) {
                return id.to_string();
            }
        }
        if let Some(id) = content_id.filter(present) {
            if !self.reserved.contains(id) && self.assigned.insert(id.to_string()) {
                return id.to_string();
            }
        }
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.assigned.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Entry point for regenerating and reading a user's snapshots.
pub struct SnapshotService<S: ?Sized> {
    store: Arc<S>,
    extractor: Arc<FeatureExtractor>,
    guard: UserRunGuard,
    batch_size: usize,
    default_window_days: u32,
}

impl<S: ?Sized> Clone for SnapshotService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            guard: self.guard.clone(),
            batch_size: self.batch_size,
            default_window_days: self.default_window_days,
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for SnapshotService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotService")
            .field("extractor", &self.extractor)
            .field("batch_size", &self.batch_size)
            .field("default_window_days", &self.default_window_days)
            .finish_non_exhaustive()
    }
}

impl<S> SnapshotService<S>
where
    S: SnapshotStore + ?Sized,
{
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            extractor: Arc::new(FeatureExtractor::default()),
            guard: UserRunGuard::new(),
            batch_size: MAX_SNAPSHOT_BATCH_SIZE,
            default_window_days: DEFAULT_SNAPSHOT_WINDOW_DAYS,
        }
    }

    /// Clamped into `1..=MAX_SNAPSHOT_BATCH_SIZE`.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = effective_batch_size(batch_size);
        self
    }

    #[must_use]
    pub fn with_default_window_days(mut self, days: u32) -> Self {
        self.default_window_days = days;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Share a run guard with other services in the same process.
    #[must_use]
    pub fn with_guard(mut self, guard: UserRunGuard) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn default_window_days(&self) -> u32 {
        self.default_window_days
    }

    /// Recompute and replace the user's snapshot set for the trailing window.
    ///
    /// An empty window returns a `no_records` summary and leaves stored
    /// snapshots untouched. A dry run computes everything, reports accurate
    /// status tallies, and writes nothing.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::InvalidWindow`] if the window is zero days.
    /// - [`AnalyticsError::RunInProgress`] if a run for the same user is
    ///   already in flight in this process.
    /// - [`AnalyticsError::Store`] if a read or write fails.
    pub async fn regenerate(
        &self,
        request: &RunRequest,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, AnalyticsError> {
        let user_id = request.user_id.as_str();
        let window_days = request.window_days.unwrap_or(self.default_window_days);
        if window_days == 0 {
            return Err(AnalyticsError::InvalidWindow(window_days));
        }

        let _permit = self
            .guard
            .try_acquire(user_id)
            .ok_or_else(|| AnalyticsError::RunInProgress(user_id.to_string()))?;

        let records = load_window(self.store.as_ref(), user_id, window_days, now).await?;
        if records.is_empty() {
            tracing::info!(user_id, window_days, "no engagement records in window");
            return Ok(RunSummary::nothing_processed(
                user_id,
                window_days,
                request.dry_run,
            ));
        }

        let snapshots = compute_snapshots(&records, &self.extractor, user_id, window_days, now);
        let count = |status: SnapshotStatus| snapshots.iter().filter(|s| s.status == status).count();
        let gold_count = count(SnapshotStatus::Gold);
        let negative_count = count(SnapshotStatus::Negative);
        let normal_count = count(SnapshotStatus::Normal);

        let outcome = persist_snapshots(
            self.store.as_ref(),
            user_id,
            &snapshots,
            self.batch_size,
            request.dry_run,
        )
        .await?;

        tracing::info!(
            user_id,
            window_days,
            dry_run = request.dry_run,
            processed = snapshots.len(),
            gold_count,
            negative_count,
            normal_count,
            "snapshot run complete"
        );

        Ok(RunSummary {
            user_id: user_id.to_string(),
            window_days,
            dry_run: request.dry_run,
            outcome: RunOutcome::Completed,
            processed: snapshots.len(),
            gold_count,
            negative_count,
            normal_count,
            deleted_count: outcome.deleted,
            saved_count: outcome.saved,
        })
    }

    /// Stored snapshots, newest first, each merged with its comparison
    /// result when one exists for the same content id.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Store`] if a read fails.
    pub async fn list(
        &self,
        user_id: &str,
        query: &SnapshotQuery,
    ) -> Result<Vec<SnapshotView>, AnalyticsError> {
        let limit = normalize_limit(query.limit);
        let stored = self.store.list_snapshots(user_id, query.status, limit).await?;

        let content_ids: Vec<String> = stored
            .iter()
            .filter_map(|s| s.snapshot.content_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let comparisons = if content_ids.is_empty() {
            std::collections::HashMap::new()
        } else {
            self.store.list_comparisons(user_id, &content_ids).await?
        };

        Ok(stored
            .into_iter()
            .map(|s| {
                let comparison = s
                    .snapshot
                    .content_id
                    .as_ref()
                    .and_then(|id| comparisons.get(id).cloned());
                SnapshotView {
                    snapshot: s.snapshot,
                    comparison,
                    updated_at: s.updated_at,
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
