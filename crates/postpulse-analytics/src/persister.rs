//! Replace a user's stored snapshot set in bounded batches.

use postpulse_core::MAX_SNAPSHOT_BATCH_SIZE;

use crate::error::AnalyticsError;
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

/// Counts written by one persist call. Both are zero on a dry run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub deleted: usize,
    pub saved: usize,
}

/// Clamp a configured batch size into `1..=MAX_SNAPSHOT_BATCH_SIZE`.
#[must_use]
pub fn effective_batch_size(requested: usize) -> usize {
    requested.clamp(1, MAX_SNAPSHOT_BATCH_SIZE)
}

/// Delete every stored snapshot for `user_id`, then write `snapshots`.
///
/// Deletes and writes are issued in chunks of at most `batch_size` (clamped
/// to the store limit), each committed on its own. The two phases are not
/// atomic together: a failure during the write phase leaves the collection
/// partially rebuilt, and the next successful run repairs it.
///
/// With `dry_run` the existing ids are still read so the log line is
/// accurate, but nothing is deleted or written.
///
/// # Errors
///
/// Returns the first [`AnalyticsError::Store`] raised by the store. Batches
/// committed before the failure stay committed.
pub async fn persist_snapshots<S>(
    store: &S,
    user_id: &str,
    snapshots: &[Snapshot],
    batch_size: usize,
    dry_run: bool,
) -> Result<PersistOutcome, AnalyticsError>
where
    S: SnapshotStore + ?Sized,
{
    let batch_size = effective_batch_size(batch_size);
    let existing = store.list_snapshot_ids(user_id).await?;

    if dry_run {
        tracing::info!(
            user_id,
            would_delete = existing.len(),
            would_save = snapshots.len(),
            batch_size,
            "dry run: skipping snapshot writes"
        );
        return Ok(PersistOutcome::default());
    }

    let mut outcome = PersistOutcome::default();

    for (batch, ids) in existing.chunks(batch_size).enumerate() {
        let removed = store.delete_snapshots(user_id, ids).await?;
        outcome.deleted += removed;
        tracing::debug!(user_id, batch, removed, "snapshot delete batch committed");
    }

    for (batch, chunk) in snapshots.chunks(batch_size).enumerate() {
        let written = store.upsert_snapshots(user_id, chunk).await.map_err(|e| {
            tracing::error!(
                user_id,
                batch,
                saved_so_far = outcome.saved,
                error = %e,
                "snapshot write batch failed"
            );
            e
        })?;
        outcome.saved += written;
        tracing::debug!(user_id, batch, written, "snapshot write batch committed");
    }

    tracing::info!(
        user_id,
        deleted = outcome.deleted,
        saved = outcome.saved,
        batch_size,
        "snapshot set replaced"
    );

    Ok(outcome)
}
