//! Snapshot command handlers for the CLI.
//!
//! `regenerate` and `list` run against Postgres through the same service the
//! HTTP server uses. `preview` loads a JSON export into an in-memory store so
//! scoring can be inspected without a database.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use postpulse_analytics::{
    MemoryStore, RunRequest, RunSummary, Snapshot, SnapshotQuery, SnapshotService,
    SnapshotStatus,
};
use postpulse_core::{AppConfig, ContentRecord, EngagementRecord};
use postpulse_db::PgSnapshotStore;
use serde::{Deserialize, Serialize};

/// User id every preview record is scored under.
const PREVIEW_USER: &str = "preview";

/// Regenerate one user's snapshots and print the run summary as JSON.
///
/// # Errors
///
/// Returns an error if the run is rejected or a database read or write fails.
pub(crate) async fn run_regenerate(
    pool: sqlx::PgPool,
    config: &AppConfig,
    user_id: &str,
    days: Option<u32>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let service = SnapshotService::new(Arc::new(PgSnapshotStore::new(pool)))
        .with_batch_size(config.snapshot_batch_size)
        .with_default_window_days(config.snapshot_window_days);

    let request = RunRequest {
        user_id: user_id.to_string(),
        window_days: days,
        dry_run,
    };
    let summary = service.regenerate(&request, Utc::now()).await?;

    if dry_run {
        println!(
            "dry-run: {} posts scored ({} gold, {} negative, {} normal); nothing written",
            summary.processed, summary.gold_count, summary.negative_count, summary.normal_count
        );
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Print stored snapshots for a user, newest first.
///
/// # Errors
///
/// Returns an error if `status` is not a known status or the read fails.
pub(crate) async fn run_list(
    pool: sqlx::PgPool,
    user_id: &str,
    status: Option<&str>,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let status = status.map(str::parse::<SnapshotStatus>).transpose()?;
    let service = SnapshotService::new(Arc::new(PgSnapshotStore::new(pool)));
    let views = service
        .list(user_id, &SnapshotQuery { status, limit })
        .await?;

    if views.is_empty() {
        println!("no snapshots stored for {user_id}");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

/// Score the records in `input` offline and print summary plus snapshots.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the window is
/// zero days.
pub(crate) async fn run_preview(input: &Path, days: Option<u32>) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let report = preview(&raw, days, Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Shape of a preview export. Both lists are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PreviewInput {
    engagement: Vec<EngagementRecord>,
    content: Vec<ContentRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewReport {
    summary: RunSummary,
    snapshots: Vec<Snapshot>,
}

/// Run the full pipeline over parsed JSON using an in-memory store.
///
/// All records are scored as a single user: any `user_id` in the export is
/// replaced so mixed exports still form one population.
async fn preview(raw: &str, days: Option<u32>, now: DateTime<Utc>) -> anyhow::Result<PreviewReport> {
    let input: PreviewInput = serde_json::from_str(raw).context("invalid preview input")?;

    let engagement: Vec<EngagementRecord> = input
        .engagement
        .into_iter()
        .map(|record| EngagementRecord {
            user_id: PREVIEW_USER.to_string(),
            ..record
        })
        .collect();
    let content: Vec<ContentRecord> = input
        .content
        .into_iter()
        .map(|record| ContentRecord {
            user_id: PREVIEW_USER.to_string(),
            ..record
        })
        .collect();
    tracing::debug!(
        engagement = engagement.len(),
        content = content.len(),
        "loaded preview input"
    );

    let store = Arc::new(MemoryStore::with_records(engagement, content));
    let service = SnapshotService::new(Arc::clone(&store));
    let request = RunRequest {
        user_id: PREVIEW_USER.to_string(),
        window_days: days,
        dry_run: false,
    };
    let summary = service.regenerate(&request, now).await?;

    let mut snapshots = store.snapshots_for(PREVIEW_USER);
    snapshots.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.snapshot_id.cmp(&b.snapshot_id))
    });

    Ok(PreviewReport { summary, snapshots })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    const EXPORT: &str = r#"{
        "engagement": [
            {"id": "p1", "likes": 120, "saves": 40, "reach": 1000,
             "published_at": "2026-02-20T10:00:00Z", "content_id": "c1"},
            {"id": "p2", "likes": 10, "reach": 1000, "published_at": "2026-02-21T10:00:00Z"},
            {"id": "p3", "likes": 12, "saves": 1, "reach": 1100, "published_at": "2026-02-22T10:00:00Z"},
            {"id": "old", "likes": 999, "reach": 1000, "published_at": "2025-01-01T00:00:00Z"}
        ],
        "content": [
            {"id": "c1", "text": "Have you ever tried this?\n- one\n- two", "hashtags": ["growth"]}
        ]
    }"#;

    #[tokio::test]
    async fn preview_scores_records_inside_window() {
        let report = preview(EXPORT, Some(30), now()).await.expect("preview");

        assert_eq!(report.summary.processed, 3);
        assert_eq!(report.summary.window_days, 30);
        assert_eq!(report.snapshots.len(), 3);
        assert!(report.snapshots.iter().all(|s| s.user_id == PREVIEW_USER));
        assert!(report.snapshots.iter().all(|s| s.snapshot_id != "old"));
        assert_eq!(report.snapshots[0].snapshot_id, "p1");
        assert_eq!(report.snapshots[0].content_id.as_deref(), Some("c1"));
        assert!(report
            .snapshots
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score));
    }

    #[tokio::test]
    async fn preview_of_empty_export_processes_nothing() {
        let report = preview("{}", None, now()).await.expect("preview");
        assert_eq!(report.summary.processed, 0);
        assert!(report.snapshots.is_empty());
    }

    #[tokio::test]
    async fn preview_rejects_malformed_json() {
        assert!(preview("[not json", None, now()).await.is_err());
    }

    #[tokio::test]
    async fn preview_rejects_zero_window() {
        assert!(preview(EXPORT, Some(0), now()).await.is_err());
    }
}
