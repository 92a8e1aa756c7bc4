use std::collections::BTreeMap;

use chrono::{Duration, TimeZone};
use postpulse_core::{AudienceBreakdown, ContentRecord, EngagementRecord};
use serde_json::json;

use super::*;
use crate::memory::{BatchOp, MemoryStore};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap()
}

fn record(id: &str, likes: u64, saves: u64, reach: u64) -> EngagementRecord {
    EngagementRecord {
        id: Some(id.to_string()),
        user_id: "u1".to_string(),
        likes,
        saves,
        reach,
        published_at: Some(now() - Duration::days(3)),
        ..EngagementRecord::default()
    }
}

fn seeded(records: Vec<EngagementRecord>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_records(records, vec![]))
}

fn service(store: &Arc<MemoryStore>) -> SnapshotService<MemoryStore> {
    SnapshotService::new(Arc::clone(store))
}

fn spread() -> Vec<EngagementRecord> {
    vec![
        record("p1", 120, 40, 1000),
        record("p2", 10, 0, 1000),
        record("p3", 12, 1, 1100),
        record("p4", 11, 1, 900),
        record("p5", 1, 0, 3000),
    ]
}

// ---------------------------------------------------------------------------
// normalize_limit
// ---------------------------------------------------------------------------

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(-7)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

// ---------------------------------------------------------------------------
// compute_snapshots
// ---------------------------------------------------------------------------

#[test]
fn three_record_example_matches_expected_scores() {
    let records: Vec<LoadedRecord> = [(10, 100), (10, 200), (10, 300)]
        .iter()
        .enumerate()
        .map(|(i, &(likes, reach))| LoadedRecord {
            engagement: record(&format!("p{i}"), likes, 0, reach),
            content: None,
        })
        .collect();

    let snapshots = compute_snapshots(&records, &FeatureExtractor::default(), "u1", 90, now());

    assert_eq!(snapshots.len(), 3);
    let first = &snapshots[0];
    assert!((first.z_scores.engagement_rate - 1.12).abs() < 0.02);
    assert!((first.z_scores.reach + 1.0).abs() < 1e-9);
    assert!((first.score - 0.36).abs() < 0.01);
    assert_eq!(first.status, SnapshotStatus::Normal);
    assert!(snapshots.iter().all(|s| s.generated_at == now()));
    assert!(snapshots.iter().all(|s| s.window_days == 90));
}

#[test]
fn single_record_scores_zero() {
    let records = vec![LoadedRecord {
        engagement: record("only", 50, 5, 500),
        content: None,
    }];
    let snapshots = compute_snapshots(&records, &FeatureExtractor::default(), "u1", 30, now());
    assert_eq!(snapshots[0].score, 0.0);
    assert_eq!(snapshots[0].status, SnapshotStatus::Normal);
}

fn loaded(id: Option<&str>, content_id: Option<&str>) -> LoadedRecord {
    let mut engagement = record("unused", 10, 1, 100);
    engagement.id = id.map(str::to_string);
    engagement.content_id = content_id.map(str::to_string);
    LoadedRecord {
        engagement,
        content: None,
    }
}

#[test]
fn snapshot_key_prefers_engagement_then_content_id() {
    let mut keys = SnapshotKeys::new(&[]);
    assert_eq!(keys.assign(Some("e1"), Some("c1")), "e1");
    assert_eq!(keys.assign(None, Some("c1")), "c1");
    assert_eq!(keys.assign(Some("  "), Some("c2")), "c2");
    let generated = keys.assign(None, None);
    assert!(uuid::Uuid::parse_str(&generated).is_ok());
    assert_ne!(generated, keys.assign(None, None));
}

#[test]
fn records_sharing_a_content_id_get_distinct_snapshot_ids() {
    let records = vec![loaded(None, Some("c1")), loaded(Some(" "), Some("c1"))];
    let snapshots = compute_snapshots(&records, &FeatureExtractor::default(), "u1", 90, now());

    assert_eq!(snapshots[0].snapshot_id, "c1");
    assert_ne!(snapshots[1].snapshot_id, "c1");
    assert!(uuid::Uuid::parse_str(&snapshots[1].snapshot_id).is_ok());
}

#[test]
fn content_fallback_never_takes_another_records_id() {
    // The blank-id record comes first, but "c9" belongs to the second record.
    let records = vec![loaded(None, Some("c9")), loaded(Some("c9"), None)];
    let snapshots = compute_snapshots(&records, &FeatureExtractor::default(), "u1", 90, now());

    assert_ne!(snapshots[0].snapshot_id, "c9");
    assert_eq!(snapshots[1].snapshot_id, "c9");
}

#[tokio::test]
async fn colliding_keys_still_store_one_snapshot_per_record() {
    let store = seeded(vec![]);
    for engagement in [
        loaded(None, Some("c1")).engagement,
        loaded(None, Some("c1")).engagement,
        loaded(Some("c9"), None).engagement,
        loaded(Some(""), Some("c9")).engagement,
    ] {
        store.push_engagement(engagement);
    }

    let summary = service(&store)
        .regenerate(&RunRequest::new("u1"), now())
        .await
        .expect("run");

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.saved_count, 4);
    assert_eq!(store.snapshots_for("u1").len(), 4);
}

#[test]
fn snapshot_carries_content_features_and_persona() {
    let mut engagement = record("p1", 10, 1, 100);
    engagement.content_id = Some("c1".to_string());
    engagement.audience = Some(AudienceBreakdown {
        gender: BTreeMap::from([("female".to_string(), 61.0), ("male".to_string(), 39.0)]),
        age: BTreeMap::from([("25-34".to_string(), 48.5)]),
    });
    let content = ContentRecord {
        id: "c1".to_string(),
        user_id: "u1".to_string(),
        text: "Did you know this?\n- tip one\n- tip two\nSave this post!".to_string(),
        ..ContentRecord::default()
    };
    let records = vec![LoadedRecord {
        engagement,
        content: Some(content),
    }];

    let snapshot = &compute_snapshots(&records, &FeatureExtractor::default(), "u1", 90, now())[0];

    assert_eq!(snapshot.content_id.as_deref(), Some("c1"));
    assert_eq!(snapshot.features.bullet_count, 2);
    assert_eq!(
        snapshot.persona.top_gender.as_ref().map(|s| s.label.as_str()),
        Some("female")
    );
    assert_eq!(snapshot.persona.summary.len(), 2);
}

// ---------------------------------------------------------------------------
// regenerate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn regenerate_tallies_sum_to_processed() {
    let store = seeded(spread());
    let summary = service(&store)
        .regenerate(&RunRequest::new("u1"), now())
        .await
        .expect("run");

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.processed, 5);
    assert_eq!(
        summary.gold_count + summary.negative_count + summary.normal_count,
        summary.processed
    );
    assert!(summary.gold_count >= 1);
    assert_eq!(summary.saved_count, 5);
    assert_eq!(summary.deleted_count, 0);
    assert_eq!(summary.window_days, DEFAULT_SNAPSHOT_WINDOW_DAYS);
}

#[tokio::test]
async fn regenerate_is_idempotent_for_fixed_input() {
    let store = seeded(spread());
    let svc = service(&store);

    let first = svc.regenerate(&RunRequest::new("u1"), now()).await.expect("first");
    let after_first = store.snapshots_for("u1");
    let second = svc.regenerate(&RunRequest::new("u1"), now()).await.expect("second");
    let after_second = store.snapshots_for("u1");

    assert_eq!(after_first, after_second);
    assert_eq!(first.gold_count, second.gold_count);
    assert_eq!(second.deleted_count, 5);
    assert_eq!(second.saved_count, 5);
}

#[tokio::test]
async fn dry_run_reports_tallies_and_writes_nothing() {
    let store = seeded(spread());
    let request = RunRequest {
        dry_run: true,
        ..RunRequest::new("u1")
    };

    let summary = service(&store).regenerate(&request, now()).await.expect("dry run");

    assert!(summary.dry_run);
    assert_eq!(summary.processed, 5);
    assert_eq!(
        summary.gold_count + summary.negative_count + summary.normal_count,
        5
    );
    assert_eq!(summary.saved_count, 0);
    assert_eq!(summary.deleted_count, 0);
    assert!(store.batches().is_empty());
    assert!(store.snapshots_for("u1").is_empty());
}

#[tokio::test]
async fn empty_window_leaves_existing_snapshots() {
    let store = seeded(spread());
    let svc = service(&store);
    svc.regenerate(&RunRequest::new("u1"), now()).await.expect("seed");
    let batches = store.batches().len();

    // 200 days later nothing is inside a 30-day window.
    let later = now() + Duration::days(200);
    let request = RunRequest {
        window_days: Some(30),
        ..RunRequest::new("u1")
    };
    let summary = svc.regenerate(&request, later).await.expect("empty run");

    assert_eq!(summary.outcome, RunOutcome::NoRecords);
    assert_eq!(summary.processed, 0);
    assert_eq!(store.batches().len(), batches);
    assert_eq!(store.snapshots_for("u1").len(), 5);
}

#[tokio::test]
async fn zero_window_is_rejected() {
    let store = seeded(spread());
    let request = RunRequest {
        window_days: Some(0),
        ..RunRequest::new("u1")
    };
    let err = service(&store).regenerate(&request, now()).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidWindow(0)));
}

#[tokio::test]
async fn concurrent_run_for_same_user_is_refused() {
    let store = seeded(spread());
    let guard = UserRunGuard::new();
    let svc = service(&store).with_guard(guard.clone());

    let _held = guard.try_acquire("u1").expect("hold");
    let err = svc.regenerate(&RunRequest::new("u1"), now()).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::RunInProgress(ref u) if u == "u1"));

    // Other users proceed.
    let summary = svc.regenerate(&RunRequest::new("u2"), now()).await.expect("u2");
    assert_eq!(summary.outcome, RunOutcome::NoRecords);
}

#[tokio::test]
async fn guard_is_released_after_failed_run() {
    let store = seeded(spread());
    store.fail_upserts(true);
    let svc = service(&store);

    assert!(svc.regenerate(&RunRequest::new("u1"), now()).await.is_err());

    store.fail_upserts(false);
    svc.regenerate(&RunRequest::new("u1"), now())
        .await
        .expect("retry succeeds");
}

#[tokio::test]
async fn small_batch_size_splits_writes() {
    let store = seeded(spread());
    service(&store)
        .with_batch_size(2)
        .regenerate(&RunRequest::new("u1"), now())
        .await
        .expect("run");
    assert_eq!(
        store.batches(),
        vec![BatchOp::Upsert(2), BatchOp::Upsert(2), BatchOp::Upsert(1)]
    );
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_filters_by_status_and_merges_comparisons() {
    let mut records = spread();
    records[0].content_id = Some("c-gold".to_string());
    let store = seeded(records);
    store.insert_comparison("u1", "c-gold", json!({ "rank": 1 }));
    let svc = service(&store);
    svc.regenerate(&RunRequest::new("u1"), now()).await.expect("run");

    let gold = svc
        .list(
            "u1",
            &SnapshotQuery {
                status: Some(SnapshotStatus::Gold),
                limit: None,
            },
        )
        .await
        .expect("list");

    assert!(!gold.is_empty());
    assert!(gold.iter().all(|v| v.snapshot.status == SnapshotStatus::Gold));
    let top = gold
        .iter()
        .find(|v| v.snapshot.snapshot_id == "p1")
        .expect("p1 is gold");
    assert_eq!(top.comparison, Some(json!({ "rank": 1 })));
}

#[tokio::test]
async fn list_respects_limit() {
    let store = seeded(spread());
    let svc = service(&store);
    svc.regenerate(&RunRequest::new("u1"), now()).await.expect("run");

    let views = svc
        .list(
            "u1",
            &SnapshotQuery {
                status: None,
                limit: Some(2),
            },
        )
        .await
        .expect("list");
    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|v| v.comparison.is_none()));
}
