//! Record loading for one user's trailing window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use postpulse_core::{ContentRecord, EngagementRecord};

use crate::error::AnalyticsError;
use crate::store::SnapshotStore;

/// An engagement record joined with its content record, if one is linked.
#[derive(Debug, Clone)]
pub struct LoadedRecord {
    pub engagement: EngagementRecord,
    pub content: Option<ContentRecord>,
}

/// Load a user's engagement records for the window ending at `now`, joined
/// with their content records.
///
/// Both reads are issued concurrently. Date filtering happens after the
/// fetch: a record whose effective date is before the window start is
/// dropped, a record with no usable date is kept. A missing content match is
/// not an error.
///
/// # Errors
///
/// Returns [`AnalyticsError::Store`] if either read fails.
pub async fn load_window<S>(
    store: &S,
    user_id: &str,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<LoadedRecord>, AnalyticsError>
where
    S: SnapshotStore + ?Sized,
{
    let (engagement, content) = tokio::try_join!(
        store.list_engagement_records(user_id),
        store.list_content_records(user_id),
    )?;

    let fetched = engagement.len();
    let cutoff = window_start(now, window_days);
    let content_by_id: HashMap<String, ContentRecord> =
        content.into_iter().map(|c| (c.id.clone(), c)).collect();

    let mut undated = 0usize;
    let loaded: Vec<LoadedRecord> = engagement
        .into_iter()
        .filter(|r| {
            let keep = within_window(r, cutoff);
            if keep && r.effective_date().is_none() {
                undated += 1;
            }
            keep
        })
        .map(|engagement| {
            // Two engagement records may reference the same content.
            let content = engagement
                .content_id
                .as_ref()
                .and_then(|id| content_by_id.get(id).cloned());
            LoadedRecord {
                engagement,
                content,
            }
        })
        .collect();

    tracing::debug!(
        user_id,
        window_days,
        fetched,
        in_window = loaded.len(),
        undated,
        "loaded engagement window"
    );

    Ok(loaded)
}

/// First instant inside the window.
#[must_use]
pub fn window_start(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(window_days))
}

/// `true` when the record's effective date is on or after `cutoff`, or when
/// it has no usable date at all.
#[must_use]
pub fn within_window(record: &EngagementRecord, cutoff: DateTime<Utc>) -> bool {
    record.effective_date().map_or(true, |date| date >= cutoff)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::memory::MemoryStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap()
    }

    fn engagement(id: &str, user: &str, days_ago: Option<i64>) -> EngagementRecord {
        EngagementRecord {
            id: Some(id.to_string()),
            user_id: user.to_string(),
            published_at: days_ago.map(|d| now() - Duration::days(d)),
            ..EngagementRecord::default()
        }
    }

    fn content(id: &str, user: &str) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            text: format!("text for {id}"),
            ..ContentRecord::default()
        }
    }

    #[test]
    fn undated_records_are_within_any_window() {
        let record = engagement("e1", "u1", None);
        assert!(within_window(&record, now()));
    }

    #[test]
    fn boundary_date_is_inside_window() {
        let record = engagement("e1", "u1", Some(90));
        assert!(within_window(&record, window_start(now(), 90)));
    }

    #[tokio::test]
    async fn drops_old_records_keeps_recent_and_undated() {
        let store = MemoryStore::with_records(
            vec![
                engagement("recent", "u1", Some(5)),
                engagement("old", "u1", Some(120)),
                engagement("undated", "u1", None),
                engagement("other-user", "u2", Some(1)),
            ],
            vec![],
        );

        let loaded = load_window(&store, "u1", 90, now()).await.expect("load");
        let ids: Vec<&str> = loaded
            .iter()
            .filter_map(|r| r.engagement.id.as_deref())
            .collect();
        assert_eq!(ids, vec!["recent", "undated"]);
    }

    #[tokio::test]
    async fn recorded_at_used_when_published_at_missing() {
        let mut old = engagement("old", "u1", None);
        old.recorded_at = Some(now() - Duration::days(400));
        let store = MemoryStore::with_records(vec![old], vec![]);

        let loaded = load_window(&store, "u1", 90, now()).await.expect("load");
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn joins_content_by_explicit_reference() {
        let mut linked = engagement("e1", "u1", Some(1));
        linked.content_id = Some("c1".to_string());
        let mut dangling = engagement("e2", "u1", Some(1));
        dangling.content_id = Some("missing".to_string());
        let mut shared = engagement("e3", "u1", Some(2));
        shared.content_id = Some("c1".to_string());

        let store = MemoryStore::with_records(
            vec![linked, dangling, shared],
            vec![content("c1", "u1"), content("c2", "u1")],
        );

        let loaded = load_window(&store, "u1", 90, now()).await.expect("load");
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded[0].content.as_ref().map(|c| c.id.as_str()),
            Some("c1")
        );
        assert!(loaded[1].content.is_none());
        assert_eq!(
            loaded[2].content.as_ref().map(|c| c.id.as_str()),
            Some("c1")
        );
    }
}
