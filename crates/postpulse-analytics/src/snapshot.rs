//! Snapshot documents and run summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use postpulse_core::{ContentRecord, EngagementRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalyticsError;
use crate::features::TextFeatures;
use crate::metrics::{Metric, MetricBundle};
use crate::persona::PersonaInsight;
use crate::scorer::{MetricDelta, ZScores};

/// Classification of a post's composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Gold,
    Negative,
    Normal,
}

impl SnapshotStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotStatus::Gold => "gold",
            SnapshotStatus::Negative => "negative",
            SnapshotStatus::Normal => "normal",
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SnapshotStatus {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(SnapshotStatus::Gold),
            "negative" => Ok(SnapshotStatus::Negative),
            "normal" => Ok(SnapshotStatus::Normal),
            other => Err(AnalyticsError::InvalidStatus(other.to_string())),
        }
    }
}

/// Denormalized copy of the content a snapshot was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContent {
    pub text: String,
    pub hashtags: Vec<String>,
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

impl SourceContent {
    /// Prefer the linked content record; fall back to what the engagement
    /// record carries itself.
    #[must_use]
    pub fn resolve(engagement: &EngagementRecord, content: Option<&ContentRecord>) -> Self {
        match content {
            Some(c) => Self {
                text: c.text.clone(),
                hashtags: if c.hashtags.is_empty() {
                    engagement.hashtags.clone()
                } else {
                    c.hashtags.clone()
                },
                content_type: c.content_type.clone(),
                created_at: c.created_at,
                published_at: engagement.published_at,
            },
            None => Self {
                text: engagement.content_text.clone().unwrap_or_default(),
                hashtags: engagement.hashtags.clone(),
                content_type: None,
                created_at: None,
                published_at: engagement.published_at,
            },
        }
    }
}

/// The persisted output for one engagement record in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub snapshot_id: String,
    pub user_id: String,
    pub engagement_id: Option<String>,
    pub content_id: Option<String>,
    pub status: SnapshotStatus,
    pub score: f64,
    pub z_scores: ZScores,
    pub metrics: MetricBundle,
    pub deltas: BTreeMap<Metric, MetricDelta>,
    pub persona: PersonaInsight,
    pub features: TextFeatures,
    pub content: SourceContent,
    pub window_days: u32,
    pub generated_at: DateTime<Utc>,
}

/// A snapshot as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub snapshot: Snapshot,
    pub updated_at: DateTime<Utc>,
}

/// Read-side view: the stored snapshot merged with any externally computed
/// comparison result for the same content id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub comparison: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// No engagement records in the window; stored snapshots were left untouched.
    NoRecords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub user_id: String,
    pub window_days: u32,
    pub dry_run: bool,
    pub outcome: RunOutcome,
    pub processed: usize,
    pub gold_count: usize,
    pub negative_count: usize,
    pub normal_count: usize,
    pub deleted_count: usize,
    pub saved_count: usize,
}

impl RunSummary {
    pub(crate) fn nothing_processed(user_id: &str, window_days: u32, dry_run: bool) -> Self {
        Self {
            user_id: user_id.to_string(),
            window_days,
            dry_run,
            outcome: RunOutcome::NoRecords,
            processed: 0,
            gold_count: 0,
            negative_count: 0,
            normal_count: 0,
            deleted_count: 0,
            saved_count: 0,
        }
    }
}
