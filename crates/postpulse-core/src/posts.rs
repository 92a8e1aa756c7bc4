use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One measured post: raw engagement counts plus whatever content and
/// audience data was captured alongside them.
///
/// Manually entered records may carry no `content_id`; the pipeline then
/// falls back to `content_text` and `hashtags` stored on the record itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementRecord {
    /// Store-assigned identifier. `None` only for records that never hit the store
    /// (e.g. offline previews).
    pub id: Option<String>,
    pub user_id: String,
    /// Explicit reference to the [`ContentRecord`] this measurement belongs to.
    pub content_id: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub saves: u64,
    pub reach: u64,
    /// Stored engagement rate (percent), used only when `reach` is zero.
    pub engagement_rate: Option<f64>,
    /// Stored save rate (percent), used only when `reach` is zero.
    pub save_rate: Option<f64>,
    pub content_text: Option<String>,
    pub hashtags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub audience: Option<AudienceBreakdown>,
}

impl EngagementRecord {
    /// The date used for window filtering: publish time, else the time the
    /// measurement was recorded.
    #[must_use]
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.recorded_at)
    }
}

/// The textual definition of a post, owned independently of its measurements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentRecord {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub hashtags: Vec<String>,
    /// Free-form type tag, e.g. `"carousel"`, `"reel"`, `"thread"`.
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Audience demographics as two independent percentage maps.
///
/// Keys are labels as reported by the platform (`"female"`, `"25-34"`);
/// values are percentages in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceBreakdown {
    pub gender: BTreeMap<String, f64>,
    pub age: BTreeMap<String, f64>,
}

impl AudienceBreakdown {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gender.is_empty() && self.age.is_empty()
    }
}
