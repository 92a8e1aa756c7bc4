//! Composite z-score scoring and classification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::{Metric, MetricBundle, MetricStats, PopulationStatistics};
use crate::snapshot::SnapshotStatus;

/// Metrics that feed the composite score, with their weights.
pub const SCORE_WEIGHTS: [(Metric, f64); 3] = [
    (Metric::EngagementRate, 0.5),
    (Metric::SaveRate, 0.3),
    (Metric::Reach, 0.2),
];

pub const GOLD_THRESHOLD: f64 = 1.0;
pub const NEGATIVE_THRESHOLD: f64 = -1.0;

/// Per-metric z-scores for the three scored metrics, rounded to 3 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZScores {
    pub engagement_rate: f64,
    pub save_rate: f64,
    pub reach: f64,
}

/// Difference between a post's metric and the population mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub absolute: f64,
    /// `None` when the population mean is zero.
    pub percent: Option<f64>,
}

/// Score, z-scores, and classification for one post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostScore {
    pub z_scores: ZScores,
    pub composite: f64,
    pub status: SnapshotStatus,
}

/// `(value − mean) / std`, defined as `0.0` when std is zero or the result
/// would not be finite.
#[must_use]
pub fn z_score(value: f64, stats: MetricStats) -> f64 {
    if stats.std <= 0.0 || !stats.std.is_finite() {
        return 0.0;
    }
    let z = (value - stats.mean) / stats.std;
    if z.is_finite() {
        z
    } else {
        0.0
    }
}

/// Classify a composite score. Pure function of `score`.
#[must_use]
pub fn classify(score: f64) -> SnapshotStatus {
    if score >= GOLD_THRESHOLD {
        SnapshotStatus::Gold
    } else if score <= NEGATIVE_THRESHOLD {
        SnapshotStatus::Negative
    } else {
        SnapshotStatus::Normal
    }
}

/// Score one bundle against the population.
///
/// The composite is `0.5·z(engagementRate) + 0.3·z(saveRate) + 0.2·z(reach)`
/// rounded to 3 decimals; classification uses the rounded value.
#[must_use]
pub fn score_bundle(bundle: &MetricBundle, stats: &PopulationStatistics) -> PostScore {
    let z = |metric: Metric| z_score(bundle.value(metric), stats.get(metric));

    let composite = round_to(
        SCORE_WEIGHTS
            .iter()
            .map(|&(metric, weight)| weight * z(metric))
            .sum(),
        3,
    );

    PostScore {
        z_scores: ZScores {
            engagement_rate: round_to(z(Metric::EngagementRate), 3),
            save_rate: round_to(z(Metric::SaveRate), 3),
            reach: round_to(z(Metric::Reach), 3),
        },
        composite,
        status: classify(composite),
    }
}

/// Deltas against the population mean for every metric in the bundle.
///
/// Informational only; never feeds back into the score.
#[must_use]
pub fn metric_deltas(
    bundle: &MetricBundle,
    stats: &PopulationStatistics,
) -> BTreeMap<Metric, MetricDelta> {
    Metric::ALL
        .into_iter()
        .map(|metric| {
            let value = bundle.value(metric);
            let mean = stats.get(metric).mean;
            let diff = value - mean;
            let percent = (mean.abs() > 0.0).then(|| round_to(diff / mean * 100.0, 2));
            (
                metric,
                MetricDelta {
                    absolute: round_to(diff, 2),
                    percent,
                },
            )
        })
        .collect()
}

/// Round half away from zero to `places` decimals. Non-finite input becomes `0.0`.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    // Normalise -0.0 so serialized output never shows a signed zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
