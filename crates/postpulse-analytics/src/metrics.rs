//! Metric normalization and population statistics.

use postpulse_core::EngagementRecord;
use serde::{Deserialize, Serialize};

/// Every metric carried in a [`MetricBundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Likes,
    Comments,
    Shares,
    Saves,
    Reach,
    EngagementRate,
    SaveRate,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Likes,
        Metric::Comments,
        Metric::Shares,
        Metric::Saves,
        Metric::Reach,
        Metric::EngagementRate,
        Metric::SaveRate,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Likes => "likes",
            Metric::Comments => "comments",
            Metric::Shares => "shares",
            Metric::Saves => "saves",
            Metric::Reach => "reach",
            Metric::EngagementRate => "engagementRate",
            Metric::SaveRate => "saveRate",
        }
    }

    fn index(self) -> usize {
        match self {
            Metric::Likes => 0,
            Metric::Comments => 1,
            Metric::Shares => 2,
            Metric::Saves => 3,
            Metric::Reach => 4,
            Metric::EngagementRate => 5,
            Metric::SaveRate => 6,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparable per-post metrics derived from one [`EngagementRecord`].
///
/// Rates are percentages. Both rates are always finite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBundle {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub saves: u64,
    pub reach: u64,
    pub engagement_rate: f64,
    pub save_rate: f64,
}

impl MetricBundle {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Likes => self.likes as f64,
            Metric::Comments => self.comments as f64,
            Metric::Shares => self.shares as f64,
            Metric::Saves => self.saves as f64,
            Metric::Reach => self.reach as f64,
            Metric::EngagementRate => self.engagement_rate,
            Metric::SaveRate => self.save_rate,
        }
    }
}

/// Build the metric bundle for one record.
///
/// With reach > 0 the rates are computed from the counts. With reach = 0 the
/// record's stored rates are used instead, and a missing or non-finite stored
/// rate becomes `0.0`.
#[must_use]
pub fn normalize(record: &EngagementRecord) -> MetricBundle {
    let interactions = record
        .saves
        .saturating_add(record.likes)
        .saturating_add(record.comments)
        .saturating_add(record.shares);

    let (engagement_rate, save_rate) = if record.reach > 0 {
        (
            percent_of(interactions, record.reach),
            percent_of(record.saves, record.reach),
        )
    } else {
        (
            finite_or_zero(record.engagement_rate),
            finite_or_zero(record.save_rate),
        )
    };

    MetricBundle {
        likes: record.likes,
        comments: record.comments,
        shares: record.shares,
        saves: record.saves,
        reach: record.reach,
        engagement_rate,
        save_rate,
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent_of(part: u64, whole: u64) -> f64 {
    part as f64 / whole as f64 * 100.0
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Mean and sample standard deviation of one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator); `0.0` when n ≤ 1.
    pub std: f64,
}

/// Welford accumulator: one pass, no intermediate buffer.
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> MetricStats {
        if self.count == 0 {
            return MetricStats::default();
        }
        let std = if self.count <= 1 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
        };
        MetricStats {
            mean: self.mean,
            std,
        }
    }
}

/// Per-metric statistics over one user's loaded record set.
///
/// Recomputed on every run and never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationStatistics {
    count: usize,
    stats: [MetricStats; 7],
}

impl PopulationStatistics {
    /// Accumulate statistics over all bundles in a single pass.
    pub fn from_bundles<'a, I>(bundles: I) -> Self
    where
        I: IntoIterator<Item = &'a MetricBundle>,
    {
        let mut running = [RunningStats::default(); 7];
        let mut count = 0usize;
        for bundle in bundles {
            count += 1;
            for metric in Metric::ALL {
                running[metric.index()].push(bundle.value(metric));
            }
        }
        Self {
            count,
            stats: running.map(RunningStats::finish),
        }
    }

    #[must_use]
    pub fn get(&self, metric: Metric) -> MetricStats {
        self.stats[metric.index()]
    }

    /// Number of records the statistics were computed over.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(likes: u64, saves: u64, reach: u64) -> EngagementRecord {
        EngagementRecord {
            user_id: "u1".to_string(),
            likes,
            saves,
            reach,
            ..EngagementRecord::default()
        }
    }

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn rates_computed_from_counts_when_reach_positive() {
        let mut r = record(10, 5, 200);
        r.comments = 3;
        r.shares = 2;
        let bundle = normalize(&r);
        // (5 + 10 + 3 + 2) / 200 * 100
        assert!(approx(bundle.engagement_rate, 10.0, 1e-9));
        assert!(approx(bundle.save_rate, 2.5, 1e-9));
    }

    #[test]
    fn zero_reach_without_fallback_yields_zero_rates() {
        let bundle = normalize(&record(10, 5, 0));
        assert_eq!(bundle.engagement_rate, 0.0);
        assert_eq!(bundle.save_rate, 0.0);
    }

    #[test]
    fn zero_reach_uses_stored_fallback_rates() {
        let mut r = record(10, 5, 0);
        r.engagement_rate = Some(4.2);
        r.save_rate = Some(1.1);
        let bundle = normalize(&r);
        assert!(approx(bundle.engagement_rate, 4.2, 1e-12));
        assert!(approx(bundle.save_rate, 1.1, 1e-12));
    }

    #[test]
    fn zero_reach_ignores_non_finite_fallback() {
        let mut r = record(1, 1, 0);
        r.engagement_rate = Some(f64::NAN);
        r.save_rate = Some(f64::INFINITY);
        let bundle = normalize(&r);
        assert!(bundle.engagement_rate.is_finite());
        assert!(bundle.save_rate.is_finite());
        assert_eq!(bundle.engagement_rate, 0.0);
        assert_eq!(bundle.save_rate, 0.0);
    }

    #[test]
    fn stored_rates_ignored_when_reach_positive() {
        let mut r = record(10, 0, 100);
        r.engagement_rate = Some(99.0);
        let bundle = normalize(&r);
        assert!(approx(bundle.engagement_rate, 10.0, 1e-9));
    }

    #[test]
    fn sample_std_uses_bessel_correction() {
        let bundles: Vec<MetricBundle> = [100, 200, 300]
            .into_iter()
            .map(|reach| normalize(&record(10, 0, reach)))
            .collect();
        let stats = PopulationStatistics::from_bundles(&bundles);
        let reach = stats.get(Metric::Reach);
        assert!(approx(reach.mean, 200.0, 1e-9));
        assert!(approx(reach.std, 100.0, 1e-9));

        let er = stats.get(Metric::EngagementRate);
        assert!(approx(er.mean, 6.111, 1e-3), "mean was {}", er.mean);
        assert!(approx(er.std, 3.47, 1e-2), "std was {}", er.std);
        assert_eq!(stats.count(), 3);
    }

    #[test]
    fn single_record_has_zero_std() {
        let bundles = vec![normalize(&record(10, 2, 100))];
        let stats = PopulationStatistics::from_bundles(&bundles);
        assert_eq!(stats.get(Metric::Likes).std, 0.0);
        assert!(approx(stats.get(Metric::Likes).mean, 10.0, 1e-12));
    }

    #[test]
    fn identical_values_have_exactly_zero_std() {
        let bundles: Vec<MetricBundle> = (0..5).map(|_| normalize(&record(7, 3, 300))).collect();
        let stats = PopulationStatistics::from_bundles(&bundles);
        for metric in Metric::ALL {
            assert_eq!(stats.get(metric).std, 0.0, "{metric} std should be exactly 0");
        }
    }

    #[test]
    fn empty_population_is_all_zero() {
        let stats = PopulationStatistics::from_bundles(std::iter::empty());
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.get(Metric::Reach), MetricStats::default());
    }

    #[test]
    fn metric_bundle_serializes_camel_case() {
        let bundle = normalize(&record(1, 1, 10));
        let json = serde_json::to_value(bundle).expect("serialize");
        assert!(json.get("engagementRate").is_some());
        assert!(json.get("saveRate").is_some());
    }
}
