//! Audience persona highlights.

use std::collections::BTreeMap;

use postpulse_core::AudienceBreakdown;
use serde::{Deserialize, Serialize};

use crate::scorer::round_to;

/// The largest segment of one demographic map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSegment {
    pub label: String,
    /// Percentage share, rounded to 1 decimal.
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaInsight {
    pub top_gender: Option<PersonaSegment>,
    pub top_age: Option<PersonaSegment>,
    /// One sentence per non-empty demographic map.
    pub summary: Vec<String>,
    pub breakdown: Option<AudienceBreakdown>,
}

/// Reduce an audience breakdown to its top segments and a short summary.
///
/// A missing breakdown yields an empty insight; an empty map contributes
/// nothing.
#[must_use]
pub fn build_persona_insight(audience: Option<&AudienceBreakdown>) -> PersonaInsight {
    let Some(audience) = audience.filter(|a| !a.is_empty()) else {
        return PersonaInsight::default();
    };

    let top_gender = top_segment(&audience.gender);
    let top_age = top_segment(&audience.age);

    let mut summary = Vec::with_capacity(2);
    if let Some(seg) = &top_gender {
        summary.push(format!(
            "{} viewers make up {:.1}% of this post's audience",
            capitalize(&seg.label),
            seg.share
        ));
    }
    if let Some(seg) = &top_age {
        summary.push(format!(
            "Viewers aged {} make up {:.1}% of this post's audience",
            seg.label, seg.share
        ));
    }

    PersonaInsight {
        top_gender,
        top_age,
        summary,
        breakdown: Some(audience.clone()),
    }
}

/// Highest-share entry; ties keep the first label in key order. Non-finite
/// shares are ignored.
fn top_segment(map: &BTreeMap<String, f64>) -> Option<PersonaSegment> {
    let mut best: Option<(&String, f64)> = None;
    for (label, &share) in map {
        if !share.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, top)| share > top) {
            best = Some((label, share));
        }
    }
    best.map(|(label, share)| PersonaSegment {
        label: label.clone(),
        share: round_to(share, 1),
    })
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
