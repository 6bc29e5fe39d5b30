//! Composite scoring: weighted track scores with missing-data
//! renormalization.
//!
//! A factor with no record for an entity is excluded from both the
//! numerator and denominator of that entity's track score — thin data is
//! not a penalty. A track with zero data for an entity is dropped and the
//! remaining track weights renormalized for that entity only. Every factor
//! input is clamped to [1,5] before weighting, so every track score and the
//! final composite land in [1,5] by construction.
//!
//! Pure and deterministic: identical records and config always produce
//! identical output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{ScoringConfig, Track};
use crate::metric::MetricSet;
use crate::quadrant::Quadrant;

/// Clamp a factor input to the scoring scale.
pub fn clamp_factor(value: f64) -> f64 {
    value.clamp(1.0, 5.0)
}

/// Per-entity scoring output, recomputed fresh every run — always derivable
/// from the records and the config, never the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub entity_id: String,
    /// Track name → score, for tracks with at least one non-null factor.
    pub track_scores: BTreeMap<String, f64>,
    pub final_score: f64,
    pub quadrant: Quadrant,
}

/// Track score for one entity, renormalized over the factors that have data.
/// `None` when no component factor has a record for this entity.
pub fn track_score(entity_id: &str, track: &Track, factor_scores: &MetricSet) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for component in &track.components {
        // Finalized configs always carry weights; unvalidated components
        // contribute nothing rather than poisoning the track.
        let Some(weight) = component.weight else {
            continue;
        };
        let Some(value) = factor_scores.value(entity_id, &component.name) else {
            continue;
        };
        weighted_sum += clamp_factor(value) * weight;
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        None
    } else {
        Some(weighted_sum / weight_sum)
    }
}

/// All track scores for one entity, in track-name order.
pub fn track_scores(
    entity_id: &str,
    config: &ScoringConfig,
    factor_scores: &MetricSet,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for track in &config.tracks {
        if let Some(score) = track_score(entity_id, track, factor_scores) {
            out.insert(track.name.clone(), score);
        }
    }
    out
}

/// Final composite across tracks with data, with track weights renormalized
/// for this entity. `None` when no track has any data.
pub fn final_score(config: &ScoringConfig, scores: &BTreeMap<String, f64>) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for track in &config.tracks {
        let Some(score) = scores.get(&track.name) else {
            continue;
        };
        weighted_sum += score * track.track_weight;
        weight_sum += track.track_weight;
    }
    if weight_sum <= 0.0 {
        None
    } else {
        Some(weighted_sum / weight_sum)
    }
}
