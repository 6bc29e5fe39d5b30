//! Typed, validated configuration for the scoring engine.
//!
//! All configuration is explicit immutable data passed into the functions
//! that need it — nothing reads ambient global state. Structural problems
//! (weights that cannot define a consistent scoring procedure, missing zone
//! criteria) are fatal at load time via [`ConfigError`]; the engine refuses
//! to run on an invalid config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::entity::EntityKind;

/// Tolerance for weight-sum checks.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Fatal configuration errors. Everything here names the offending key or
/// file so the failure is actionable without a stack trace.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("track weights sum to {sum:.6}, expected 1.0 (tracks: {tracks})")]
    TrackWeightSum { sum: f64, tracks: String },

    #[error("component weights in track '{track}' sum to {sum:.6}, expected 1.0")]
    ComponentWeightSum { track: String, sum: f64 },

    #[error("track '{track}' declares factor '{factor}' more than once")]
    DuplicateFactor { track: String, factor: String },

    #[error("scoring config has no tracks")]
    NoTracks,

    #[error("no factor cleared the inclusion threshold in any track")]
    NoIncludedFactors,

    #[error("scoring config names unknown {role} track '{track}'")]
    UnknownAxisTrack { role: &'static str, track: String },

    #[error("zone threshold '{criterion}' must be positive, got {value}")]
    InvalidZoneThreshold { criterion: &'static str, value: f64 },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Scoring config: seed (candidates) and finalized (validated weights)
// ---------------------------------------------------------------------------

/// A single scored input dimension, 1–5 per entity.
///
/// `weight` is `None` in the seed and populated by the correlation
/// validator; only validated factors carry a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDefinition {
    pub name: String,
    /// Success metrics this factor is tested against for inclusion.
    pub candidate_success_metrics: Vec<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Candidate track before correlation-based pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSeed {
    pub name: String,
    /// Share of the total score allotted to this track. Allotments across
    /// all tracks must sum to 1.0.
    pub allotment: f64,
    pub factors: Vec<FactorDefinition>,
}

/// Initial factor candidate list and track allotments, loaded from JSON
/// before correlation-based pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfigSeed {
    pub tracks: Vec<TrackSeed>,
    /// Track whose score feeds the quadrant performance axis.
    pub performance_track: String,
    /// Track whose score feeds the quadrant opportunity axis.
    pub opportunity_track: String,
    /// Minimum factor impact score for inclusion.
    #[serde(default = "default_inclusion_threshold")]
    pub inclusion_threshold: f64,
    /// Minimum paired entities for a correlation to count toward impact.
    #[serde(default = "default_min_pair_entities")]
    pub min_pair_entities: usize,
}

fn default_inclusion_threshold() -> f64 {
    0.10
}

fn default_min_pair_entities() -> usize {
    10
}

impl ScoringConfigSeed {
    /// Structural validation, fatal on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracks.is_empty() {
            return Err(ConfigError::NoTracks);
        }
        let sum: f64 = self.tracks.iter().map(|t| t.allotment).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::TrackWeightSum {
                sum,
                tracks: self
                    .tracks
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        for track in &self.tracks {
            for (i, factor) in track.factors.iter().enumerate() {
                if track.factors[..i].iter().any(|f| f.name == factor.name) {
                    return Err(ConfigError::DuplicateFactor {
                        track: track.name.clone(),
                        factor: factor.name.clone(),
                    });
                }
            }
        }
        for (role, track) in [
            ("performance", &self.performance_track),
            ("opportunity", &self.opportunity_track),
        ] {
            if !self.tracks.iter().any(|t| &t.name == track) {
                return Err(ConfigError::UnknownAxisTrack {
                    role,
                    track: track.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A validated track: components carry non-null weights summing to 1.0, and
/// `track_weight` is this track's share of the final composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub track_weight: f64,
    pub components: Vec<FactorDefinition>,
}

/// Finalized scoring configuration. Read-only once produced: the scoring
/// pass takes it by reference and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub tracks: Vec<Track>,
    pub performance_track: String,
    pub opportunity_track: String,
}

impl ScoringConfig {
    /// Verify the finalized invariants: track weights sum to 1.0 and each
    /// track's component weights sum to 1.0, within tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracks.is_empty() {
            return Err(ConfigError::NoTracks);
        }
        let track_sum: f64 = self.tracks.iter().map(|t| t.track_weight).sum();
        if (track_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::TrackWeightSum {
                sum: track_sum,
                tracks: self
                    .tracks
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        for track in &self.tracks {
            let sum: f64 = track.components.iter().filter_map(|f| f.weight).sum();
            if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(ConfigError::ComponentWeightSum {
                    track: track.name.clone(),
                    sum,
                });
            }
        }
        Ok(())
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }
}

// ---------------------------------------------------------------------------
// Quadrant thresholds
// ---------------------------------------------------------------------------

/// Axis cutoffs for quadrant classification. Configuration, not constants:
/// dish types, cuisines, and zones use different cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadrantThresholds {
    pub performance: f64,
    pub opportunity: f64,
}

impl Default for QuadrantThresholds {
    fn default() -> Self {
        Self {
            performance: 3.5,
            opportunity: 3.0,
        }
    }
}

/// Per-kind quadrant cutoffs with a default fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrantConfig {
    #[serde(default)]
    pub default: QuadrantThresholds,
    #[serde(default)]
    pub per_kind: BTreeMap<EntityKind, QuadrantThresholds>,
}

impl QuadrantConfig {
    pub fn thresholds_for(&self, kind: EntityKind) -> QuadrantThresholds {
        self.per_kind.get(&kind).copied().unwrap_or(self.default)
    }
}

// ---------------------------------------------------------------------------
// Latent demand
// ---------------------------------------------------------------------------

/// Sub-weights and saturation points for the latent demand aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatentDemandConfig {
    /// Weight of the open-text mention signal.
    pub mention_weight: f64,
    /// Weight of the wishlist-percentage signal.
    pub wishlist_weight: f64,
    /// Weight of the conversion-barrier signal.
    pub barrier_weight: f64,
    /// Mention count mapped to a full-scale mention sub-score.
    pub mention_saturation: f64,
    /// Wishlist percentage (0–100) mapped to a full-scale sub-score.
    pub wishlist_saturation_pct: f64,
    /// Barrier mention count mapped to a full-scale sub-score.
    pub barrier_saturation: f64,
    /// Score assigned when an entity has no data on any sub-signal.
    pub neutral_default: u8,
}

impl Default for LatentDemandConfig {
    fn default() -> Self {
        Self {
            mention_weight: 0.45,
            wishlist_weight: 0.30,
            barrier_weight: 0.25,
            mention_saturation: 50.0,
            wishlist_saturation_pct: 20.0,
            barrier_saturation: 100.0,
            neutral_default: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold discovery
// ---------------------------------------------------------------------------

/// One ordinal driver to bucket entities by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSpec {
    /// Driver metric name (e.g. `"partner_count"`).
    pub metric: String,
    /// Ascending lower bucket boundaries; the last bucket is open-ended.
    /// `[1, 3, 5, 7, 10]` yields buckets `1-2, 3-4, 5-6, 7-9, 10+`.
    pub boundaries: Vec<f64>,
    /// The separately-configured business target for this driver. A policy
    /// decision, carried through output independently of the data-derived
    /// inflection point.
    pub business_target: f64,
}

/// Configuration for threshold/inflection discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub drivers: Vec<DriverSpec>,
    /// Outcome metrics averaged per bucket.
    pub outcome_metrics: Vec<String>,
}

// ---------------------------------------------------------------------------
// Zone thresholds
// ---------------------------------------------------------------------------

/// Business target values per zone readiness criterion. Every field is
/// required: a threshold config missing a criterion fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholdConfig {
    pub min_partners: f64,
    pub min_cuisines: f64,
    pub min_dishes: f64,
    pub min_rating: f64,
    pub min_repeat_rate_pct: f64,
}

impl ZoneThresholdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (criterion, value) in [
            ("min_partners", self.min_partners),
            ("min_cuisines", self.min_cuisines),
            ("min_dishes", self.min_dishes),
            ("min_rating", self.min_rating),
            ("min_repeat_rate_pct", self.min_repeat_rate_pct),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(ConfigError::InvalidZoneThreshold { criterion, value });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub(crate) fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load and validate a scoring config seed from JSON.
pub fn load_scoring_seed(path: &Path) -> Result<ScoringConfigSeed, ConfigError> {
    let seed: ScoringConfigSeed = load_json(path)?;
    seed.validate()?;
    Ok(seed)
}

/// Load and validate zone thresholds from JSON.
pub fn load_zone_thresholds(path: &Path) -> Result<ZoneThresholdConfig, ConfigError> {
    let cfg: ZoneThresholdConfig = load_json(path)?;
    cfg.validate()?;
    Ok(cfg)
}
