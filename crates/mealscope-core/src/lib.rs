//! # mealscope-core
//!
//! **Scoring and classification engine for family-meal menu strategy.**
//!
//! `mealscope-core` turns heterogeneous evidence — order history, partner
//! onboarding, consumer surveys, open-text mentions — into defensible,
//! reproducible prioritization artifacts: composite 1–5 scores, quadrant
//! classifications, latent demand estimates, supply threshold discovery, and
//! zone readiness tiers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mealscope_core::{load_scoring_seed, load_zone_thresholds};
//! use mealscope_core::pipeline::{run, EngineConfig};
//! use mealscope_core::mentions::StaticMentions;
//! use mealscope_core::config::{DiscoveryConfig, LatentDemandConfig, QuadrantConfig};
//! use mealscope_core::metric::MetricSet;
//! use std::path::Path;
//!
//! let config = EngineConfig {
//!     seed: load_scoring_seed(Path::new("config/scoring_seed.json")).unwrap(),
//!     zone_thresholds: load_zone_thresholds(Path::new("config/zone_thresholds.json")).unwrap(),
//!     quadrants: QuadrantConfig::default(),
//!     latent: LatentDemandConfig::default(),
//!     discovery: DiscoveryConfig::default(),
//! };
//! let report = run(
//!     &config,
//!     &[],
//!     &MetricSet::new(),
//!     &MetricSet::new(),
//!     &StaticMentions::default(),
//! )
//! .unwrap();
//! println!("{} entities scored", report.scores.len());
//! ```
//!
//! ## Architecture
//!
//! Normalize → Validate → Score → Classify → Discover → Evaluate
//!
//! Two rules hold everywhere:
//! - **Weights are earned, not asserted.** Every factor weight in the final
//!   config traces back to a correlation audit row; factors that fail the
//!   inclusion threshold are excluded, and the audit says why.
//! - **Absence of data is never evidence.** Missing metrics renormalize the
//!   remaining weights; they never count as zero, and zones with no orders
//!   are reported as unmeasured rather than failing.
//!
//! All scoring math is pure: identical inputs plus identical config produce a
//! byte-identical report body (run id and timestamps aside).

pub mod config;
pub mod correlation;
pub mod diagnostics;
pub mod entity;
pub mod inflection;
pub mod latent;
pub mod mentions;
pub mod metric;
pub mod normalize;
pub mod pipeline;
pub mod quadrant;
pub mod score;
pub mod zone;

pub use config::{
    ConfigError, DiscoveryConfig, DriverSpec, FactorDefinition, LatentDemandConfig,
    QuadrantConfig, QuadrantThresholds, ScoringConfig, ScoringConfigSeed, Track, TrackSeed,
    ZoneThresholdConfig, load_scoring_seed, load_zone_thresholds,
};
pub use correlation::{
    CorrelationResult, FactorImpact, MEANINGFUL_R, SIGNIFICANT_P, ValidationOutcome,
    validate_factors,
};
pub use diagnostics::RunDiagnostics;
pub use entity::{Entity, EntityKind, entities_of_kind, parse_entity_kind};
pub use inflection::{
    DriverBucketReport, DriverCorrelation, InflectionPoint, MIN_BUCKET_N, OutcomeMean,
    ThresholdBucket, discover, discover_all, driver_confounds,
};
pub use latent::{LatentDemandBreakdown, LatentSignals, latent_demand};
pub use mentions::{MentionRecord, MentionSource, StaticMentions};
pub use metric::{MetricRecord, MetricSet, MetricSource, names};
pub use normalize::{
    ColumnSpec, NormalizerConfig, RawTable, TableSchema, Unit, normalize_table, normalize_tables,
};
pub use pipeline::{
    BEHAVIORAL_METRICS, EngineConfig, RunReport, SUPPLY_METRICS, apply_latent_demand, run,
    scoreable_entities,
};
pub use quadrant::{Quadrant, classify};
pub use score::{CompositeScore, clamp_factor, final_score, track_score, track_scores};
pub use zone::{ZoneStatus, ZoneTier, evaluate_zone};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
