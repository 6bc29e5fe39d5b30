//! Run orchestration: the engine's phases, in order.
//!
//! latent demand → factor validation → composite scoring → quadrant
//! classification → threshold discovery → zone evaluation. Validation runs
//! to completion and produces the finalized [`ScoringConfig`] before any
//! scoring starts — the weights are a run-wide input to every entity's
//! score, so the two are phases, never concurrent stages.
//!
//! A run either completes deterministically or fails fast on a structural
//! config error; row- and field-level issues accumulate in
//! [`RunDiagnostics`] and never abort.

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::config::{
    ConfigError, DiscoveryConfig, LatentDemandConfig, QuadrantConfig, ScoringConfig,
    ScoringConfigSeed, ZoneThresholdConfig,
};
use crate::correlation::{validate_factors, CorrelationResult, FactorImpact};
use crate::diagnostics::RunDiagnostics;
use crate::entity::{Entity, EntityKind};
use crate::inflection::{discover_all, driver_confounds, DriverBucketReport, DriverCorrelation};
use crate::latent::{latent_demand, LatentDemandBreakdown, LatentSignals};
use crate::mentions::MentionSource;
use crate::metric::{names, MetricRecord, MetricSet, MetricSource};
use crate::quadrant::classify;
use crate::score::{final_score, track_scores, CompositeScore};
use crate::zone::{evaluate_zone, ZoneStatus};

/// Metric names that describe zone supply (what has been onboarded).
pub const SUPPLY_METRICS: &[&str] = &[
    names::PARTNER_COUNT,
    names::CUISINE_COUNT,
    names::DISH_COUNT,
];

/// Metric names that only exist once a zone has received orders.
pub const BEHAVIORAL_METRICS: &[&str] = &[
    names::ORDER_VOLUME,
    names::AVG_RATING,
    names::REPEAT_RATE_PCT,
];

/// All engine configuration, explicit and immutable for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub seed: ScoringConfigSeed,
    pub zone_thresholds: ZoneThresholdConfig,
    #[serde(default)]
    pub quadrants: QuadrantConfig,
    #[serde(default = "LatentDemandConfig::default")]
    pub latent: LatentDemandConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl EngineConfig {
    /// Load a full engine config from one JSON file and validate it.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let config: Self = crate::config::load_json(path)?;
        config.seed.validate()?;
        config.zone_thresholds.validate()?;
        Ok(config)
    }
}

/// Everything a run produces, for report/dashboard renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub engine_version: String,
    /// The finalized config the scores were computed under.
    pub config: ScoringConfig,
    pub scores: Vec<CompositeScore>,
    /// Why each weight was chosen — retained for excluded factors too.
    pub correlation_audit: Vec<CorrelationResult>,
    pub factor_impacts: Vec<FactorImpact>,
    pub latent_demand: Vec<LatentDemandBreakdown>,
    pub buckets: Vec<DriverBucketReport>,
    pub driver_confounds: Vec<DriverCorrelation>,
    pub zones: Vec<ZoneStatus>,
    pub diagnostics: RunDiagnostics,
}

/// Menu entities eligible for composite scoring, in id order.
pub fn scoreable_entities(entities: &[Entity]) -> Vec<&Entity> {
    let mut out: Vec<&Entity> = entities
        .iter()
        .filter(|e| matches!(e.kind, EntityKind::DishType | EntityKind::Cuisine))
        .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

/// Compute latent demand for every scoreable entity and upsert the resulting
/// ordinal as an estimated factor record, so it can participate in factor
/// validation and opportunity scoring like any other candidate.
pub fn apply_latent_demand(
    scoreable: &[&Entity],
    factor_scores: &mut MetricSet,
    observed: &MetricSet,
    mentions: &dyn MentionSource,
    cfg: &LatentDemandConfig,
) -> Vec<LatentDemandBreakdown> {
    let mention_counts = mentions.mention_counts();
    let mut rows = Vec::with_capacity(scoreable.len());
    for entity in scoreable {
        let signals = LatentSignals {
            mentions: mention_counts.get(&entity.id).copied(),
            wishlist_pct: observed.value(&entity.id, names::WISHLIST_PCT),
            barrier_count: observed
                .value(&entity.id, names::BARRIER_MENTIONS)
                .map(|v| v.max(0.0) as u64),
        };
        let breakdown = latent_demand(&entity.id, signals, cfg);
        factor_scores.upsert(MetricRecord {
            entity_id: entity.id.clone(),
            metric: names::LATENT_DEMAND.to_string(),
            value: Some(f64::from(breakdown.score)),
            sample_size: 0,
            source: MetricSource::Estimated,
            is_estimated: true,
        });
        rows.push(breakdown);
    }
    rows
}

/// Run the full engine over already-normalized inputs.
///
/// `factor_scores` holds candidate factor scores (1–5 per entity, keyed by
/// factor name); `observed` holds success/supply/behavioral metrics. The two
/// sets are kept apart so nothing downstream can mistake a factor score for
/// an observed outcome.
pub fn run(
    config: &EngineConfig,
    entities: &[Entity],
    factor_scores: &MetricSet,
    observed: &MetricSet,
    mentions: &dyn MentionSource,
) -> Result<RunReport, ConfigError> {
    config.seed.validate()?;
    config.zone_thresholds.validate()?;

    let started_at_ms = epoch_ms();
    let run_id = Uuid::new_v4().to_string();
    let mut diagnostics = RunDiagnostics::new();

    let scoreable = scoreable_entities(entities);

    // Phase 1: latent demand. Computed before validation so the resulting
    // 1–5 score can participate as an opportunity-track factor.
    let mut working_factors = factor_scores.clone();
    let latent_rows = apply_latent_demand(
        &scoreable,
        &mut working_factors,
        observed,
        mentions,
        &config.latent,
    );
    debug!("latent demand computed for {} entities", latent_rows.len());

    // Phase 2: factor validation. Must finish before any scoring below.
    let outcome = validate_factors(&config.seed, &working_factors, observed, &mut diagnostics)?;
    let scoring_config: &ScoringConfig = &outcome.config;

    // Phase 3: composite scoring + quadrant classification.
    let mut scores = Vec::with_capacity(scoreable.len());
    for (entity, latent_row) in scoreable.iter().zip(&latent_rows) {
        let tracks = track_scores(&entity.id, scoring_config, &working_factors);
        let performance = tracks.get(&scoring_config.performance_track).copied();
        // Opportunity is always present: the latent demand score backs it
        // even when the opportunity track carries no other data.
        let opportunity = tracks
            .get(&scoring_config.opportunity_track)
            .copied()
            .unwrap_or_else(|| f64::from(latent_row.score));
        let fin = final_score(scoring_config, &tracks).unwrap_or(opportunity);
        let quadrant = classify(
            performance,
            opportunity,
            config.quadrants.thresholds_for(entity.kind),
        );
        scores.push(CompositeScore {
            entity_id: entity.id.clone(),
            track_scores: tracks,
            final_score: fin,
            quadrant,
        });
    }

    // Phase 4: threshold discovery + confound disclosure.
    let buckets = discover_all(entities, &config.discovery, observed, &mut diagnostics);
    let confounds = driver_confounds(&config.discovery, observed);

    // Phase 5: zone readiness.
    let mut zones = Vec::new();
    let mut zone_entities: Vec<&Entity> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Zone)
        .collect();
    zone_entities.sort_by(|a, b| a.id.cmp(&b.id));
    for entity in zone_entities {
        let records = observed.records_for(&entity.id);
        let supply: Vec<&MetricRecord> = records
            .iter()
            .copied()
            .filter(|r| SUPPLY_METRICS.contains(&r.metric.as_str()))
            .collect();
        let behavioral: Vec<&MetricRecord> = records
            .iter()
            .copied()
            .filter(|r| BEHAVIORAL_METRICS.contains(&r.metric.as_str()))
            .collect();
        zones.push(evaluate_zone(
            &entity.id,
            &supply,
            &behavioral,
            &config.zone_thresholds,
        ));
    }

    Ok(RunReport {
        run_id,
        started_at_ms,
        finished_at_ms: epoch_ms(),
        engine_version: crate::VERSION.to_string(),
        config: scoring_config.clone(),
        scores,
        correlation_audit: outcome.audit,
        factor_impacts: outcome.impacts,
        latent_demand: latent_rows,
        buckets,
        driver_confounds: confounds,
        zones,
        diagnostics,
    })
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
