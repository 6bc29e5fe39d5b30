//! Factor correlation validation: which candidate factors earn a weight.
//!
//! For every (factor, success metric) pair with enough paired entities this
//! computes Pearson r, Spearman r (rank correlation — more robust to the
//! ordinal 1–5 factor scores), and a two-sided p-value. A factor's impact
//! score is the mean |pearson_r| across its adequately-sampled pairs;
//! factors below the inclusion threshold are excluded, and included factors
//! split each track's allotment proportionally by impact.
//!
//! The full audit trail is retained — including excluded factors — so the
//! exclusion rationale stays inspectable.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::{
    ConfigError, FactorDefinition, ScoringConfig, ScoringConfigSeed, Track, WEIGHT_TOLERANCE,
};
use crate::diagnostics::RunDiagnostics;
use crate::metric::MetricSet;

/// |r| at or above which a pair is considered meaningful.
pub const MEANINGFUL_R: f64 = 0.3;
/// p-value below which a pair is considered significant (given enough n).
pub const SIGNIFICANT_P: f64 = 0.05;

/// Correlation of one factor against one success metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub factor: String,
    pub success_metric: String,
    pub pearson_r: f64,
    pub spearman_r: f64,
    pub n: usize,
    pub p_value: f64,
    /// `|r| >= 0.3` on either coefficient.
    pub is_meaningful: bool,
    /// `p < 0.05` with `n >= 10`.
    pub is_significant: bool,
    /// Pair had fewer entities than the configured minimum; retained for the
    /// audit trail but excluded from the factor's impact score.
    pub low_confidence: bool,
}

/// Aggregate inclusion decision for one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorImpact {
    pub factor: String,
    pub track: String,
    /// Mean |pearson_r| across adequately-sampled pairs.
    pub impact_score: f64,
    /// Pairs that contributed to the impact score.
    pub counted_pairs: usize,
    pub included: bool,
}

/// Validator output: the finalized config plus the complete audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub config: ScoringConfig,
    pub audit: Vec<CorrelationResult>,
    pub impacts: Vec<FactorImpact>,
}

/// Derive a finalized [`ScoringConfig`] from seed candidates and observed
/// success metrics. `factor_scores` holds each factor's 1–5 score per entity
/// under the factor's own name; `success_metrics` holds the observed
/// outcomes. Runs to completion before any scoring begins.
pub fn validate_factors(
    seed: &ScoringConfigSeed,
    factor_scores: &MetricSet,
    success_metrics: &MetricSet,
    diagnostics: &mut RunDiagnostics,
) -> Result<ValidationOutcome, ConfigError> {
    seed.validate()?;

    let mut audit = Vec::new();
    let mut impacts = Vec::new();

    for track in &seed.tracks {
        for factor in &track.factors {
            let mut abs_r_sum = 0.0;
            let mut counted = 0usize;

            for success_metric in &factor.candidate_success_metrics {
                let (xs, ys) = paired_values(factor_scores, success_metrics, &factor.name, success_metric);
                let n = xs.len();
                if n < 2 {
                    // Nothing to correlate; not even an audit row.
                    diagnostics.record_insufficient_sample(
                        format!("{} vs {}", factor.name, success_metric),
                        n,
                        seed.min_pair_entities,
                    );
                    continue;
                }

                let pearson_r = pearson(&xs, &ys);
                let spearman_r = spearman(&xs, &ys);
                let p_value = two_sided_p(pearson_r, n);
                let low_confidence = n < seed.min_pair_entities;
                if low_confidence {
                    diagnostics.record_insufficient_sample(
                        format!("{} vs {}", factor.name, success_metric),
                        n,
                        seed.min_pair_entities,
                    );
                } else {
                    abs_r_sum += pearson_r.abs();
                    counted += 1;
                }

                audit.push(CorrelationResult {
                    factor: factor.name.clone(),
                    success_metric: success_metric.clone(),
                    pearson_r,
                    spearman_r,
                    n,
                    p_value,
                    is_meaningful: pearson_r.abs() >= MEANINGFUL_R
                        || spearman_r.abs() >= MEANINGFUL_R,
                    is_significant: p_value < SIGNIFICANT_P && n >= seed.min_pair_entities,
                    low_confidence,
                });
            }

            let impact_score = if counted == 0 {
                0.0
            } else {
                abs_r_sum / counted as f64
            };
            impacts.push(FactorImpact {
                factor: factor.name.clone(),
                track: track.name.clone(),
                impact_score,
                counted_pairs: counted,
                included: impact_score >= seed.inclusion_threshold && counted > 0,
            });
        }
    }

    let config = finalize_config(seed, &impacts, diagnostics)?;
    config.validate()?;

    Ok(ValidationOutcome {
        config,
        audit,
        impacts,
    })
}

/// Turn impact scores into a finalized config: included factors split each
/// track's allotment by relative impact; tracks left with no included factor
/// have their allotment redistributed proportionally to the surviving tracks.
fn finalize_config(
    seed: &ScoringConfigSeed,
    impacts: &[FactorImpact],
    diagnostics: &mut RunDiagnostics,
) -> Result<ScoringConfig, ConfigError> {
    struct Survivor<'a> {
        seed: &'a crate::config::TrackSeed,
        components: Vec<FactorDefinition>,
    }

    let mut survivors: Vec<Survivor<'_>> = Vec::new();
    let mut orphaned_allotment = 0.0;

    for track in &seed.tracks {
        let included: Vec<&FactorImpact> = impacts
            .iter()
            .filter(|i| i.track == track.name && i.included)
            .collect();

        if included.is_empty() {
            warn!(
                "track '{}': no factor cleared the inclusion threshold, redistributing {:.0}% of total weight",
                track.name,
                track.allotment * 100.0
            );
            diagnostics.record_redistributed_track(&track.name, track.allotment);
            orphaned_allotment += track.allotment;
            continue;
        }

        let impact_sum: f64 = included.iter().map(|i| i.impact_score).sum();
        let components: Vec<FactorDefinition> = track
            .factors
            .iter()
            .filter_map(|factor| {
                let impact = included.iter().find(|i| i.factor == factor.name)?;
                Some(FactorDefinition {
                    name: factor.name.clone(),
                    candidate_success_metrics: factor.candidate_success_metrics.clone(),
                    weight: Some(impact.impact_score / impact_sum),
                })
            })
            .collect();

        survivors.push(Survivor {
            seed: track,
            components,
        });
    }

    if survivors.is_empty() {
        return Err(ConfigError::NoIncludedFactors);
    }

    // Redistribute orphaned allotment proportionally — never left as dead weight.
    let surviving_allotment: f64 = survivors.iter().map(|s| s.seed.allotment).sum();
    let tracks: Vec<Track> = survivors
        .iter()
        .map(|s| Track {
            name: s.seed.name.clone(),
            track_weight: s.seed.allotment
                + orphaned_allotment * (s.seed.allotment / surviving_allotment),
            components: s.components.clone(),
        })
        .collect();

    debug!(
        "finalized scoring config: {} tracks, {} included factors",
        tracks.len(),
        tracks.iter().map(|t| t.components.len()).sum::<usize>()
    );

    // Axis tracks may have been pruned entirely; the quadrant step falls
    // back per-entity, but the config must still name valid tracks when
    // they survive.
    let check_sum: f64 = tracks.iter().map(|t| t.track_weight).sum();
    debug_assert!((check_sum - 1.0).abs() <= WEIGHT_TOLERANCE * 10.0);

    Ok(ScoringConfig {
        tracks,
        performance_track: seed.performance_track.clone(),
        opportunity_track: seed.opportunity_track.clone(),
    })
}

/// Paired (factor score, success metric) values across entities holding both.
fn paired_values(
    factor_scores: &MetricSet,
    success_metrics: &MetricSet,
    factor: &str,
    success_metric: &str,
) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for entity in factor_scores.entities_with(factor) {
        let Some(x) = factor_scores.value(entity, factor) else {
            continue;
        };
        let Some(y) = success_metrics.value(entity, success_metric) else {
            continue;
        };
        xs.push(x);
        ys.push(y);
    }
    (xs, ys)
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Pearson correlation coefficient.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / nf;
    let mean_y = ys[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < 1e-10 {
        0.0
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}

/// Spearman rank correlation with midranks for ties.
pub fn spearman(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let rx = midranks(&xs[..n]);
    let ry = midranks(&ys[..n]);
    pearson(&rx, &ry)
}

/// Assign 1-based ranks, averaging over ties.
fn midranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        values[i]
            .partial_cmp(&values[j])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(i.cmp(&j))
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Ranks i+1 ..= j+1 share the midrank.
        let midrank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = midrank;
        }
        i = j + 1;
    }
    ranks
}

/// Two-sided p-value for r via the Student-t transform with n−2 df.
pub fn two_sided_p(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let r = r.clamp(-0.999_999, 0.999_999);
    let t = r * (df / (1.0 - r * r)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackSeed;
    use crate::metric::{MetricRecord, MetricSource};

    fn factor_set(factor: &str, scores: &[(&str, f64)]) -> MetricSet {
        let mut set = MetricSet::new();
        for (entity, score) in scores {
            set.upsert(MetricRecord::observed(
                *entity,
                factor,
                *score,
                30,
                MetricSource::Survey,
            ));
        }
        set
    }

    #[test]
    fn pearson_on_linear_data_is_one() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        assert!((pearson(&xs, &ys) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn spearman_handles_monotone_nonlinear_data() {
        let xs: Vec<f64> = (1..=15).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| x.exp()).collect();
        // Nonlinear but monotone: Spearman 1.0, Pearson well below.
        assert!((spearman(&xs, &ys) - 1.0).abs() < 1e-12);
        assert!(pearson(&xs, &ys) < 0.9);
    }

    #[test]
    fn midranks_average_ties() {
        let ranks = midranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
    }

    #[test]
    fn p_value_small_for_strong_correlation() {
        assert!(two_sided_p(0.9, 20) < 0.001);
        assert!(two_sided_p(0.1, 12) > 0.5);
    }

    fn two_factor_seed() -> ScoringConfigSeed {
        ScoringConfigSeed {
            tracks: vec![TrackSeed {
                name: "opportunity".to_string(),
                allotment: 1.0,
                factors: vec![
                    FactorDefinition {
                        name: "adult_appeal".to_string(),
                        candidate_success_metrics: vec!["order_volume".to_string()],
                        weight: None,
                    },
                    FactorDefinition {
                        name: "shareability".to_string(),
                        candidate_success_metrics: vec!["order_volume".to_string()],
                        weight: None,
                    },
                ],
            }],
            performance_track: "opportunity".to_string(),
            opportunity_track: "opportunity".to_string(),
            inclusion_threshold: 0.10,
            min_pair_entities: 10,
        }
    }

    #[test]
    fn weak_factor_is_excluded_but_audited() {
        let entities: Vec<String> = (0..12).map(|i| format!("dish:{i}")).collect();
        let mut factors = MetricSet::new();
        let mut success = MetricSet::new();
        for (i, entity) in entities.iter().enumerate() {
            let x = 1.0 + (i % 5) as f64;
            // adult_appeal tracks order volume; shareability is flat.
            factors.upsert(MetricRecord::observed(
                entity.clone(),
                "adult_appeal",
                x,
                30,
                MetricSource::Survey,
            ));
            factors.upsert(MetricRecord::observed(
                entity.clone(),
                "shareability",
                3.0,
                30,
                MetricSource::Survey,
            ));
            success.upsert(MetricRecord::observed(
                entity.clone(),
                "order_volume",
                40.0 * x + (i % 3) as f64,
                120,
                MetricSource::Behavioral,
            ));
        }

        let mut diagnostics = RunDiagnostics::new();
        let outcome =
            validate_factors(&two_factor_seed(), &factors, &success, &mut diagnostics).unwrap();

        // Both factors appear in the audit trail.
        assert_eq!(outcome.audit.len(), 2);
        let share = outcome
            .impacts
            .iter()
            .find(|i| i.factor == "shareability")
            .unwrap();
        assert!(!share.included);

        // Only the strong factor survives, with the whole track weight.
        let track = outcome.config.track("opportunity").unwrap();
        assert_eq!(track.components.len(), 1);
        assert_eq!(track.components[0].name, "adult_appeal");
        assert!((track.components[0].weight.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_track_redistributes_allotment() {
        let mut seed = two_factor_seed();
        seed.tracks = vec![
            TrackSeed {
                name: "performance".to_string(),
                allotment: 0.75,
                factors: vec![FactorDefinition {
                    name: "adult_appeal".to_string(),
                    candidate_success_metrics: vec!["order_volume".to_string()],
                    weight: None,
                }],
            },
            TrackSeed {
                name: "opportunity".to_string(),
                allotment: 0.25,
                factors: vec![FactorDefinition {
                    name: "shareability".to_string(),
                    candidate_success_metrics: vec!["order_volume".to_string()],
                    weight: None,
                }],
            },
        ];
        seed.performance_track = "performance".to_string();

        let entities: Vec<String> = (0..12).map(|i| format!("dish:{i}")).collect();
        let mut factors = MetricSet::new();
        let mut success = MetricSet::new();
        for (i, entity) in entities.iter().enumerate() {
            let x = 1.0 + (i % 5) as f64;
            factors.upsert(MetricRecord::observed(
                entity.clone(),
                "adult_appeal",
                x,
                30,
                MetricSource::Survey,
            ));
            factors.upsert(MetricRecord::observed(
                entity.clone(),
                "shareability",
                3.0,
                30,
                MetricSource::Survey,
            ));
            success.upsert(MetricRecord::observed(
                entity.clone(),
                "order_volume",
                40.0 * x,
                120,
                MetricSource::Behavioral,
            ));
        }

        let mut diagnostics = RunDiagnostics::new();
        let outcome = validate_factors(&seed, &factors, &success, &mut diagnostics).unwrap();

        // Opportunity track died (constant factor, r = 0); its 25% moved to
        // performance, and the event is visible in diagnostics.
        assert_eq!(outcome.config.tracks.len(), 1);
        assert!((outcome.config.tracks[0].track_weight - 1.0).abs() < 1e-9);
        assert_eq!(diagnostics.redistributed_tracks.len(), 1);
        assert_eq!(diagnostics.redistributed_tracks[0].track, "opportunity");
    }

    #[test]
    fn impact_score_matches_worked_example() {
        // adult_appeal: r=0.301 (n=21) and r=0.446 (n=13) → impact 0.3735.
        let impact = (0.301_f64.abs() + 0.446_f64.abs()) / 2.0;
        assert!((impact - 0.3735).abs() < 1e-9);
        assert!(impact >= 0.10);
    }
}
