//! Threshold discovery: bucket entities by an ordinal driver and find where
//! outcomes jump.
//!
//! The inflection point is a descriptive statistic — the bucket boundary
//! with the largest marginal improvement in an outcome's bucket mean — not a
//! statistical change-point test. It is reported alongside, and never
//! conflated with, the separately-configured business target: output always
//! carries both, so consumers can say "data shows X, business targets Y".
//!
//! When two drivers are correlated with each other (partner count and
//! cuisine count usually are), bucket comparisons on one are not independent
//! of the other. [`driver_confounds`] surfaces that correlation as a
//! required diagnostic.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{DiscoveryConfig, DriverSpec};
use crate::correlation::pearson;
use crate::diagnostics::RunDiagnostics;
use crate::entity::Entity;
use crate::metric::MetricSet;

/// Sample floor below which a bucket mean is retained but flagged.
pub const MIN_BUCKET_N: usize = 10;

/// Mean of one outcome metric within one bucket, with the contributing count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMean {
    pub mean: f64,
    pub n: usize,
    /// `n < MIN_BUCKET_N`: retained, but too few entities to lean on.
    pub low_confidence: bool,
}

/// One ordinal range of the driver metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBucket {
    pub driver_metric: String,
    pub label: String,
    /// Inclusive lower bound; `None` for the open-bottomed under-range bucket.
    pub lower: Option<f64>,
    /// Exclusive upper bound; `None` for the open-ended last bucket.
    pub upper: Option<f64>,
    pub entity_count: usize,
    pub outcome_means: BTreeMap<String, OutcomeMean>,
}

/// The largest marginal jump for one outcome metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflectionPoint {
    pub outcome_metric: String,
    /// Driver boundary at which the jump occurs (lower edge of the bucket
    /// the outcome jumps into).
    pub boundary: f64,
    pub from_bucket: String,
    pub to_bucket: String,
    /// Bucket-to-bucket improvement of the outcome mean (always positive).
    pub jump: f64,
}

/// Bucket report for one driver. `business_target` is copied straight from
/// configuration — a policy decision, independent of `inflections` even when
/// numerically equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverBucketReport {
    pub driver_metric: String,
    pub business_target: f64,
    pub buckets: Vec<ThresholdBucket>,
    pub inflections: Vec<InflectionPoint>,
    /// Entities excluded for lack of a driver value.
    pub excluded_null_driver: usize,
}

/// Correlation between two driver metrics across entities holding both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverCorrelation {
    pub driver_a: String,
    pub driver_b: String,
    pub pearson_r: f64,
    pub n: usize,
    /// `|r| > 0.3`: bucket comparisons on these drivers are not independent.
    pub flagged: bool,
}

/// Bucket all entities with a non-null driver value and compute per-bucket
/// outcome means. Entities without a driver value are excluded and counted.
pub fn discover(
    entities: &[Entity],
    spec: &DriverSpec,
    outcome_metrics: &[String],
    metrics: &MetricSet,
    diagnostics: &mut RunDiagnostics,
) -> DriverBucketReport {
    let mut buckets: Vec<ThresholdBucket> = bucket_shells(spec);
    let mut members: Vec<Vec<&Entity>> = vec![Vec::new(); buckets.len()];
    let mut excluded = 0usize;

    for entity in entities {
        let Some(driver_value) = metrics.value(&entity.id, &spec.metric) else {
            excluded += 1;
            continue;
        };
        if let Some(idx) = bucket_index(&spec.boundaries, driver_value) {
            members[idx].push(entity);
        }
    }
    if excluded > 0 {
        diagnostics.record_null_driver(&spec.metric, excluded as u64);
    }

    for (bucket, entities_in_bucket) in buckets.iter_mut().zip(&members) {
        bucket.entity_count = entities_in_bucket.len();
        for outcome in outcome_metrics {
            let values: Vec<f64> = entities_in_bucket
                .iter()
                .filter_map(|e| metrics.value(&e.id, outcome))
                .collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len();
            let mean = values.iter().sum::<f64>() / n as f64;
            let low_confidence = n < MIN_BUCKET_N;
            if low_confidence {
                warn!(
                    "{} bucket {}: {} mean rests on n={} (minimum {})",
                    spec.metric, bucket.label, outcome, n, MIN_BUCKET_N
                );
                diagnostics.record_insufficient_sample(
                    format!("{} [{}] vs {}", spec.metric, bucket.label, outcome),
                    n,
                    MIN_BUCKET_N,
                );
            }
            bucket.outcome_means.insert(
                outcome.clone(),
                OutcomeMean {
                    mean,
                    n,
                    low_confidence,
                },
            );
        }
    }

    let inflections = outcome_metrics
        .iter()
        .filter_map(|outcome| largest_jump(&buckets, outcome))
        .collect();

    DriverBucketReport {
        driver_metric: spec.metric.clone(),
        business_target: spec.business_target,
        buckets,
        inflections,
        excluded_null_driver: excluded,
    }
}

/// Run discovery for every configured driver.
pub fn discover_all(
    entities: &[Entity],
    cfg: &DiscoveryConfig,
    metrics: &MetricSet,
    diagnostics: &mut RunDiagnostics,
) -> Vec<DriverBucketReport> {
    cfg.drivers
        .iter()
        .map(|spec| discover(entities, spec, &cfg.outcome_metrics, metrics, diagnostics))
        .collect()
}

/// Pairwise correlation between configured drivers — the confounding
/// disclosure that must accompany every bucket report.
pub fn driver_confounds(cfg: &DiscoveryConfig, metrics: &MetricSet) -> Vec<DriverCorrelation> {
    let mut out = Vec::new();
    for i in 0..cfg.drivers.len() {
        for j in (i + 1)..cfg.drivers.len() {
            let a = &cfg.drivers[i].metric;
            let b = &cfg.drivers[j].metric;
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for entity in metrics.entities_with(a) {
                let Some(x) = metrics.value(entity, a) else {
                    continue;
                };
                let Some(y) = metrics.value(entity, b) else {
                    continue;
                };
                xs.push(x);
                ys.push(y);
            }
            let r = pearson(&xs, &ys);
            out.push(DriverCorrelation {
                driver_a: a.clone(),
                driver_b: b.clone(),
                pearson_r: r,
                n: xs.len(),
                flagged: r.abs() > 0.3,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bucket_shells(spec: &DriverSpec) -> Vec<ThresholdBucket> {
    let Some(&first) = spec.boundaries.first() else {
        return Vec::new();
    };
    let mut buckets = Vec::with_capacity(spec.boundaries.len() + 1);
    // Under-range bucket, so a zone below the first boundary is never
    // mislabeled as belonging to the first configured range.
    buckets.push(ThresholdBucket {
        driver_metric: spec.metric.clone(),
        label: format!("<{}", format_edge(first)),
        lower: None,
        upper: Some(first),
        entity_count: 0,
        outcome_means: BTreeMap::new(),
    });
    for (i, &lower) in spec.boundaries.iter().enumerate() {
        let upper = spec.boundaries.get(i + 1).copied();
        buckets.push(ThresholdBucket {
            driver_metric: spec.metric.clone(),
            label: bucket_label(lower, upper),
            lower: Some(lower),
            upper,
            entity_count: 0,
            outcome_means: BTreeMap::new(),
        });
    }
    buckets
}

/// Index of the bucket containing `value` within the shells produced by
/// [`bucket_shells`]. Lower-inclusive, upper-exclusive; index 0 is the
/// under-range bucket. `None` only when no boundaries are configured.
fn bucket_index(boundaries: &[f64], value: f64) -> Option<usize> {
    boundaries.first()?;
    let mut idx = 0;
    for (i, &lower) in boundaries.iter().enumerate() {
        if value >= lower {
            idx = i + 1;
        } else {
            break;
        }
    }
    Some(idx)
}

fn bucket_label(lower: f64, upper: Option<f64>) -> String {
    match upper {
        Some(upper) => {
            // Ordinal drivers are counts; "3-4" reads better than "3-4.99".
            let hi = upper - 1.0;
            if hi > lower {
                format!("{}-{}", format_edge(lower), format_edge(hi))
            } else {
                format_edge(lower)
            }
        }
        None => format!("{}+", format_edge(lower)),
    }
}

fn format_edge(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Largest bucket-to-bucket improvement for one outcome, over consecutive
/// buckets that both have data. `None` with fewer than two populated buckets,
/// and `None` when no consecutive pair improves at all: a uniformly declining
/// outcome has no inflection to report.
fn largest_jump(buckets: &[ThresholdBucket], outcome: &str) -> Option<InflectionPoint> {
    let populated: Vec<(&ThresholdBucket, OutcomeMean)> = buckets
        .iter()
        .filter_map(|b| b.outcome_means.get(outcome).map(|m| (b, *m)))
        .collect();
    if populated.len() < 2 {
        return None;
    }

    let mut best: Option<InflectionPoint> = None;
    for window in populated.windows(2) {
        let (prev, prev_mean) = &window[0];
        let (next, next_mean) = &window[1];
        let jump = next_mean.mean - prev_mean.mean;
        if jump <= 0.0 {
            continue;
        }
        // `next` has a populated bucket before it, so it is never the
        // under-range bucket and always carries a lower boundary.
        let Some(boundary) = next.lower else {
            continue;
        };
        let better = match &best {
            Some(b) => jump > b.jump,
            None => true,
        };
        if better {
            best = Some(InflectionPoint {
                outcome_metric: outcome.to_string(),
                boundary,
                from_bucket: prev.label.clone(),
                to_bucket: next.label.clone(),
                jump,
            });
        }
    }
    best
}
