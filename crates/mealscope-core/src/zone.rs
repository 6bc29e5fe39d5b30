//! Zone readiness evaluation.
//!
//! A pure function of the zone's supply metrics, behavioral metrics, and the
//! configured thresholds. The three-way branch — behavioral data present /
//! supply only / neither — must never be collapsed: a zone with no orders
//! has not *failed* a repeat-rate check it was never eligible for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ZoneThresholdConfig;
use crate::metric::{names, MetricRecord};

/// Lifecycle tier of a service zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTier {
    /// All configured criteria pass.
    MvpReady,
    /// Exactly one criterion fails.
    NearMvp,
    /// Two or more criteria fail.
    Developing,
    /// Partners onboarded, zero behavioral records — nothing to measure yet.
    SupplyOnly,
    /// Neither supply nor behavioral records.
    NotStarted,
}

impl std::fmt::Display for ZoneTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MvpReady => write!(f, "mvp_ready"),
            Self::NearMvp => write!(f, "near_mvp"),
            Self::Developing => write!(f, "developing"),
            Self::SupplyOnly => write!(f, "supply_only"),
            Self::NotStarted => write!(f, "not_started"),
        }
    }
}

/// Per-run readiness verdict for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStatus {
    pub zone_id: String,
    pub tier: ZoneTier,
    /// Criterion name → passed. Empty for supply_only/not_started zones,
    /// which are never evaluated against behavioral thresholds.
    pub criteria_passed: BTreeMap<String, bool>,
}

/// Evaluate one zone. `supply` and `behavioral` are the zone's records,
/// already split by provenance by the caller.
pub fn evaluate_zone(
    zone_id: &str,
    supply: &[&MetricRecord],
    behavioral: &[&MetricRecord],
    cfg: &ZoneThresholdConfig,
) -> ZoneStatus {
    let has_behavioral = behavioral.iter().any(|r| r.value.is_some());
    let has_supply = supply.iter().any(|r| r.value.is_some());

    if !has_behavioral {
        // No synthetic defaults, no promotion: a zone with zero behavioral
        // records is supply_only or not_started, full stop.
        let tier = if has_supply {
            ZoneTier::SupplyOnly
        } else {
            ZoneTier::NotStarted
        };
        return ZoneStatus {
            zone_id: zone_id.to_string(),
            tier,
            criteria_passed: BTreeMap::new(),
        };
    }

    let value = |metric: &str| -> Option<f64> {
        supply
            .iter()
            .chain(behavioral.iter())
            .find(|r| r.metric == metric)
            .and_then(|r| r.value)
    };

    // A criterion whose metric is absent fails: it cannot pass unmeasured.
    let mut criteria_passed = BTreeMap::new();
    for (criterion, metric, minimum) in [
        ("partners", names::PARTNER_COUNT, cfg.min_partners),
        ("cuisines", names::CUISINE_COUNT, cfg.min_cuisines),
        ("dishes", names::DISH_COUNT, cfg.min_dishes),
        ("rating", names::AVG_RATING, cfg.min_rating),
        ("repeat_rate", names::REPEAT_RATE_PCT, cfg.min_repeat_rate_pct),
    ] {
        let passed = value(metric).is_some_and(|v| v >= minimum);
        criteria_passed.insert(criterion.to_string(), passed);
    }

    let failures = criteria_passed.values().filter(|&&passed| !passed).count();
    let tier = match failures {
        0 => ZoneTier::MvpReady,
        1 => ZoneTier::NearMvp,
        _ => ZoneTier::Developing,
    };

    ZoneStatus {
        zone_id: zone_id.to_string(),
        tier,
        criteria_passed,
    }
}
