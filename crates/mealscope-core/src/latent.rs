//! Latent demand aggregation: three sparse signals → one coarse 1–5 score.
//!
//! Open-text mention counts, wishlist percentages, and conversion-barrier
//! mentions arrive with very different sample sizes and reliability. Each is
//! capped at its saturation point, scaled to a 0–5 sub-score, blended with
//! the configured sub-weights, then rounded to the nearest integer and
//! clamped to [1,5]. The output is intentionally ordinal: the underlying
//! mention counts are often single digits, and finer precision would be
//! false precision.
//!
//! An entity with no data on any sub-signal gets the configured neutral
//! default rather than `null` — latent demand is asked of dishes that may
//! not exist on the platform yet, and opportunity scoring must remain
//! computable for them.

use serde::{Deserialize, Serialize};

use crate::config::LatentDemandConfig;

/// Raw latent demand signals for one entity. `None` means the entity was
/// absent from that source, which is different from an observed zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatentSignals {
    pub mentions: Option<u64>,
    /// Wishlist percentage on the canonical 0–100 scale.
    pub wishlist_pct: Option<f64>,
    pub barrier_count: Option<u64>,
}

impl LatentSignals {
    pub fn is_empty(&self) -> bool {
        self.mentions.is_none() && self.wishlist_pct.is_none() && self.barrier_count.is_none()
    }
}

/// Full aggregation breakdown, kept for report transparency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentDemandBreakdown {
    pub entity_id: String,
    pub mention_score: f64,
    pub wishlist_score: f64,
    pub barrier_score: f64,
    pub weighted_raw: f64,
    /// Final ordinal score in {1,2,3,4,5}.
    pub score: u8,
    /// Entity had no data on any sub-signal; score is the neutral default.
    pub defaulted: bool,
}

/// Aggregate one entity's latent demand signals.
pub fn latent_demand(
    entity_id: &str,
    signals: LatentSignals,
    cfg: &LatentDemandConfig,
) -> LatentDemandBreakdown {
    if signals.is_empty() {
        return LatentDemandBreakdown {
            entity_id: entity_id.to_string(),
            mention_score: 0.0,
            wishlist_score: 0.0,
            barrier_score: 0.0,
            weighted_raw: 0.0,
            score: cfg.neutral_default.clamp(1, 5),
            defaulted: true,
        };
    }

    let mention_score = saturating_subscore(
        signals.mentions.unwrap_or(0) as f64,
        cfg.mention_saturation,
    );
    let wishlist_score = saturating_subscore(
        signals.wishlist_pct.unwrap_or(0.0),
        cfg.wishlist_saturation_pct,
    );
    let barrier_score = saturating_subscore(
        signals.barrier_count.unwrap_or(0) as f64,
        cfg.barrier_saturation,
    );

    let weighted_raw = mention_score * cfg.mention_weight
        + wishlist_score * cfg.wishlist_weight
        + barrier_score * cfg.barrier_weight;

    let score = (weighted_raw.round() as i64).clamp(1, 5) as u8;

    LatentDemandBreakdown {
        entity_id: entity_id.to_string(),
        mention_score,
        wishlist_score,
        barrier_score,
        weighted_raw,
        score,
        defaulted: false,
    }
}

/// `min(value / saturation, 1) * 5`.
fn saturating_subscore(value: f64, saturation: f64) -> f64 {
    if saturation <= 0.0 {
        return 0.0;
    }
    (value / saturation).clamp(0.0, 1.0) * 5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_example_mentions_only() {
        // 18 mentions, not in the wishlist survey, no barriers:
        // mentions_score = min(18/50, 1) * 5 = 1.8; raw = 1.8 * 0.45 = 0.81 → 1.
        let breakdown = latent_demand(
            "dish:birria_tacos",
            LatentSignals {
                mentions: Some(18),
                wishlist_pct: Some(0.0),
                barrier_count: Some(0),
            },
            &LatentDemandConfig::default(),
        );
        assert!((breakdown.mention_score - 1.8).abs() < 1e-12);
        assert!((breakdown.weighted_raw - 0.81).abs() < 1e-12);
        assert_eq!(breakdown.score, 1);
        assert!(!breakdown.defaulted);
    }

    #[test]
    fn no_data_gets_neutral_default_not_null() {
        let breakdown = latent_demand(
            "dish:unlisted",
            LatentSignals::default(),
            &LatentDemandConfig::default(),
        );
        assert!(breakdown.defaulted);
        assert_eq!(breakdown.score, 1);
    }

    #[test]
    fn saturated_signals_cap_at_five() {
        let breakdown = latent_demand(
            "dish:hotpot",
            LatentSignals {
                mentions: Some(500),
                wishlist_pct: Some(80.0),
                barrier_count: Some(1000),
            },
            &LatentDemandConfig::default(),
        );
        assert_eq!(breakdown.score, 5);
        assert!((breakdown.weighted_raw - 5.0).abs() < 1e-12);
    }

    #[test]
    fn output_is_always_an_integer_in_range() {
        let cfg = LatentDemandConfig::default();
        for mentions in [0u64, 3, 18, 49, 50, 200] {
            for wishlist in [0.0, 5.0, 19.9, 20.0, 60.0] {
                for barriers in [0u64, 12, 99, 100, 400] {
                    let b = latent_demand(
                        "dish:any",
                        LatentSignals {
                            mentions: Some(mentions),
                            wishlist_pct: Some(wishlist),
                            barrier_count: Some(barriers),
                        },
                        &cfg,
                    );
                    assert!((1..=5).contains(&b.score));
                }
            }
        }
    }
}
