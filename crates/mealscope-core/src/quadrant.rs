//! Quadrant classification: two score axes → one named action category.
//!
//! Entities with performance data land in one of four quadrants; entities
//! not currently offered (no performance score) collapse to a single-axis
//! Prospect/Watch decision. Boundary values classify into the *higher*
//! quadrant — ties favor investment over deprioritization, an explicit
//! policy choice.

use serde::{Deserialize, Serialize};

use crate::config::QuadrantThresholds;

/// Named action category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// High performance, high opportunity: core driver, invest first.
    Priority,
    /// High performance, low opportunity: protect and boost demand.
    Protect,
    /// Low performance, high opportunity: develop the preference driver.
    Develop,
    /// Low performance, low opportunity: monitor or deprioritize.
    Monitor,
    /// Not currently offered, opportunity clears the bar: recruit.
    Prospect,
    /// Not currently offered, opportunity below the bar: watch.
    Watch,
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Priority => write!(f, "priority"),
            Self::Protect => write!(f, "protect"),
            Self::Develop => write!(f, "develop"),
            Self::Monitor => write!(f, "monitor"),
            Self::Prospect => write!(f, "prospect"),
            Self::Watch => write!(f, "watch"),
        }
    }
}

/// Classify one entity. `performance` is `None` for entities not currently
/// available on the platform; `opportunity` is always present.
pub fn classify(
    performance: Option<f64>,
    opportunity: f64,
    thresholds: QuadrantThresholds,
) -> Quadrant {
    let high_opportunity = opportunity >= thresholds.opportunity;
    match performance {
        Some(perf) => {
            let high_performance = perf >= thresholds.performance;
            match (high_performance, high_opportunity) {
                (true, true) => Quadrant::Priority,
                (true, false) => Quadrant::Protect,
                (false, true) => Quadrant::Develop,
                (false, false) => Quadrant::Monitor,
            }
        }
        None => {
            if high_opportunity {
                Quadrant::Prospect
            } else {
                Quadrant::Watch
            }
        }
    }
}
