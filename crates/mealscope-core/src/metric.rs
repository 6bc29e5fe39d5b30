//! Canonical metric records shared across the engine.
//!
//! A [`MetricRecord`] is the single uniform representation of one observed
//! (or estimated) value for one entity and one metric name, carrying its
//! sample size and provenance. Absence of data is represented by the absence
//! of a record — never by a zero. [`MetricSet`] is the keyed store every
//! downstream component reads from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Well-known metric names used across the pipeline.
pub mod names {
    pub const ORDER_VOLUME: &str = "order_volume";
    pub const AVG_RATING: &str = "avg_rating";
    pub const REPEAT_RATE_PCT: &str = "repeat_rate_pct";
    pub const PARTNER_COUNT: &str = "partner_count";
    pub const CUISINE_COUNT: &str = "cuisine_count";
    pub const DISH_COUNT: &str = "dish_count";
    pub const WISHLIST_PCT: &str = "wishlist_pct";
    pub const BARRIER_MENTIONS: &str = "barrier_mentions";
    pub const LATENT_DEMAND: &str = "latent_demand";
}

/// Provenance of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// Observed platform behavior (orders, ratings).
    Behavioral,
    /// Survey-derived responses.
    Survey,
    /// Estimated or modeled, not directly observed.
    Estimated,
}

impl std::fmt::Display for MetricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Behavioral => write!(f, "behavioral"),
            Self::Survey => write!(f, "survey"),
            Self::Estimated => write!(f, "estimated"),
        }
    }
}

/// One value for one (entity, metric) pair.
///
/// Invariants: `value == None` implies `sample_size == 0`; the constructors
/// enforce this. Sample sizes always come from the source data, never
/// invented here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub entity_id: String,
    pub metric: String,
    pub value: Option<f64>,
    pub sample_size: usize,
    pub source: MetricSource,
    pub is_estimated: bool,
}

impl MetricRecord {
    /// An observed value with a known underlying sample size.
    pub fn observed(
        entity_id: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        sample_size: usize,
        source: MetricSource,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            metric: metric.into(),
            value: Some(value),
            sample_size,
            source,
            is_estimated: false,
        }
    }

    /// An estimated value: retained, but flagged so consumers can discount it.
    pub fn estimated(
        entity_id: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        sample_size: usize,
        source: MetricSource,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            metric: metric.into(),
            value: Some(value),
            sample_size,
            source,
            is_estimated: true,
        }
    }
}

/// Keyed store of metric records.
///
/// One record per (entity, metric); a second insert for the same key is
/// rejected and returned to the caller rather than silently merged.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    records: HashMap<(String, String), MetricRecord>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns `Err(record)` if the (entity, metric) key is
    /// already present — duplicates are a data-quality event the caller must
    /// account for, never a silent merge.
    pub fn insert(&mut self, record: MetricRecord) -> Result<(), MetricRecord> {
        let key = (record.entity_id.clone(), record.metric.clone());
        if self.records.contains_key(&key) {
            return Err(record);
        }
        self.records.insert(key, record);
        Ok(())
    }

    /// Replace-or-insert, for engine-computed metrics (e.g. latent demand).
    pub fn upsert(&mut self, record: MetricRecord) {
        let key = (record.entity_id.clone(), record.metric.clone());
        self.records.insert(key, record);
    }

    pub fn get(&self, entity_id: &str, metric: &str) -> Option<&MetricRecord> {
        self.records
            .get(&(entity_id.to_string(), metric.to_string()))
    }

    /// Present, non-null value for an (entity, metric) pair.
    pub fn value(&self, entity_id: &str, metric: &str) -> Option<f64> {
        self.get(entity_id, metric).and_then(|r| r.value)
    }

    /// Entity ids that have a non-null value for `metric`, sorted for
    /// deterministic iteration.
    pub fn entities_with(&self, metric: &str) -> Vec<&str> {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for ((entity, m), record) in &self.records {
            if m == metric && record.value.is_some() {
                ids.insert(entity.as_str());
            }
        }
        ids.into_iter().collect()
    }

    /// All records for one entity, sorted by metric name.
    pub fn records_for(&self, entity_id: &str) -> Vec<&MetricRecord> {
        let mut out: Vec<&MetricRecord> = self
            .records
            .values()
            .filter(|r| r.entity_id == entity_id)
            .collect();
        out.sort_by(|a, b| a.metric.cmp(&b.metric));
        out
    }

    /// Records for one entity filtered by provenance, sorted by metric name.
    pub fn records_for_source(&self, entity_id: &str, source: MetricSource) -> Vec<&MetricRecord> {
        let mut out: Vec<&MetricRecord> = self
            .records
            .values()
            .filter(|r| r.entity_id == entity_id && r.source == source)
            .collect();
        out.sort_by(|a, b| a.metric.cmp(&b.metric));
        out
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in deterministic (entity, metric) order.
    pub fn iter_sorted(&self) -> Vec<&MetricRecord> {
        let mut out: Vec<&MetricRecord> = self.records.values().collect();
        out.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.metric.cmp(&b.metric))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut set = MetricSet::new();
        let first = MetricRecord::observed("dish:pho", names::AVG_RATING, 4.4, 120, MetricSource::Behavioral);
        let second = MetricRecord::observed("dish:pho", names::AVG_RATING, 3.0, 5, MetricSource::Survey);
        assert!(set.insert(first).is_ok());
        assert!(set.insert(second).is_err());
        // First record wins; nothing was merged.
        assert_eq!(set.value("dish:pho", names::AVG_RATING), Some(4.4));
    }

    #[test]
    fn absence_is_not_zero() {
        let set = MetricSet::new();
        assert_eq!(set.value("dish:pho", names::ORDER_VOLUME), None);
        assert!(set.get("dish:pho", names::ORDER_VOLUME).is_none());
    }

    #[test]
    fn entities_with_skips_null_values() {
        let mut set = MetricSet::new();
        set.upsert(MetricRecord::observed(
            "dish:pho",
            names::ORDER_VOLUME,
            310.0,
            310,
            MetricSource::Behavioral,
        ));
        set.upsert(MetricRecord {
            entity_id: "dish:ramen".to_string(),
            metric: names::ORDER_VOLUME.to_string(),
            value: None,
            sample_size: 0,
            source: MetricSource::Behavioral,
            is_estimated: false,
        });
        assert_eq!(set.entities_with(names::ORDER_VOLUME), vec!["dish:pho"]);
    }
}
