//! Run-level diagnostics accumulation.
//!
//! Field-level and row-level data-quality events are never fatal: they are
//! collected here and shipped with the run report so report consumers can
//! judge how trustworthy each output is. Only configuration-level structural
//! errors abort a run (see [`crate::config::ConfigError`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A correlation or bucket computed below the minimum sample floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsufficientSample {
    /// What was being computed (e.g. `"adult_appeal vs order_volume"`).
    pub context: String,
    pub n: usize,
    pub minimum: usize,
}

/// A track whose weight was redistributed because no factor cleared the
/// inclusion threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedistributedTrack {
    pub track: String,
    pub allotment: f64,
}

/// Accumulated per-run data-quality events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Unparseable rows skipped per source table.
    pub skipped_rows: BTreeMap<String, u64>,
    /// Duplicate (entity, metric) records rejected per source table.
    pub duplicate_records: BTreeMap<String, u64>,
    /// Computations retained but flagged low-confidence.
    pub insufficient_samples: Vec<InsufficientSample>,
    /// Tracks whose weight was redistributed to the remaining tracks.
    pub redistributed_tracks: Vec<RedistributedTrack>,
    /// Entities excluded from bucketing for lack of a driver value, per driver.
    pub null_driver_entities: BTreeMap<String, u64>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skipped_row(&mut self, source: &str) {
        *self.skipped_rows.entry(source.to_string()).or_insert(0) += 1;
    }

    pub fn record_duplicate(&mut self, source: &str) {
        *self
            .duplicate_records
            .entry(source.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_insufficient_sample(&mut self, context: impl Into<String>, n: usize, minimum: usize) {
        self.insufficient_samples.push(InsufficientSample {
            context: context.into(),
            n,
            minimum,
        });
    }

    pub fn record_redistributed_track(&mut self, track: impl Into<String>, allotment: f64) {
        self.redistributed_tracks.push(RedistributedTrack {
            track: track.into(),
            allotment,
        });
    }

    pub fn record_null_driver(&mut self, driver: &str, count: u64) {
        *self
            .null_driver_entities
            .entry(driver.to_string())
            .or_insert(0) += count;
    }

    /// Fold another diagnostics report into this one.
    pub fn merge(&mut self, other: RunDiagnostics) {
        for (source, n) in other.skipped_rows {
            *self.skipped_rows.entry(source).or_insert(0) += n;
        }
        for (source, n) in other.duplicate_records {
            *self.duplicate_records.entry(source).or_insert(0) += n;
        }
        self.insufficient_samples.extend(other.insufficient_samples);
        self.redistributed_tracks.extend(other.redistributed_tracks);
        for (driver, n) in other.null_driver_entities {
            *self.null_driver_entities.entry(driver).or_insert(0) += n;
        }
    }

    pub fn total_skipped_rows(&self) -> u64 {
        self.skipped_rows.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_counts() {
        let mut a = RunDiagnostics::new();
        a.record_skipped_row("orders.csv");
        a.record_skipped_row("orders.csv");

        let mut b = RunDiagnostics::new();
        b.record_skipped_row("orders.csv");
        b.record_insufficient_sample("kids_happy vs avg_rating", 6, 10);

        a.merge(b);
        assert_eq!(a.skipped_rows.get("orders.csv"), Some(&3));
        assert_eq!(a.insufficient_samples.len(), 1);
        assert_eq!(a.total_skipped_rows(), 3);
    }
}
