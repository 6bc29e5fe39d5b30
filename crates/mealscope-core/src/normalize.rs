//! Metric normalization: raw tabular sources → uniform [`MetricRecord`]s.
//!
//! Each source is a flat table with an entity-identifying column and one or
//! more metric columns, plus an optional sample-size column (row count
//! feeding an aggregate). This is the only place unit conversion happens —
//! every metric name has one declared canonical unit, and nothing downstream
//! re-interprets raw scale.
//!
//! Failure semantics: an unparseable numeric cell produces no record for
//! that (entity, metric) pair and bumps the source's skipped-row count. A
//! bad row never aborts the pass.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::diagnostics::RunDiagnostics;
use crate::metric::{MetricRecord, MetricSet, MetricSource};

/// Canonical unit for a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// A plain count. Canonical as-is.
    Count,
    /// A 1–5 rating or factor score. Canonical as-is.
    Rating,
    /// A percentage, canonical on the 0–100 scale.
    Percent {
        /// Source expresses the value on the 0–1 scale and needs ×100.
        zero_to_one: bool,
    },
}

/// Maps one source column to a canonical metric name and unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub column: String,
    pub metric: String,
    pub unit: Unit,
}

/// Schema of one raw tabular source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub entity_column: String,
    /// Column carrying the row count feeding each aggregate. When absent,
    /// ratio/rating metrics get `sample_size = 0` and are flagged estimated
    /// — a sample size is never invented.
    pub sample_size_column: Option<String>,
    pub columns: Vec<ColumnSpec>,
}

/// Minimum sample sizes below which a value is flagged estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Floor for percentage/ratio/rating metrics.
    pub min_sample_ratio: usize,
    /// Floor for count metrics.
    pub min_sample_count: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_sample_ratio: 10,
            min_sample_count: 1,
        }
    }
}

/// An in-memory raw table, one entity per row.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Source name used in diagnostics (e.g. `"orders.csv"`).
    pub name: String,
    /// Provenance stamped on every record from this table.
    pub provenance: MetricSource,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse comma-separated text into a raw table. The first line is the
    /// header. Blank lines are ignored.
    pub fn from_csv_str(name: impl Into<String>, provenance: MetricSource, text: &str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<String> = lines
            .next()
            .map(|l| l.split(',').map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = lines
            .map(|l| l.split(',').map(|c| c.trim().to_string()).collect())
            .collect();
        Self {
            name: name.into(),
            provenance,
            header,
            rows,
        }
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h == column)
    }
}

/// Normalize one raw table into `records`, accumulating data-quality events
/// into `diagnostics`.
pub fn normalize_table(
    table: &RawTable,
    schema: &TableSchema,
    cfg: NormalizerConfig,
    records: &mut MetricSet,
    diagnostics: &mut RunDiagnostics,
) {
    let Some(entity_idx) = table.column_index(&schema.entity_column) else {
        warn!(
            "source {}: entity column '{}' not found, skipping entire table",
            table.name, schema.entity_column
        );
        for _ in &table.rows {
            diagnostics.record_skipped_row(&table.name);
        }
        return;
    };
    let sample_idx = schema
        .sample_size_column
        .as_ref()
        .and_then(|c| table.column_index(c));

    for row in &table.rows {
        let Some(entity_id) = row.get(entity_idx).filter(|v| !v.is_empty()) else {
            diagnostics.record_skipped_row(&table.name);
            continue;
        };

        let row_sample: Option<usize> = match sample_idx {
            Some(idx) => match row.get(idx).map(|v| v.parse::<usize>()) {
                Some(Ok(n)) => Some(n),
                Some(Err(_)) | None => {
                    diagnostics.record_skipped_row(&table.name);
                    continue;
                }
            },
            None => None,
        };

        for spec in &schema.columns {
            let Some(col_idx) = table.column_index(&spec.column) else {
                continue;
            };
            let Some(cell) = row.get(col_idx) else {
                continue;
            };
            if cell.is_empty() {
                // Missing is missing: no record, no zero.
                continue;
            }
            let Ok(raw) = cell.parse::<f64>() else {
                diagnostics.record_skipped_row(&table.name);
                warn!(
                    "source {}: unparseable value '{}' for ({}, {})",
                    table.name, cell, entity_id, spec.metric
                );
                continue;
            };

            let value = canonicalize(raw, spec.unit);
            let (sample_size, minimum) = match spec.unit {
                Unit::Count => (row_sample.unwrap_or(1), cfg.min_sample_count),
                Unit::Rating | Unit::Percent { .. } => {
                    (row_sample.unwrap_or(0), cfg.min_sample_ratio)
                }
            };

            let record = if sample_size < minimum {
                MetricRecord::estimated(
                    entity_id.clone(),
                    spec.metric.clone(),
                    value,
                    sample_size,
                    table.provenance,
                )
            } else {
                MetricRecord::observed(
                    entity_id.clone(),
                    spec.metric.clone(),
                    value,
                    sample_size,
                    table.provenance,
                )
            };

            if records.insert(record).is_err() {
                diagnostics.record_duplicate(&table.name);
                warn!(
                    "source {}: duplicate record for ({}, {}), keeping first",
                    table.name, entity_id, spec.metric
                );
            }
        }
    }
}

/// Normalize a batch of tables into one metric set.
pub fn normalize_tables(
    tables: &[(RawTable, TableSchema)],
    cfg: NormalizerConfig,
    diagnostics: &mut RunDiagnostics,
) -> MetricSet {
    let mut records = MetricSet::new();
    for (table, schema) in tables {
        normalize_table(table, schema, cfg, &mut records, diagnostics);
    }
    records
}

/// Convert a raw value to the metric's canonical unit. Percentages are
/// canonical on the 0–100 scale.
fn canonicalize(raw: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Count | Unit::Rating => raw,
        Unit::Percent { zero_to_one } => {
            if zero_to_one {
                raw * 100.0
            } else {
                raw
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::names;

    fn orders_schema() -> TableSchema {
        TableSchema {
            entity_column: "dish_id".to_string(),
            sample_size_column: Some("orders".to_string()),
            columns: vec![
                ColumnSpec {
                    column: "avg_rating".to_string(),
                    metric: names::AVG_RATING.to_string(),
                    unit: Unit::Rating,
                },
                ColumnSpec {
                    column: "repeat_rate".to_string(),
                    metric: names::REPEAT_RATE_PCT.to_string(),
                    unit: Unit::Percent { zero_to_one: true },
                },
            ],
        }
    }

    #[test]
    fn normalizes_units_and_carries_sample_size() {
        let table = RawTable::from_csv_str(
            "orders.csv",
            MetricSource::Behavioral,
            "dish_id,orders,avg_rating,repeat_rate\n\
             dish:pho,120,4.4,0.22\n\
             dish:ramen,8,3.9,0.10\n",
        );
        let mut diagnostics = RunDiagnostics::new();
        let records = normalize_tables(
            &[(table, orders_schema())],
            NormalizerConfig::default(),
            &mut diagnostics,
        );

        let pho = records.get("dish:pho", names::REPEAT_RATE_PCT).unwrap();
        assert_eq!(pho.value, Some(22.0));
        assert_eq!(pho.sample_size, 120);
        assert!(!pho.is_estimated);

        // 8 orders is below the ratio floor of 10: kept, flagged estimated.
        let ramen = records.get("dish:ramen", names::AVG_RATING).unwrap();
        assert!(ramen.is_estimated);
        assert_eq!(ramen.sample_size, 8);
        assert_eq!(diagnostics.total_skipped_rows(), 0);
    }

    #[test]
    fn unparseable_cell_skips_pair_not_pass() {
        let table = RawTable::from_csv_str(
            "orders.csv",
            MetricSource::Behavioral,
            "dish_id,orders,avg_rating,repeat_rate\n\
             dish:pho,120,not_a_number,0.22\n\
             dish:ramen,40,4.1,0.15\n",
        );
        let mut diagnostics = RunDiagnostics::new();
        let records = normalize_tables(
            &[(table, orders_schema())],
            NormalizerConfig::default(),
            &mut diagnostics,
        );

        // The bad cell loses only its own (entity, metric) pair.
        assert!(records.get("dish:pho", names::AVG_RATING).is_none());
        assert!(records.get("dish:pho", names::REPEAT_RATE_PCT).is_some());
        assert!(records.get("dish:ramen", names::AVG_RATING).is_some());
        assert_eq!(diagnostics.skipped_rows.get("orders.csv"), Some(&1));
    }

    #[test]
    fn empty_cell_produces_no_record() {
        let table = RawTable::from_csv_str(
            "survey.csv",
            MetricSource::Survey,
            "dish_id,n,wishlist_pct\n\
             dish:pho,35,18\n\
             dish:ramen,12,\n",
        );
        let schema = TableSchema {
            entity_column: "dish_id".to_string(),
            sample_size_column: Some("n".to_string()),
            columns: vec![ColumnSpec {
                column: "wishlist_pct".to_string(),
                metric: names::WISHLIST_PCT.to_string(),
                unit: Unit::Percent { zero_to_one: false },
            }],
        };
        let mut diagnostics = RunDiagnostics::new();
        let records = normalize_tables(
            &[(table, schema)],
            NormalizerConfig::default(),
            &mut diagnostics,
        );
        assert_eq!(records.value("dish:pho", names::WISHLIST_PCT), Some(18.0));
        assert!(records.get("dish:ramen", names::WISHLIST_PCT).is_none());
        assert_eq!(diagnostics.total_skipped_rows(), 0);
    }

    #[test]
    fn missing_sample_column_never_invents_a_sample_size() {
        let table = RawTable::from_csv_str(
            "ratings.csv",
            MetricSource::Behavioral,
            "dish_id,avg_rating\ndish:pho,4.4\n",
        );
        let schema = TableSchema {
            entity_column: "dish_id".to_string(),
            sample_size_column: None,
            columns: vec![ColumnSpec {
                column: "avg_rating".to_string(),
                metric: names::AVG_RATING.to_string(),
                unit: Unit::Rating,
            }],
        };
        let mut diagnostics = RunDiagnostics::new();
        let records = normalize_tables(
            &[(table, schema)],
            NormalizerConfig::default(),
            &mut diagnostics,
        );
        let record = records.get("dish:pho", names::AVG_RATING).unwrap();
        assert_eq!(record.sample_size, 0);
        assert!(record.is_estimated);
    }
}
