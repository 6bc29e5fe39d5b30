pub mod buckets;
pub mod run;
pub mod validate;
pub mod zones;

use log::warn;
use std::fs;
use std::io;
use std::path::Path;

use mealscope_core::diagnostics::RunDiagnostics;
use mealscope_core::mentions::{MentionRecord, StaticMentions};
use mealscope_core::metric::{names, MetricRecord, MetricSet, MetricSource};
use mealscope_core::normalize::{
    normalize_table, ColumnSpec, NormalizerConfig, RawTable, TableSchema, Unit,
};
use mealscope_core::{parse_entity_kind, Entity};

/// Everything the engine needs, loaded from one input directory.
pub struct LoadedInputs {
    pub entities: Vec<Entity>,
    pub factor_scores: MetricSet,
    pub observed: MetricSet,
    pub mentions: StaticMentions,
    pub diagnostics: RunDiagnostics,
}

/// Load the fixed-name input tables from `dir`. `entities.csv` is required;
/// every other table is optional and skipped with a warning when absent.
pub fn load_inputs(dir: &Path) -> io::Result<LoadedInputs> {
    let mut diagnostics = RunDiagnostics::new();
    let mut observed = MetricSet::new();

    let entities = parse_entities(
        &fs::read_to_string(dir.join("entities.csv"))?,
        &mut diagnostics,
    );

    let factor_scores = match read_optional(dir, "factors.csv")? {
        Some(text) => parse_factors(&text, &mut diagnostics),
        None => MetricSet::new(),
    };

    let cfg = NormalizerConfig::default();
    for (file, provenance, schema) in [
        ("orders.csv", MetricSource::Behavioral, orders_schema()),
        ("supply.csv", MetricSource::Behavioral, supply_schema()),
        ("survey.csv", MetricSource::Survey, survey_schema()),
    ] {
        if let Some(text) = read_optional(dir, file)? {
            let table = RawTable::from_csv_str(file, provenance, &text);
            normalize_table(&table, &schema, cfg, &mut observed, &mut diagnostics);
        }
    }

    let mentions = match read_optional(dir, "mentions.csv")? {
        Some(text) => StaticMentions::new(parse_mentions(&text, &mut diagnostics)),
        None => StaticMentions::default(),
    };

    Ok(LoadedInputs {
        entities,
        factor_scores,
        observed,
        mentions,
        diagnostics,
    })
}

fn read_optional(dir: &Path, file: &str) -> io::Result<Option<String>> {
    match fs::read_to_string(dir.join(file)) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("{file} not found in input directory, skipping");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// `entity_id,kind,parent` — parent may be empty.
fn parse_entities(text: &str, diagnostics: &mut RunDiagnostics) -> Vec<Entity> {
    let mut entities = Vec::new();
    for line in text.lines().skip(1).filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let (Some(id), Some(kind_str)) = (fields.first(), fields.get(1)) else {
            diagnostics.record_skipped_row("entities.csv");
            continue;
        };
        let Some(kind) = parse_entity_kind(kind_str) else {
            warn!("entities.csv: unknown kind '{kind_str}' for '{id}'");
            diagnostics.record_skipped_row("entities.csv");
            continue;
        };
        let entity = match fields.get(2).filter(|p| !p.is_empty()) {
            Some(parent) => Entity::with_parent(*id, kind, *parent),
            None => Entity::new(*id, kind),
        };
        entities.push(entity);
    }
    entities
}

/// `entity_id,factor,score,respondents` — long-format factor scores.
fn parse_factors(text: &str, diagnostics: &mut RunDiagnostics) -> MetricSet {
    let floor = NormalizerConfig::default().min_sample_ratio;
    let mut set = MetricSet::new();
    for line in text.lines().skip(1).filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let (Some(id), Some(factor), Some(score_str)) =
            (fields.first(), fields.get(1), fields.get(2))
        else {
            diagnostics.record_skipped_row("factors.csv");
            continue;
        };
        let Ok(score) = score_str.parse::<f64>() else {
            warn!("factors.csv: unparseable score '{score_str}' for ({id}, {factor})");
            diagnostics.record_skipped_row("factors.csv");
            continue;
        };
        let respondents = fields
            .get(3)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let record = if respondents < floor {
            MetricRecord::estimated(*id, *factor, score, respondents, MetricSource::Survey)
        } else {
            MetricRecord::observed(*id, *factor, score, respondents, MetricSource::Survey)
        };
        if set.insert(record).is_err() {
            warn!("factors.csv: duplicate score for ({id}, {factor}), keeping first");
            diagnostics.record_duplicate("factors.csv");
        }
    }
    set
}

/// `entity_id,mention_count,source_tag`.
fn parse_mentions(text: &str, diagnostics: &mut RunDiagnostics) -> Vec<MentionRecord> {
    let mut records = Vec::new();
    for line in text.lines().skip(1).filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let (Some(id), Some(count_str)) = (fields.first(), fields.get(1)) else {
            diagnostics.record_skipped_row("mentions.csv");
            continue;
        };
        let Ok(mention_count) = count_str.parse::<u64>() else {
            warn!("mentions.csv: unparseable count '{count_str}' for '{id}'");
            diagnostics.record_skipped_row("mentions.csv");
            continue;
        };
        records.push(MentionRecord {
            entity_id: (*id).to_string(),
            mention_count,
            source_tag: fields.get(2).unwrap_or(&"").to_string(),
        });
    }
    records
}

fn orders_schema() -> TableSchema {
    TableSchema {
        entity_column: "entity_id".to_string(),
        sample_size_column: Some("orders".to_string()),
        columns: vec![
            ColumnSpec {
                column: "orders".to_string(),
                metric: names::ORDER_VOLUME.to_string(),
                unit: Unit::Count,
            },
            ColumnSpec {
                column: "avg_rating".to_string(),
                metric: names::AVG_RATING.to_string(),
                unit: Unit::Rating,
            },
            ColumnSpec {
                column: "repeat_rate_pct".to_string(),
                metric: names::REPEAT_RATE_PCT.to_string(),
                unit: Unit::Percent { zero_to_one: false },
            },
        ],
    }
}

fn supply_schema() -> TableSchema {
    TableSchema {
        entity_column: "entity_id".to_string(),
        sample_size_column: None,
        columns: vec![
            ColumnSpec {
                column: "partner_count".to_string(),
                metric: names::PARTNER_COUNT.to_string(),
                unit: Unit::Count,
            },
            ColumnSpec {
                column: "cuisine_count".to_string(),
                metric: names::CUISINE_COUNT.to_string(),
                unit: Unit::Count,
            },
            ColumnSpec {
                column: "dish_count".to_string(),
                metric: names::DISH_COUNT.to_string(),
                unit: Unit::Count,
            },
        ],
    }
}

fn survey_schema() -> TableSchema {
    TableSchema {
        entity_column: "entity_id".to_string(),
        sample_size_column: Some("respondents".to_string()),
        columns: vec![
            ColumnSpec {
                column: "wishlist_pct".to_string(),
                metric: names::WISHLIST_PCT.to_string(),
                unit: Unit::Percent { zero_to_one: false },
            },
            ColumnSpec {
                column: "barrier_mentions".to_string(),
                metric: names::BARRIER_MENTIONS.to_string(),
                unit: Unit::Count,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealscope_core::EntityKind;
    use std::fs;

    fn write(dir: &Path, file: &str, content: &str) {
        fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn loads_a_minimal_input_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "entities.csv",
            "entity_id,kind,parent\n\
             dish:pho,dish_type,cuisine:vietnamese\n\
             cuisine:vietnamese,cuisine,\n\
             zone:north,zone,\n",
        );
        write(
            tmp.path(),
            "factors.csv",
            "entity_id,factor,score,respondents\n\
             dish:pho,family_fit,4.2,35\n\
             dish:pho,novelty,2.0,4\n",
        );
        write(
            tmp.path(),
            "orders.csv",
            "entity_id,orders,avg_rating,repeat_rate_pct\n\
             dish:pho,120,4.4,22\n",
        );
        write(
            tmp.path(),
            "mentions.csv",
            "entity_id,mention_count,source_tag\n\
             dish:pho,18,survey_q7_llm\n",
        );

        let inputs = load_inputs(tmp.path()).unwrap();
        assert_eq!(inputs.entities.len(), 3);
        assert_eq!(inputs.entities[0].kind, EntityKind::DishType);
        assert_eq!(
            inputs.entities[0].parent.as_deref(),
            Some("cuisine:vietnamese")
        );

        assert_eq!(inputs.factor_scores.value("dish:pho", "family_fit"), Some(4.2));
        // 4 respondents is below the floor: kept, flagged estimated.
        assert!(inputs.factor_scores.get("dish:pho", "novelty").unwrap().is_estimated);

        assert_eq!(inputs.observed.value("dish:pho", names::ORDER_VOLUME), Some(120.0));
        assert_eq!(
            inputs.observed.value("dish:pho", names::REPEAT_RATE_PCT),
            Some(22.0)
        );

        use mealscope_core::mentions::MentionSource;
        assert_eq!(inputs.mentions.mention_counts().get("dish:pho"), Some(&18));
        assert_eq!(inputs.diagnostics.total_skipped_rows(), 0);
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "entities.csv",
            "entity_id,kind,parent\n\
             dish:pho,dish_type,\n\
             dish:mystery,starship,\n",
        );
        write(
            tmp.path(),
            "factors.csv",
            "entity_id,factor,score,respondents\n\
             dish:pho,family_fit,not_a_number,35\n\
             dish:pho,family_fit,4.0,35\n\
             dish:pho,family_fit,3.0,35\n",
        );

        let inputs = load_inputs(tmp.path()).unwrap();
        // Unknown kind dropped, valid entity kept.
        assert_eq!(inputs.entities.len(), 1);
        assert_eq!(inputs.diagnostics.skipped_rows.get("entities.csv"), Some(&1));
        // First valid score wins; the duplicate is counted.
        assert_eq!(inputs.factor_scores.value("dish:pho", "family_fit"), Some(4.0));
        assert_eq!(inputs.diagnostics.skipped_rows.get("factors.csv"), Some(&1));
        assert_eq!(
            inputs.diagnostics.duplicate_records.get("factors.csv"),
            Some(&1)
        );
    }

    #[test]
    fn missing_optional_tables_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "entities.csv", "entity_id,kind,parent\n");
        let inputs = load_inputs(tmp.path()).unwrap();
        assert!(inputs.entities.is_empty());
        assert!(inputs.observed.iter_sorted().is_empty());
    }

    #[test]
    fn missing_entities_table_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_inputs(tmp.path()).is_err());
    }
}
