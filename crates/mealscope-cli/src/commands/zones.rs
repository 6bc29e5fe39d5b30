//! Zone readiness evaluation against the configured thresholds.

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use mealscope_core::entity::{entities_of_kind, EntityKind};
use mealscope_core::metric::MetricRecord;
use mealscope_core::pipeline::{EngineConfig, BEHAVIORAL_METRICS, SUPPLY_METRICS};
use mealscope_core::zone::evaluate_zone;

use super::load_inputs;

pub fn run(input: &Path, config: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load(config)?;
    let inputs = load_inputs(input)?;

    let mut zone_entities = entities_of_kind(&inputs.entities, EntityKind::Zone);
    zone_entities.sort_by(|a, b| a.id.cmp(&b.id));

    let mut statuses = Vec::with_capacity(zone_entities.len());
    for entity in zone_entities {
        let records = inputs.observed.records_for(&entity.id);
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
        statuses.push(evaluate_zone(
            &entity.id,
            &supply,
            &behavioral,
            &config.zone_thresholds,
        ));
    }

    println!("Zone readiness ({} zone(s)):\n", statuses.len());
    for status in &statuses {
        print!("  {:<20} {:<12}", status.zone_id, status.tier.to_string());
        let failing: Vec<&str> = status
            .criteria_passed
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(criterion, _)| criterion.as_str())
            .collect();
        if !failing.is_empty() {
            print!(" failing: {}", failing.join(", "));
        }
        println!();
    }

    if let Some(path) = output {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &statuses)?;
        writer.flush()?;
        println!("\nWrote zone statuses to {}", path.display());
    }

    Ok(())
}
