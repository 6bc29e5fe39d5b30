//! Factor validation: print the correlation audit and the weights it earned.

use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use mealscope_core::correlation::validate_factors;
use mealscope_core::pipeline::{apply_latent_demand, scoreable_entities, EngineConfig};

use super::load_inputs;

#[derive(Serialize)]
struct ValidateOutput<'a> {
    audit: &'a [mealscope_core::CorrelationResult],
    impacts: &'a [mealscope_core::FactorImpact],
    config: &'a mealscope_core::ScoringConfig,
}

pub fn run(input: &Path, config: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load(config)?;
    let inputs = load_inputs(input)?;

    // Latent demand participates as a candidate factor, exactly as in a full
    // run, so the validation verdicts here match what `run` would use.
    let scoreable = scoreable_entities(&inputs.entities);
    let mut factor_scores = inputs.factor_scores.clone();
    apply_latent_demand(
        &scoreable,
        &mut factor_scores,
        &inputs.observed,
        &inputs.mentions,
        &config.latent,
    );

    let mut diagnostics = inputs.diagnostics;
    let outcome = validate_factors(&config.seed, &factor_scores, &inputs.observed, &mut diagnostics)?;

    println!("Correlation audit ({} pair(s)):\n", outcome.audit.len());
    println!(
        "  {:<20} {:<18} {:>8} {:>8} {:>4} {:>8}  flags",
        "factor", "success_metric", "pearson", "spearman", "n", "p"
    );
    for row in &outcome.audit {
        let mut flags = Vec::new();
        if row.is_meaningful {
            flags.push("meaningful");
        }
        if row.is_significant {
            flags.push("significant");
        }
        if row.low_confidence {
            flags.push("low_confidence");
        }
        println!(
            "  {:<20} {:<18} {:>8.3} {:>8.3} {:>4} {:>8.4}  {}",
            row.factor,
            row.success_metric,
            row.pearson_r,
            row.spearman_r,
            row.n,
            row.p_value,
            flags.join(",")
        );
    }

    println!("\nFinalized weights:");
    for track in &outcome.config.tracks {
        println!("  track {} (weight {:.2}):", track.name, track.track_weight);
        for component in &track.components {
            println!(
                "    {:<20} {:.3}",
                component.name,
                component.weight.unwrap_or(0.0)
            );
        }
    }
    for redistributed in &diagnostics.redistributed_tracks {
        println!(
            "  track {} had no included factor; its {:.0}% was redistributed",
            redistributed.track,
            redistributed.allotment * 100.0
        );
    }

    if let Some(path) = output {
        let payload = ValidateOutput {
            audit: &outcome.audit,
            impacts: &outcome.impacts,
            config: &outcome.config,
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &payload)?;
        writer.flush()?;
        println!("\nWrote validation output to {}", path.display());
    }

    Ok(())
}
