//! Threshold discovery: bucket tables, inflection points, driver confounds.

use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use mealscope_core::diagnostics::RunDiagnostics;
use mealscope_core::inflection::{discover_all, driver_confounds};
use mealscope_core::pipeline::EngineConfig;

use super::load_inputs;

#[derive(Serialize)]
struct BucketsOutput<'a> {
    buckets: &'a [mealscope_core::DriverBucketReport],
    driver_confounds: &'a [mealscope_core::DriverCorrelation],
}

pub fn run(input: &Path, config: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load(config)?;
    let inputs = load_inputs(input)?;

    let mut diagnostics = RunDiagnostics::new();
    let reports = discover_all(
        &inputs.entities,
        &config.discovery,
        &inputs.observed,
        &mut diagnostics,
    );
    let confounds = driver_confounds(&config.discovery, &inputs.observed);

    for report in &reports {
        println!(
            "Driver {} (business target {}):",
            report.driver_metric, report.business_target
        );
        for bucket in &report.buckets {
            print!("  {:<8} {:>3} entities", bucket.label, bucket.entity_count);
            for (outcome, mean) in &bucket.outcome_means {
                let marker = if mean.low_confidence { ", low confidence" } else { "" };
                print!("  {}={:.1} (n={}{})", outcome, mean.mean, mean.n, marker);
            }
            println!();
        }
        for inflection in &report.inflections {
            println!(
                "  inflection: {} jumps {:+.1} at {} ({} -> {})",
                inflection.outcome_metric,
                inflection.jump,
                inflection.boundary,
                inflection.from_bucket,
                inflection.to_bucket
            );
        }
        if report.excluded_null_driver > 0 {
            println!(
                "  excluded {} entities with no {} value",
                report.excluded_null_driver, report.driver_metric
            );
        }
        println!();
    }

    for confound in &confounds {
        if confound.flagged {
            println!(
                "Note: drivers {} and {} are correlated (r={:.2}, n={}); bucket \
                 comparisons on them are not independent",
                confound.driver_a, confound.driver_b, confound.pearson_r, confound.n
            );
        }
    }

    if let Some(path) = output {
        let payload = BucketsOutput {
            buckets: &reports,
            driver_confounds: &confounds,
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &payload)?;
        writer.flush()?;
        println!("Wrote bucket reports to {}", path.display());
    }

    Ok(())
}
