//! Full pipeline run: score, classify, discover, evaluate, export.

use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use mealscope_core::pipeline::{run as run_pipeline, EngineConfig, RunReport};

use super::load_inputs;

pub fn run(input: &Path, config: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load(config)?;
    let inputs = load_inputs(input)?;

    let mut report = run_pipeline(
        &config,
        &inputs.entities,
        &inputs.factor_scores,
        &inputs.observed,
        &inputs.mentions,
    )?;
    report.diagnostics.merge(inputs.diagnostics);

    print_summary(&report);

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
        write_report_json(&report, &dir.join("report.json"))?;
        write_scores_csv(&report, &dir.join("scores.csv"))?;
        write_audit_csv(&report, &dir.join("audit.csv"))?;
        write_zones_csv(&report, &dir.join("zones.csv"))?;
        write_buckets_csv(&report, &dir.join("buckets.csv"))?;
        println!("\nWrote report.json and CSV exports to {}", dir.display());
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("Run {} (engine v{})", report.run_id, report.engine_version);
    println!();

    println!("Scored {} entities:", report.scores.len());
    let mut quadrant_counts: std::collections::BTreeMap<String, usize> =
        std::collections::BTreeMap::new();
    for score in &report.scores {
        *quadrant_counts.entry(score.quadrant.to_string()).or_insert(0) += 1;
    }
    for (quadrant, count) in &quadrant_counts {
        println!("  {quadrant:<10} {count}");
    }

    println!();
    println!("Factor inclusion:");
    for impact in &report.factor_impacts {
        let verdict = if impact.included { "included" } else { "excluded" };
        println!(
            "  {:<20} {:<12} impact {:.3} over {} pair(s) -> {}",
            impact.factor, impact.track, impact.impact_score, impact.counted_pairs, verdict
        );
    }

    if !report.zones.is_empty() {
        println!();
        println!("Zones:");
        for zone in &report.zones {
            println!("  {:<20} {}", zone.zone_id, zone.tier);
        }
    }

    for bucket_report in &report.buckets {
        println!();
        println!(
            "Driver {} (business target {}):",
            bucket_report.driver_metric, bucket_report.business_target
        );
        for inflection in &bucket_report.inflections {
            println!(
                "  {} jumps {:+.1} at {} ({} -> {})",
                inflection.outcome_metric,
                inflection.jump,
                inflection.boundary,
                inflection.from_bucket,
                inflection.to_bucket
            );
        }
        if bucket_report.inflections.is_empty() {
            println!("  (not enough populated buckets for an inflection)");
        }
    }

    for confound in &report.driver_confounds {
        if confound.flagged {
            println!();
            println!(
                "Note: drivers {} and {} are correlated (r={:.2}, n={}); bucket \
                 comparisons on them are not independent",
                confound.driver_a, confound.driver_b, confound.pearson_r, confound.n
            );
        }
    }

    let skipped = report.diagnostics.total_skipped_rows();
    if skipped > 0 {
        println!();
        println!("Data quality: {skipped} row(s) skipped across input tables");
    }
}

fn write_report_json(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

fn write_scores_csv(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "entity_id,final_score,quadrant,track,track_score")?;
    for score in &report.scores {
        for (track, value) in &score.track_scores {
            writeln!(
                writer,
                "{},{:.4},{},{},{:.4}",
                score.entity_id, score.final_score, score.quadrant, track, value
            )?;
        }
        if score.track_scores.is_empty() {
            writeln!(
                writer,
                "{},{:.4},{},,",
                score.entity_id, score.final_score, score.quadrant
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_audit_csv(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "factor,success_metric,pearson_r,spearman_r,n,p_value,meaningful,significant,low_confidence"
    )?;
    for row in &report.correlation_audit {
        writeln!(
            writer,
            "{},{},{:.4},{:.4},{},{:.6},{},{},{}",
            row.factor,
            row.success_metric,
            row.pearson_r,
            row.spearman_r,
            row.n,
            row.p_value,
            row.is_meaningful,
            row.is_significant,
            row.low_confidence
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn write_zones_csv(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "zone_id,tier,criterion,passed")?;
    for zone in &report.zones {
        if zone.criteria_passed.is_empty() {
            writeln!(writer, "{},{},,", zone.zone_id, zone.tier)?;
            continue;
        }
        for (criterion, passed) in &zone.criteria_passed {
            writeln!(writer, "{},{},{},{}", zone.zone_id, zone.tier, criterion, passed)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_buckets_csv(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "driver_metric,bucket,entity_count,outcome_metric,outcome_mean,outcome_n,low_confidence"
    )?;
    for bucket_report in &report.buckets {
        for bucket in &bucket_report.buckets {
            if bucket.outcome_means.is_empty() {
                writeln!(
                    writer,
                    "{},{},{},,,,",
                    bucket.driver_metric, bucket.label, bucket.entity_count
                )?;
                continue;
            }
            for (outcome, mean) in &bucket.outcome_means {
                writeln!(
                    writer,
                    "{},{},{},{},{:.4},{},{}",
                    bucket.driver_metric,
                    bucket.label,
                    bucket.entity_count,
                    outcome,
                    mean.mean,
                    mean.n,
                    mean.low_confidence
                )?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
