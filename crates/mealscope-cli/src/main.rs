//! CLI for mealscope — scoring and classification for family-meal menu strategy.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mealscope")]
#[command(about = "mealscope — scoring and classification for family-meal menu strategy")]
#[command(version = mealscope_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: validate factors, score entities, classify
    /// quadrants, discover thresholds, evaluate zones
    Run {
        /// Directory holding the input tables (entities.csv, factors.csv,
        /// orders.csv, supply.csv, survey.csv, mentions.csv)
        #[arg(long, default_value = "data")]
        input: PathBuf,

        /// Engine configuration JSON
        #[arg(long, default_value = "config/engine.json")]
        config: PathBuf,

        /// Directory for report.json and the CSV exports; print-only when absent
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate candidate factors against success metrics and print the
    /// correlation audit with the weights each factor earned
    Validate {
        #[arg(long, default_value = "data")]
        input: PathBuf,

        #[arg(long, default_value = "config/engine.json")]
        config: PathBuf,

        /// Write audit, impacts, and the finalized config as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Bucket zones by supply drivers and report outcome inflection points
    Buckets {
        #[arg(long, default_value = "data")]
        input: PathBuf,

        #[arg(long, default_value = "config/engine.json")]
        config: PathBuf,

        /// Write bucket reports and driver confounds as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Evaluate every zone against the readiness thresholds
    Zones {
        #[arg(long, default_value = "data")]
        input: PathBuf,

        #[arg(long, default_value = "config/engine.json")]
        config: PathBuf,

        /// Write zone statuses as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            output,
        } => commands::run::run(&input, &config, output.as_deref()),
        Commands::Validate {
            input,
            config,
            output,
        } => commands::validate::run(&input, &config, output.as_deref()),
        Commands::Buckets {
            input,
            config,
            output,
        } => commands::buckets::run(&input, &config, output.as_deref()),
        Commands::Zones {
            input,
            config,
            output,
        } => commands::zones::run(&input, &config, output.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
