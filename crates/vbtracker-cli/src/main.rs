use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::info;
use vbtracker_pipeline::{
    placeholder_objective, replay_with_config, run_optimizer_from_file, FinderConfig,
    MeasurementLog,
};
use vbtracker_system::ReferenceSystemFactory;

/// Offline replay and parameter search for recorded beacon-tracker logs.
#[derive(Debug, Parser)]
#[command(author, version, about = "Tracker parameter finder")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a log through the full-system and RANSAC + one-euro strategies.
    Replay {
        /// Measurement log (CSV with one header line).
        #[arg(long)]
        log: PathBuf,
        /// Optional JSON FinderConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Search the tracker tuning space around the default parameters.
    Optimize {
        #[arg(long)]
        log: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<FinderConfig> {
    match path {
        Some(path) => FinderConfig::from_json_file(path),
        None => Ok(FinderConfig::default()),
    }
}

/// One line per replayed row.
fn replay_from_files(log_path: &Path, config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path)?;
    let log = MeasurementLog::load(log_path, config.delimiter_byte()?);
    info!("replaying {} rows against {} beacons", log.len(), config.target.len());
    let frames = replay_with_config(&log, &config)?;
    let lines: Vec<String> = frames.iter().map(ToString::to_string).collect();
    Ok(lines.join("\n"))
}

/// Pretty JSON optimization report.
fn optimize_from_files(log_path: &Path, config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path)?;
    if config.optimizer.max_evals == 0 {
        bail!("optimizer.max_evals must be positive");
    }
    let factory = ReferenceSystemFactory::new(config.target.clone());
    let report = run_optimizer_from_file(
        log_path,
        config.delimiter_byte()?,
        &config.tracker,
        &factory,
        placeholder_objective,
        &config.optimizer,
    )?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let output = match &args.command {
        Command::Replay { log, config } => replay_from_files(log, config.as_deref())?,
        Command::Optimize { log, config } => optimize_from_files(log, config.as_deref())?,
    };
    println!("{output}");
    Ok(())
}
