//! Gig Economy Simulator CLI
//!
//! The `gig-sim` command runs Monte Carlo scenarios from JSON configuration
//! files.
//!
//! ## Commands
//!
//! - `run`: Run every trial of a scenario and write the run report
//! - `validate`: Check a scenario file without running it
//! - `template`: Print the default scenario as JSON
//! - `summarize`: Aggregate a saved run report

mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gig_simulator_core_rs::aggregate::DEFAULT_CONFIDENCE_LEVEL;
use gig_simulator_core_rs::orchestrator::compute_config_hash;
use gig_simulator_core_rs::{AggregateResult, Metric, MonteCarloEngine, RunReport, ScenarioConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "gig-sim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monte Carlo simulator for freelancer-client contracting under compliance regimes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and write its run report
    Run {
        /// Scenario configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Where to write the run report (stdout summary only if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the number of trials
        #[arg(long)]
        trials: Option<usize>,

        /// Override the base seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the worker thread limit (0 = one per core)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Confidence level for the printed summary
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_LEVEL)]
        confidence: f64,
    },

    /// Validate a scenario file and print its config hash
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the default scenario configuration
    Template,

    /// Summarize a saved run report
    Summarize {
        /// Run report produced by `run --output`
        #[arg(short, long)]
        report: PathBuf,

        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_LEVEL)]
        confidence: f64,

        /// Print the full aggregate as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Run {
            config,
            output,
            trials,
            seed,
            concurrency,
            confidence,
        } => cmd_run(&config, output.as_deref(), trials, seed, concurrency, confidence),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Template => cmd_template(),
        Commands::Summarize {
            report,
            confidence,
            json,
        } => cmd_summarize(&report, confidence, json),
    }
}

fn load_config(path: &Path) -> Result<ScenarioConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid scenario JSON in {}", path.display()))
}

fn cmd_run(
    path: &Path,
    output: Option<&Path>,
    trials: Option<usize>,
    seed: Option<u64>,
    concurrency: Option<usize>,
    confidence: f64,
) -> Result<()> {
    check_confidence(confidence)?;
    let mut config = load_config(path)?;
    if let Some(trials) = trials {
        config.num_trials = trials;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(concurrency) = concurrency {
        config.max_concurrency = concurrency;
    }

    let engine = MonteCarloEngine::new(config.clone()).context("Scenario validation failed")?;
    let records = engine.run();
    let report = RunReport::new(config, records)?;
    info!(
        run_id = %report.run_id,
        config_hash = %report.config_hash,
        completed = report.completed,
        aborted = report.aborted,
        "run complete"
    );

    if let Some(output) = output {
        fs::write(output, report.to_json()?)
            .with_context(|| format!("Failed to write report {}", output.display()))?;
        info!(path = %output.display(), "report written");
    }

    match report.summarize(confidence) {
        Ok(aggregate) => print_summary(&aggregate),
        Err(e) => bail!("No summary available: {}", e),
    }
    Ok(())
}

/// Reject a confidence level before any trial runs
fn check_confidence(level: f64) -> Result<()> {
    if !(level > 0.0 && level < 1.0) {
        bail!("--confidence must lie strictly between 0 and 1, got {}", level);
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let scenario = config.validate().context("Scenario validation failed")?;
    let hash = compute_config_hash(scenario.config())?;
    println!("valid: variant={} hash={}", scenario.rules().variant, hash);
    Ok(())
}

fn cmd_template() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&ScenarioConfig::default())?);
    Ok(())
}

fn cmd_summarize(path: &Path, confidence: f64, json: bool) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    let report = RunReport::from_json(&text)?;
    let aggregate = report.summarize(confidence)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregate)?);
    } else {
        print_summary(&aggregate);
    }
    Ok(())
}

/// Final-tick mean and interval for each metric
fn print_summary(aggregate: &AggregateResult) {
    println!(
        "completed trials: {}  aborted: {}",
        aggregate.completed_trials, aggregate.aborted_trials
    );
    for (code, count) in &aggregate.abort_reasons {
        println!("  aborted ({}): {}", code, count);
    }
    println!(
        "{:<30} {:>14} {:>14} {:>14}",
        "metric (last tick)", "mean", "lower", "upper"
    );
    for metric in Metric::ALL {
        let Some(last) = aggregate.series(metric).and_then(|s| s.last()) else {
            continue;
        };
        let (lower, upper) = match &last.interval {
            Some(ci) => (format!("{:.4}", ci.lower), format!("{:.4}", ci.upper)),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<30} {:>14.4} {:>14} {:>14}",
            metric.name(),
            last.mean,
            lower,
            upper
        );
    }
}
