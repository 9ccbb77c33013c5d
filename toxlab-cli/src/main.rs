//! toxlab CLI: hypothesis and fill-analysis commands.
//!
//! Commands:
//! - `hypotheses`: run the five group-level tests on a simulator log
//! - `fills`: per-fill analyses and the symbol bootstrap over an output directory

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use toxlab_runner::{run_fill_analysis, run_hypotheses_from_log, AnalysisConfig};

#[derive(Parser)]
#[command(
    name = "toxlab",
    about = "toxlab CLI: baseline vs toxicity-aware strategy inference"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hypothesis suite on per-group results from a simulator log.
    Hypotheses {
        /// Simulator log with `Group N:` or `Aggregation done:` lines.
        log: PathBuf,

        /// TOML analysis config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write the report as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Analyze per-fill and per-symbol CSV output.
    Fills {
        /// Directory holding fills_group_*.csv and symbols_group_*.csv.
        #[arg(long)]
        output_dir: PathBuf,

        /// TOML analysis config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write the report as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Hypotheses { log, config, json } => {
            run_hypotheses_cmd(&log, config.as_deref(), json.as_deref())
        }
        Commands::Fills {
            output_dir,
            config,
            json,
        } => run_fills_cmd(&output_dir, config.as_deref(), json.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => {
            let config = AnalysisConfig::from_file(p)
                .with_context(|| format!("Failed to load config {}", p.display()))?;
            info!(path = %p.display(), "loaded config");
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn run_hypotheses_cmd(log: &Path, config: Option<&Path>, json: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let report = run_hypotheses_from_log(log, &config)
        .with_context(|| format!("Hypothesis analysis of {} failed", log.display()))?;

    print!("{}", report.render_text());
    if let Some(path) = json {
        report.write_json(path)?;
    }
    Ok(())
}

fn run_fills_cmd(dir: &Path, config: Option<&Path>, json: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let report = run_fill_analysis(dir, &config)
        .with_context(|| format!("Fill analysis of {} failed", dir.display()))?;

    print!("{}", report.render_text());
    if let Some(path) = json {
        report.write_json(path)?;
    }
    Ok(())
}
