//! Load → analyze → report pipelines.

use std::path::Path;
use thiserror::Error;
use tracing::info;

use toxlab_core::error::StatsError;

use crate::config::{AnalysisConfig, ConfigError};
use crate::fills::analyze_fills;
use crate::hypotheses::HypothesisSuite;
use crate::loader::{load_fills, load_simulator_log, load_symbols, LoadError, SimulatorLog};
use crate::records::HypothesisInput;
use crate::report::{FillAnalysisReport, HypothesisReport};
use crate::symbols::symbol_bootstrap;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("statistics error: {0}")]
    Stats(#[from] StatsError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("no per-group results found in '{0}'")]
    NoGroups(String),
}

/// Run the hypothesis suite on already-parsed log contents.
pub fn run_hypotheses(
    log: SimulatorLog,
    config: &AnalysisConfig,
) -> Result<HypothesisReport, AnalysisError> {
    let input = HypothesisInput::from_groups(&log.groups);
    let results = HypothesisSuite::new(config).run(&input)?;
    Ok(HypothesisReport::new(&input, results, log.totals))
}

/// Parse a simulator log and run the hypothesis suite on it.
pub fn run_hypotheses_from_log(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<HypothesisReport, AnalysisError> {
    let log = load_simulator_log(path)?;
    if log.groups.is_empty() {
        return Err(AnalysisError::NoGroups(path.display().to_string()));
    }
    let report = run_hypotheses(log, config)?;
    info!(n_groups = report.n_groups, "hypothesis suite complete");
    Ok(report)
}

/// Per-fill analyses and the symbol bootstrap over a simulator output directory.
pub fn run_fill_analysis(
    dir: &Path,
    config: &AnalysisConfig,
) -> Result<FillAnalysisReport, AnalysisError> {
    let fills = load_fills(dir)?;
    let symbols = load_symbols(dir)?;
    let analysis = analyze_fills(&fills, &config.fills, config.hypotheses.alpha)?;
    let symbols = symbol_bootstrap(&symbols, &config.symbols, config.parallel)?;
    info!(
        n_fills = analysis.n_fills,
        symbols_testable = symbols.is_testable(),
        "fill analysis complete"
    );
    Ok(FillAnalysisReport::new(analysis, symbols))
}
