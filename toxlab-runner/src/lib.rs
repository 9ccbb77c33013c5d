//! toxlab runner: hypothesis suite, fill analyses, loaders and reports.
//!
//! This crate builds on `toxlab-core` to provide:
//! - Typed group, fill and symbol records
//! - The five-test hypothesis suite over per-group PnL
//! - Toxicity deciles, feature ranking and HAC over fills
//! - Symbol-level bootstrap
//! - TOML configuration, CSV/log loaders, JSON/text reports

pub mod config;
pub mod fills;
pub mod hypotheses;
pub mod loader;
pub mod records;
pub mod report;
pub mod runner;
pub mod summary;
pub mod symbols;

pub use config::{AnalysisConfig, ConfigError, FillConfig, HypothesisConfig, SymbolConfig};
pub use fills::{analyze_fills, FillAnalysis, FeatureRanking, ToxicityBucket, ToxicityDeciles};
pub use hypotheses::{HypothesisResults, HypothesisSuite, SharpeImprovement};
pub use loader::{load_fills, load_simulator_log, load_symbols, parse_simulator_log, LoadError, SimulatorLog};
pub use records::{
    Arm, ArmColumns, ArmPair, FeatureVector, FillRecord, GroupRecord, HypothesisInput, RunTotals,
    SymbolRecord, FEATURE_NAMES,
};
pub use report::{FillAnalysisReport, HypothesisReport, SCHEMA_VERSION};
pub use runner::{run_fill_analysis, run_hypotheses, run_hypotheses_from_log, AnalysisError};
pub use summary::{fill_efficiency, summarize_groups, FillEfficiency, GroupSummary};
pub use symbols::{symbol_bootstrap, SymbolBootstrap};
