//! Analysis configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! standard analysis. Partial files override only the keys they name.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toxlab_core::bootstrap::BootstrapConfig;

/// Five minutes in nanoseconds.
pub const DEFAULT_BIN_WIDTH_NS: i64 = 5 * 60 * 1_000_000_000;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for every analysis the runner performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Run bootstrap iterations on the rayon pool with per-iteration seeds.
    pub parallel: bool,
    pub hypotheses: HypothesisConfig,
    pub fills: FillConfig,
    pub symbols: SymbolConfig,
}

/// Settings for the five group-level hypothesis tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisConfig {
    pub alpha: f64,
    pub bootstrap_resamples: usize,
    pub seed: u64,
    /// Minimum groups for the Sharpe-improvement bootstrap.
    pub min_bootstrap_groups: usize,
    /// Minimum groups for the paired adverse/inventory tests.
    pub min_paired_groups: usize,
    pub cross_section_p0: f64,
    pub dominance_p0: f64,
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            bootstrap_resamples: 5_000,
            seed: 0,
            min_bootstrap_groups: 10,
            min_paired_groups: 2,
            cross_section_p0: 0.8,
            dominance_p0: 0.9,
        }
    }
}

impl HypothesisConfig {
    pub fn bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig::new(self.bootstrap_resamples, self.seed)
    }
}

/// Settings for the per-fill analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Minimum measured treatment fills for deciles and feature ranking.
    pub min_fills: usize,
    pub min_spearman_n: usize,
    pub bin_width_ns: i64,
    pub min_bins: usize,
    /// Newey-West bandwidth; `None` uses `max(1, floor(n^(1/3)))`.
    pub max_lag: Option<usize>,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            min_fills: 20,
            min_spearman_n: 10,
            bin_width_ns: DEFAULT_BIN_WIDTH_NS,
            min_bins: 5,
            max_lag: None,
        }
    }
}

/// Settings for the symbol-level bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    pub min_active_symbols: usize,
    pub resamples: usize,
    pub seed: u64,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            min_active_symbols: 10,
            resamples: 10_000,
            seed: 42,
        }
    }
}

impl SymbolConfig {
    pub fn bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig::new(self.resamples, self.seed)
    }
}

impl AnalysisConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let h = &self.hypotheses;
        if !(h.alpha > 0.0 && h.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "hypotheses.alpha must lie in (0, 1), got {}",
                h.alpha
            )));
        }
        for (name, p0) in [
            ("cross_section_p0", h.cross_section_p0),
            ("dominance_p0", h.dominance_p0),
        ] {
            if !(0.0..=1.0).contains(&p0) {
                return Err(ConfigError::Invalid(format!(
                    "hypotheses.{name} must lie in [0, 1], got {p0}"
                )));
            }
        }
        if h.bootstrap_resamples == 0 {
            return Err(ConfigError::Invalid(
                "hypotheses.bootstrap_resamples must be positive".into(),
            ));
        }
        if self.symbols.resamples == 0 {
            return Err(ConfigError::Invalid(
                "symbols.resamples must be positive".into(),
            ));
        }
        if self.fills.bin_width_ns <= 0 {
            return Err(ConfigError::Invalid(format!(
                "fills.bin_width_ns must be positive, got {}",
                self.fills.bin_width_ns
            )));
        }
        Ok(())
    }
}
