//! Symbol-level bootstrap.
//!
//! Symbols are closer to independent than process groups, so the CIs here
//! come from resampling active symbols. One set of drawn indices serves all
//! four statistics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use toxlab_core::bootstrap::{bootstrap_many, par_bootstrap_many, statistics, StatisticFn};
use toxlab_core::descriptive::mean;
use toxlab_core::error::StatsError;
use toxlab_core::verdict::{insufficient, ConfidenceInterval, PValueMethod, TestResult};

use crate::config::SymbolConfig;
use crate::records::SymbolRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolBootstrap {
    pub n_symbols: usize,
    pub resamples: usize,
    pub seed: u64,
    pub observed_mean_improvement: f64,
    pub observed_total_treatment_pnl: f64,
    pub observed_total_baseline_pnl: f64,
    pub fraction_improved: f64,
    pub ci_95_mean_improvement: ConfidenceInterval,
    pub ci_95_treatment_pnl: ConfidenceInterval,
    pub ci_95_baseline_pnl: ConfidenceInterval,
    pub ci_95_fraction_improved: ConfidenceInterval,
    /// Fraction of resampled mean improvements ≤ 0.
    pub p_value: f64,
    pub method: PValueMethod,
}

/// Bootstrap over symbols that traded in either arm.
pub fn symbol_bootstrap(
    symbols: &[SymbolRecord],
    config: &SymbolConfig,
    parallel: bool,
) -> Result<TestResult<SymbolBootstrap>, StatsError> {
    let active: Vec<&SymbolRecord> = symbols.iter().filter(|s| s.is_active()).collect();
    let n = active.len();
    if n < config.min_active_symbols {
        return Ok(TestResult::untestable(insufficient(
            "active symbols",
            n,
            config.min_active_symbols,
        )));
    }

    let treatment: Vec<f64> = active.iter().map(|s| s.treatment_pnl).collect();
    let baseline: Vec<f64> = active.iter().map(|s| s.baseline_pnl).collect();
    let improvement: Vec<f64> = active.iter().map(|s| s.improvement).collect();
    let samples: [&[f64]; 3] = [&treatment, &baseline, &improvement];

    let mean_improvement = statistics::mean(2);
    let total_treatment = statistics::sum(0);
    let total_baseline = statistics::sum(1);
    let fraction_improved = statistics::fraction_above(2, 0.0);
    let stats: [&StatisticFn<'_>; 4] = [
        &mean_improvement,
        &total_treatment,
        &total_baseline,
        &fraction_improved,
    ];

    let cfg = config.bootstrap();
    let dists = if parallel {
        par_bootstrap_many(&samples, &stats, cfg)?
    } else {
        bootstrap_many(&samples, &stats, cfg)?
    };
    let [mean_dist, treat_dist, base_dist, frac_dist] = dists.as_slice() else {
        return Err(StatsError::InvalidParameter(format!(
            "expected 4 bootstrap distributions, got {}",
            dists.len()
        )));
    };

    debug!(n, resamples = cfg.resamples, "symbol bootstrap complete");

    Ok(TestResult::tested(SymbolBootstrap {
        n_symbols: n,
        resamples: cfg.resamples,
        seed: cfg.seed,
        observed_mean_improvement: mean(&improvement),
        observed_total_treatment_pnl: treatment.iter().sum(),
        observed_total_baseline_pnl: baseline.iter().sum(),
        fraction_improved: improvement.iter().filter(|&&v| v > 0.0).count() as f64 / n as f64,
        ci_95_mean_improvement: mean_dist.ci_95(),
        ci_95_treatment_pnl: treat_dist.ci_95(),
        ci_95_baseline_pnl: base_dist.ci_95(),
        ci_95_fraction_improved: frac_dist.ci_95(),
        p_value: mean_dist.p_value_le_zero(),
        method: PValueMethod::Bootstrap,
    }))
}
