//! Descriptive summary of a per-group PnL series, with power estimates,
//! and fill-efficiency ratios from run totals.

use serde::{Deserialize, Serialize};

use toxlab_core::descriptive::{is_constant, mean, sample_std, sharpe};
use toxlab_core::special::{clamp_probability, normal_cdf};
use toxlab_core::verdict::{insufficient, ConfidenceInterval, TestResult};

use crate::records::RunTotals;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const Z_ALPHA: f64 = 1.96;
/// z for 80% power.
const Z_BETA: f64 = 0.84;

/// Summary of one arm's per-group PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub n_groups: usize,
    pub mean: f64,
    pub std_dev: f64,
    #[serde(with = "toxlab_core::serde_float")]
    pub sharpe: f64,
    #[serde(with = "toxlab_core::serde_float")]
    pub annualized_sharpe: f64,
    /// t-statistic of the mean against zero.
    #[serde(with = "toxlab_core::serde_float")]
    pub t_statistic: f64,
    pub ci_95: ConfidenceInterval,
    /// Approximate power at α = 0.05 for the observed effect.
    pub power: f64,
    /// Groups needed for 80% power; absent when the mean is zero.
    pub required_groups: Option<u64>,
}

/// Summarize a per-group PnL sequence (needs at least two groups).
pub fn summarize_groups(pnl: &[f64]) -> TestResult<GroupSummary> {
    let n = pnl.len();
    if n < 2 {
        return TestResult::untestable(insufficient("groups", n, 2));
    }

    let m = mean(pnl);
    let sd = if is_constant(pnl) { 0.0 } else { sample_std(pnl) };
    let se = sd / (n as f64).sqrt();
    let s = sharpe(pnl);

    let t_statistic = if se > 0.0 { m / se } else { 0.0 };
    let power = if se > 0.0 {
        clamp_probability(normal_cdf(m.abs() / se - Z_ALPHA))
    } else {
        0.0
    };
    let required_groups = if m != 0.0 {
        let needed = (Z_ALPHA + Z_BETA).powi(2) * sd * sd / (m * m);
        Some(needed.ceil() as u64)
    } else {
        None
    };

    TestResult::tested(GroupSummary {
        n_groups: n,
        mean: m,
        std_dev: sd,
        sharpe: s,
        annualized_sharpe: s * TRADING_DAYS_PER_YEAR.sqrt(),
        t_statistic,
        ci_95: ConfidenceInterval::symmetric(m, Z_ALPHA, se),
        power,
        required_groups,
    })
}

// ─── Fill efficiency ─────────────────────────────────────────────────

/// Ratios derived from run totals. A ratio with a zero denominator is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEfficiency {
    /// Treatment fills over fills plus suppressed quotes.
    pub fill_rate: f64,
    pub suppression_rate: f64,
    /// Adverse fills over treatment fills.
    pub adverse_fill_rate: f64,
    pub treatment_pnl_per_fill: f64,
    pub baseline_pnl_per_fill: f64,
    pub adverse_penalty_per_fill: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn fill_efficiency(totals: &RunTotals) -> FillEfficiency {
    let treatment_fills = totals.treatment_fills.unwrap_or(0) as f64;
    let baseline_fills = totals.baseline_fills.unwrap_or(0) as f64;
    let suppressed = totals.quotes_suppressed.unwrap_or(0) as f64;
    let adverse_fills = totals.adverse_fills.unwrap_or(0) as f64;
    let quotes = treatment_fills + suppressed;

    FillEfficiency {
        fill_rate: ratio(treatment_fills, quotes),
        suppression_rate: ratio(suppressed, quotes),
        adverse_fill_rate: ratio(adverse_fills, treatment_fills),
        treatment_pnl_per_fill: ratio(totals.treatment_total_pnl.unwrap_or(0.0), treatment_fills),
        baseline_pnl_per_fill: ratio(totals.baseline_total_pnl.unwrap_or(0.0), baseline_fills),
        adverse_penalty_per_fill: ratio(totals.adverse_penalty.unwrap_or(0.0), adverse_fills),
    }
}
