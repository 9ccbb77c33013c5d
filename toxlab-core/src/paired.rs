//! Paired two-arm comparisons.
//!
//! - One-sided paired test of "treatment below baseline" on per-unit values
//! - Exact binomial test on the count of units where treatment wins

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptive::{differences, is_constant, mean, sample_std};
use crate::error::{ensure_aligned, StatsError};
use crate::special::{binomial_tail_ge, normal_cdf};
use crate::verdict::{insufficient, PValueMethod, TestResult};

/// A paired test needs a sample standard deviation, hence two pairs.
pub const MIN_PAIRED_N: usize = 2;

// ─── Paired one-sided test ───────────────────────────────────────────

/// Outcome of a paired test of H1: mean(treatment) < mean(baseline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedComparison {
    pub n: usize,
    #[serde(with = "crate::serde_float")]
    pub baseline_mean: f64,
    #[serde(with = "crate::serde_float")]
    pub treatment_mean: f64,
    /// Mean of `treatment − baseline`.
    #[serde(with = "crate::serde_float")]
    pub mean_difference: f64,
    #[serde(with = "crate::serde_float")]
    pub std_difference: f64,
    #[serde(with = "crate::serde_float")]
    pub t_statistic: f64,
    /// `Φ(t)`; small when treatment sits below baseline.
    pub p_value: f64,
    pub significant: bool,
    pub alpha: f64,
    /// `(baseline_mean − treatment_mean) / baseline_mean · 100`; 0 when the
    /// baseline mean is 0.
    #[serde(with = "crate::serde_float")]
    pub reduction_pct: f64,
    /// Units with treatment strictly below baseline.
    pub units_improved: usize,
    pub fraction_improved: f64,
    pub method: PValueMethod,
}

/// One-sided paired test that treatment values are lower than baseline values.
///
/// Uses `t = mean(d) / (sd(d)/√n)` on `d = treatment − baseline` with sample
/// standard deviation and `p = Φ(t)` (normal approximation). Constant
/// differences skip the division: a negative mean gives `(−∞, 0)`, a positive
/// one `(+∞, 1)` and zero `(0, 0.5)`.
pub fn paired_less(
    treatment: &[f64],
    baseline: &[f64],
    min_n: usize,
    alpha: f64,
) -> Result<TestResult<PairedComparison>, StatsError> {
    ensure_aligned(treatment, baseline)?;
    let n = treatment.len();
    let min_n = min_n.max(MIN_PAIRED_N);
    if n < min_n {
        return Ok(TestResult::untestable(insufficient("paired units", n, min_n)));
    }

    let diffs = differences(treatment, baseline);
    let mean_difference = mean(&diffs);
    let std_difference = sample_std(&diffs);

    let (t_statistic, p_value) = if is_constant(&diffs) || std_difference == 0.0 {
        if mean_difference < 0.0 {
            (f64::NEG_INFINITY, 0.0)
        } else if mean_difference > 0.0 {
            (f64::INFINITY, 1.0)
        } else {
            (0.0, 0.5)
        }
    } else {
        let t = mean_difference / (std_difference / (n as f64).sqrt());
        (t, normal_cdf(t))
    };

    let baseline_mean = mean(baseline);
    let treatment_mean = mean(treatment);
    let reduction_pct = if baseline_mean != 0.0 {
        (baseline_mean - treatment_mean) / baseline_mean * 100.0
    } else {
        0.0
    };
    let units_improved = treatment
        .iter()
        .zip(baseline)
        .filter(|(t, b)| t < b)
        .count();

    debug!(n, mean_difference, t_statistic, p_value, "paired one-sided test");

    Ok(TestResult::tested(PairedComparison {
        n,
        baseline_mean,
        treatment_mean,
        mean_difference,
        std_difference,
        t_statistic,
        p_value,
        significant: p_value < alpha,
        alpha,
        reduction_pct,
        units_improved,
        fraction_improved: units_improved as f64 / n as f64,
        method: PValueMethod::NormalApproximation,
    }))
}

// ─── Win-fraction binomial test ──────────────────────────────────────

/// How the observed win fraction is compared to `p0` for the pass flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassRule {
    /// fraction > p0
    Exceeds,
    /// fraction ≥ p0
    AtLeast,
}

impl PassRule {
    pub fn passes(self, fraction: f64, p0: f64) -> bool {
        match self {
            PassRule::Exceeds => fraction > p0,
            PassRule::AtLeast => fraction >= p0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinFraction {
    pub n: usize,
    pub successes: usize,
    pub fraction: f64,
    pub p0: f64,
    /// `P(X ≥ successes)` under `Binomial(n, p0)`.
    pub p_value: f64,
    pub rule: PassRule,
    pub passes: bool,
    pub method: PValueMethod,
}

/// Count units where treatment strictly beats baseline.
pub fn count_wins(treatment: &[f64], baseline: &[f64]) -> Result<usize, StatsError> {
    ensure_aligned(treatment, baseline)?;
    Ok(treatment.iter().zip(baseline).filter(|(t, b)| t > b).count())
}

/// Exact binomial right-tail test of the win count against `p0`.
pub fn win_fraction_test(
    treatment: &[f64],
    baseline: &[f64],
    p0: f64,
    rule: PassRule,
) -> Result<TestResult<WinFraction>, StatsError> {
    if !(0.0..=1.0).contains(&p0) {
        return Err(StatsError::InvalidParameter(format!(
            "p0 must lie in [0, 1], got {p0}"
        )));
    }
    let successes = count_wins(treatment, baseline)?;
    let n = treatment.len();
    if n == 0 {
        return Ok(TestResult::untestable(insufficient("paired units", 0, 1)));
    }

    let fraction = successes as f64 / n as f64;
    let p_value = binomial_tail_ge(successes as u64, n as u64, p0);
    debug!(n, successes, p0, p_value, "binomial win-fraction test");

    Ok(TestResult::tested(WinFraction {
        n,
        successes,
        fraction,
        p0,
        p_value,
        rule,
        passes: rule.passes(fraction, p0),
        method: PValueMethod::ExactBinomial,
    }))
}
