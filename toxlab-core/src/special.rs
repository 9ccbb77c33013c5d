//! Special functions and reference distributions.
//!
//! - Standard normal CDF via `libm::erf`
//! - Two-sided normal p-values (the normal stand-in for Student's t used by
//!   the rank-correlation, paired and HAC tests)
//! - Log-factorials and log binomial coefficients for trial counts
//! - Exact binomial right tail P(X >= k)
//!
//! Every probability leaving this module is clamped to [0, 1].

use std::f64::consts::SQRT_2;

/// Standard normal CDF: P(Z <= z).
pub fn normal_cdf(z: f64) -> f64 {
    if z == f64::INFINITY {
        return 1.0;
    }
    if z == f64::NEG_INFINITY {
        return 0.0;
    }
    clamp_probability(0.5 * (1.0 + libm::erf(z / SQRT_2)))
}

/// Two-sided p-value for a normal-approximated statistic: 2·(1 − Φ(|z|)).
///
/// NaN statistics yield 1.0 (no evidence).
pub fn two_sided_p(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    clamp_probability(2.0 * (1.0 - normal_cdf(statistic.abs())))
}

/// Clamp to [0, 1]; NaN maps to 1.0.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 1.0;
    }
    p.clamp(0.0, 1.0)
}

/// Below this count `ln m!` is summed term by term.
const EXACT_LN_FACTORIAL_BELOW: u64 = 64;

/// `ln m!` for a count of trials.
///
/// Small counts add up `ln i` directly. From [`EXACT_LN_FACTORIAL_BELOW`] on,
/// Stirling's series with three correction terms is used; its truncation
/// error there is below `1 / (1680·m⁷)`, under f64 resolution.
pub fn ln_factorial(m: u64) -> f64 {
    if m < EXACT_LN_FACTORIAL_BELOW {
        return (2..=m).map(|i| (i as f64).ln()).sum();
    }
    let m = m as f64;
    let inv = m.recip();
    let inv2 = inv * inv;
    let correction = inv * (1.0 / 12.0 - inv2 * (1.0 / 360.0 - inv2 / 1260.0));
    m * m.ln() - m + 0.5 * (std::f64::consts::TAU * m).ln() + correction
}

/// `ln C(n, k)`; requires `k <= n`.
fn ln_choose(n: u64, k: u64) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// Exact right-tail probability P(X >= k) for X ~ Binomial(n, p0).
///
/// Terms are summed in log space so large n does not overflow the
/// binomial coefficient. `k == 0` is 1; `k > n` is 0.
pub fn binomial_tail_ge(k: u64, n: u64, p0: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    if p0 <= 0.0 {
        return 0.0;
    }
    if p0 >= 1.0 {
        return 1.0;
    }

    let ln_p = p0.ln();
    let ln_q = (1.0 - p0).ln();
    let tail: f64 = (k..=n)
        .map(|i| {
            let ln_term = ln_choose(n, i) + i as f64 * ln_p + (n - i) as f64 * ln_q;
            ln_term.exp()
        })
        .sum();

    clamp_probability(tail)
}
