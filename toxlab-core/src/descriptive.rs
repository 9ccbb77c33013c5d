//! Descriptive statistics shared by every estimator.
//!
//! One Sharpe convention is used everywhere: mean divided by the *sample*
//! standard deviation (n − 1). A sequence with no dispersion maps to a signed
//! sentinel (`+∞`, `−∞` or `0` by the sign of the numerator) instead of dividing
//! by zero.

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (divides by n − 1). Returns 0.0 below two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation (n − 1).
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Population variance (divides by n). Returns 0.0 for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (n).
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// True when every value compares equal to the first (or the slice has < 2 values).
///
/// Used instead of a `std == 0.0` test: the mean of identical values can carry
/// rounding error, which would leave a tiny nonzero deviation.
pub fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(&first) => values.iter().all(|&v| v == first),
        None => true,
    }
}

/// `+∞` for a positive numerator, `−∞` for a negative one, `0` otherwise.
pub fn signed_sentinel(numerator: f64) -> f64 {
    if numerator > 0.0 {
        f64::INFINITY
    } else if numerator < 0.0 {
        f64::NEG_INFINITY
    } else {
        0.0
    }
}

/// Sharpe-like ratio: mean / sample standard deviation.
///
/// Zero-dispersion sequences (including a single value) return the signed
/// sentinel of the mean.
pub fn sharpe(values: &[f64]) -> f64 {
    let m = mean(values);
    if is_constant(values) {
        return signed_sentinel(m);
    }
    let sd = sample_std(values);
    if sd == 0.0 {
        return signed_sentinel(m);
    }
    m / sd
}

/// `Sharpe(treatment) − Sharpe(baseline)`, defined for sentinel inputs.
///
/// Two equal infinities cancel to 0 rather than producing NaN.
pub fn sharpe_difference(treatment: &[f64], baseline: &[f64]) -> f64 {
    let t = sharpe(treatment);
    let b = sharpe(baseline);
    if t.is_infinite() && b.is_infinite() && t == b {
        return 0.0;
    }
    t - b
}

/// Element-wise `treatment − baseline`. Callers check alignment first.
pub(crate) fn differences(treatment: &[f64], baseline: &[f64]) -> Vec<f64> {
    treatment
        .iter()
        .zip(baseline.iter())
        .map(|(t, b)| t - b)
        .collect()
}
