//! Newey-West (HAC) standard error for the mean of a time-ordered series.
//!
//! Long-run variance: `gamma_0 + 2·Σ_{k=1..L} w_k·gamma_k` with the Bartlett
//! weight `w_k = 1 − k/(L+1)` and autocovariances divided by n. The estimate
//! is clamped at zero before the square root.
//!
//! Default bandwidth is `L = max(1, floor(n^(1/3)))`. The bandwidth changes the
//! estimate materially, so the chosen `max_lag` is always reported.
//!
//! The companion binning step folds timestamped observations into fixed-width
//! windows. Only windows holding at least one observation enter the series.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptive::mean;
use crate::error::StatsError;
use crate::special::two_sided_p;
use crate::verdict::{insufficient, ConfidenceInterval, PValueMethod, TestResult};

/// Minimum series length for the estimator.
pub const MIN_HAC_N: usize = 5;

/// Normal critical value for a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// Newey-West estimate for the mean of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HacEstimate {
    pub n: usize,
    #[serde(with = "crate::serde_float")]
    pub mean: f64,
    pub max_lag: usize,
    #[serde(with = "crate::serde_float")]
    pub naive_se: f64,
    #[serde(with = "crate::serde_float")]
    pub hac_se: f64,
    /// `hac_se / naive_se`; 1.0 when the series has no variance at all.
    #[serde(with = "crate::serde_float")]
    pub se_inflation_ratio: f64,
    #[serde(with = "crate::serde_float")]
    pub t_statistic: f64,
    pub p_value: f64,
    pub ci_95: ConfidenceInterval,
    pub method: PValueMethod,
}

/// `max(1, floor(n^(1/3)))`, computed as an integer cube root.
pub fn default_max_lag(n: usize) -> usize {
    let mut lag = (n as f64).cbrt().floor() as usize;
    while (lag + 1).pow(3) <= n {
        lag += 1;
    }
    while lag > 0 && lag.pow(3) > n {
        lag -= 1;
    }
    lag.max(1)
}

/// Lag-`k` autocovariance of a demeaned series, divided by n.
fn autocovariance(demeaned: &[f64], lag: usize) -> f64 {
    let n = demeaned.len();
    if lag >= n {
        return 0.0;
    }
    let sum: f64 = (lag..n).map(|t| demeaned[t] * demeaned[t - lag]).sum();
    sum / n as f64
}

/// Newey-West estimate with Bartlett weights.
///
/// `max_lag = None` uses [`default_max_lag`]. `Some(0)` disables the
/// correction, making `hac_se` identical to `naive_se`.
pub fn newey_west(values: &[f64], max_lag: Option<usize>) -> TestResult<HacEstimate> {
    let n = values.len();
    if n < MIN_HAC_N {
        return TestResult::untestable(insufficient("data points", n, MIN_HAC_N));
    }

    let max_lag = max_lag.unwrap_or_else(|| default_max_lag(n));
    let m = mean(values);
    let demeaned: Vec<f64> = values.iter().map(|v| v - m).collect();

    let gamma_0 = autocovariance(&demeaned, 0);
    let mut long_run_variance = gamma_0;
    for lag in 1..=max_lag {
        let weight = 1.0 - lag as f64 / (max_lag + 1) as f64;
        long_run_variance += 2.0 * weight * autocovariance(&demeaned, lag);
    }

    let n_f = n as f64;
    let hac_se = (long_run_variance.max(0.0) / n_f).sqrt();
    let naive_se = (gamma_0 / n_f).sqrt();

    let se_inflation_ratio = if naive_se > 0.0 {
        hac_se / naive_se
    } else {
        1.0
    };

    // zero SE with a nonzero mean is reported as +inf whatever the sign
    let t_statistic = if hac_se > 0.0 {
        m / hac_se
    } else if m != 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let p_value = if t_statistic == 0.0 && hac_se == 0.0 {
        1.0
    } else {
        two_sided_p(t_statistic)
    };

    debug!(n, max_lag, naive_se, hac_se, "newey-west estimate");

    TestResult::tested(HacEstimate {
        n,
        mean: m,
        max_lag,
        naive_se,
        hac_se,
        se_inflation_ratio,
        t_statistic,
        p_value,
        ci_95: ConfidenceInterval::symmetric(m, Z_95, hac_se),
        method: PValueMethod::NormalApproximation,
    })
}

// ─── Time binning ────────────────────────────────────────────────────

/// A value stamped with a nanosecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    pub timestamp_ns: i64,
    pub value: f64,
}

impl TimedValue {
    pub fn new(timestamp_ns: i64, value: f64) -> Self {
        Self {
            timestamp_ns,
            value,
        }
    }
}

/// One non-empty fixed-width window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBin {
    /// Window index counted from the earliest observation.
    pub index: i64,
    pub start_ns: i64,
    pub count: usize,
    pub sum: f64,
}

/// Sum observations into `width_ns` windows anchored at the earliest timestamp.
///
/// Windows without observations are dropped. Output is in time order.
pub fn bin_by_time(observations: &[TimedValue], width_ns: i64) -> Result<Vec<TimeBin>, StatsError> {
    if width_ns <= 0 {
        return Err(StatsError::InvalidParameter(format!(
            "bin width must be positive, got {width_ns} ns"
        )));
    }
    let Some(origin) = observations.iter().map(|o| o.timestamp_ns).min() else {
        return Ok(Vec::new());
    };

    let span_overflow = || {
        StatsError::InvalidParameter(format!(
            "timestamp span overflows i64 nanoseconds at bin width {width_ns} ns"
        ))
    };

    let mut windows: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    for obs in observations {
        let offset = obs
            .timestamp_ns
            .checked_sub(origin)
            .ok_or_else(span_overflow)?;
        let slot = windows
            .entry(offset.div_euclid(width_ns))
            .or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += obs.value;
    }

    windows
        .into_iter()
        .map(|(index, (count, sum))| {
            let start_ns = index
                .checked_mul(width_ns)
                .and_then(|offset| origin.checked_add(offset))
                .ok_or_else(span_overflow)?;
            Ok(TimeBin {
                index,
                start_ns,
                count,
                sum,
            })
        })
        .collect()
}

/// HAC estimate over time-binned observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedHacEstimate {
    pub n_time_bins: usize,
    pub bin_width_ns: i64,
    pub estimate: HacEstimate,
}

/// Bin observations, then run [`newey_west`] over the non-empty window sums.
///
/// Fewer than `min_bins` non-empty windows (never below [`MIN_HAC_N`]) is
/// untestable.
pub fn newey_west_binned(
    observations: &[TimedValue],
    width_ns: i64,
    min_bins: usize,
    max_lag: Option<usize>,
) -> Result<TestResult<BinnedHacEstimate>, StatsError> {
    let bins = bin_by_time(observations, width_ns)?;
    let min_bins = min_bins.max(MIN_HAC_N);
    if bins.len() < min_bins {
        return Ok(TestResult::untestable(insufficient(
            "non-empty time bins",
            bins.len(),
            min_bins,
        )));
    }

    let series: Vec<f64> = bins.iter().map(|b| b.sum).collect();
    Ok(newey_west(&series, max_lag).map(|estimate| BinnedHacEstimate {
        n_time_bins: series.len(),
        bin_width_ns: width_ns,
        estimate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MINUTES_NS: i64 = 5 * 60 * 1_000_000_000;

    fn ar1(n: usize, phi: f64) -> Vec<f64> {
        // deterministic AR(1)-like path driven by a bounded pseudo-noise
        let mut out = Vec::with_capacity(n);
        let mut prev = 0.0;
        for i in 0..n {
            let shock = ((i as f64 * 12.9898).sin() * 43_758.547).fract() - 0.5;
            prev = phi * prev + shock;
            out.push(prev + 0.1);
        }
        out
    }

    #[test]
    fn default_lag_is_integer_cube_root() {
        assert_eq!(default_max_lag(1), 1);
        assert_eq!(default_max_lag(7), 1);
        assert_eq!(default_max_lag(8), 2);
        assert_eq!(default_max_lag(26), 2);
        assert_eq!(default_max_lag(27), 3);
        assert_eq!(default_max_lag(1000), 10);
    }

    #[test]
    fn too_few_points_is_untestable() {
        let r = newey_west(&[1.0, 2.0, 3.0, 4.0], None);
        assert!(!r.is_testable());
        assert!(r.reason().unwrap().contains("4 data points"));
    }

    #[test]
    fn zero_lag_matches_naive_exactly() {
        let v = ar1(50, 0.6);
        let est = newey_west(&v, Some(0)).outcome.unwrap();
        assert_eq!(est.hac_se, est.naive_se);
        assert_eq!(est.se_inflation_ratio, 1.0);
    }

    #[test]
    fn positive_autocorrelation_inflates_se() {
        let v = ar1(200, 0.8);
        let est = newey_west(&v, Some(5)).outcome.unwrap();
        assert!(est.hac_se >= est.naive_se);
        assert!(est.se_inflation_ratio > 1.0);
    }

    #[test]
    fn default_lag_reported() {
        let v = ar1(64, 0.2);
        let est = newey_west(&v, None).outcome.unwrap();
        assert_eq!(est.max_lag, 4);
        assert_eq!(est.n, 64);
    }

    #[test]
    fn negative_long_run_variance_is_clamped() {
        // alternating series has strongly negative lag-1 autocovariance
        let v: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let est = newey_west(&v, Some(1)).outcome.unwrap();
        assert!(est.hac_se.is_finite());
        assert!(est.hac_se >= 0.0);
        assert!(!est.p_value.is_nan());
    }

    #[test]
    fn constant_series_has_infinite_t() {
        let est = newey_west(&[2.0; 8], None).outcome.unwrap();
        assert_eq!(est.hac_se, 0.0);
        assert_eq!(est.t_statistic, f64::INFINITY);
        assert_eq!(est.p_value, 0.0);
        assert_eq!(est.se_inflation_ratio, 1.0);
    }

    #[test]
    fn constant_negative_series_has_positive_infinite_t() {
        let est = newey_west(&[-2.0; 8], None).outcome.unwrap();
        assert_eq!(est.hac_se, 0.0);
        assert_eq!(est.mean, -2.0);
        assert_eq!(est.t_statistic, f64::INFINITY);
        assert_eq!(est.p_value, 0.0);
    }

    #[test]
    fn infinite_fields_survive_json() {
        let est = HacEstimate {
            n: 8,
            mean: f64::INFINITY,
            max_lag: 2,
            naive_se: 0.0,
            hac_se: f64::NEG_INFINITY,
            se_inflation_ratio: f64::INFINITY,
            t_statistic: f64::INFINITY,
            p_value: 0.0,
            ci_95: ConfidenceInterval {
                lower: f64::NEG_INFINITY,
                upper: f64::INFINITY,
            },
            method: PValueMethod::NormalApproximation,
        };
        let json = serde_json::to_string(&est).unwrap();
        assert!(json.contains("\"mean\":\"inf\""), "{json}");
        assert!(json.contains("\"hac_se\":\"-inf\""), "{json}");
        assert!(json.contains("\"se_inflation_ratio\":\"inf\""), "{json}");
        let back: HacEstimate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, est);
    }

    #[test]
    fn all_zero_series_has_unit_p() {
        let est = newey_west(&[0.0; 6], None).outcome.unwrap();
        assert_eq!(est.t_statistic, 0.0);
        assert_eq!(est.p_value, 1.0);
    }

    #[test]
    fn ci_is_centered_on_mean() {
        let v = ar1(30, 0.1);
        let est = newey_west(&v, None).outcome.unwrap();
        let mid = (est.ci_95.lower + est.ci_95.upper) / 2.0;
        assert!((mid - est.mean).abs() < 1e-12);
        assert!((est.ci_95.width() - 2.0 * 1.96 * est.hac_se).abs() < 1e-12);
    }

    #[test]
    fn binning_drops_empty_windows() {
        let obs = vec![
            TimedValue::new(0, 1.0),
            TimedValue::new(10, 2.0),
            TimedValue::new(3 * FIVE_MINUTES_NS + 1, 4.0),
            TimedValue::new(FIVE_MINUTES_NS, -1.0),
        ];
        let bins = bin_by_time(&obs, FIVE_MINUTES_NS).unwrap();
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[0].index, 0);
        assert_eq!(bins[0].count, 2);
        assert!((bins[0].sum - 3.0).abs() < 1e-12);
        assert_eq!(bins[1].index, 1);
        assert_eq!(bins[2].index, 3);
        assert_eq!(bins[2].start_ns, 3 * FIVE_MINUTES_NS);
    }

    #[test]
    fn window_with_zero_sum_is_kept() {
        let obs = vec![TimedValue::new(0, 1.0), TimedValue::new(5, -1.0)];
        let bins = bin_by_time(&obs, FIVE_MINUTES_NS).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].sum, 0.0);
    }

    #[test]
    fn zero_width_is_invalid() {
        assert!(matches!(
            bin_by_time(&[TimedValue::new(0, 1.0)], 0),
            Err(StatsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn extreme_timestamps_are_rejected_not_wrapped() {
        let obs = vec![
            TimedValue::new(i64::MIN, 1.0),
            TimedValue::new(i64::MAX, 2.0),
        ];
        assert!(matches!(
            bin_by_time(&obs, 60_000_000_000),
            Err(StatsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn negative_timestamps_bin_from_earliest() {
        let obs = vec![
            TimedValue::new(-FIVE_MINUTES_NS, 1.0),
            TimedValue::new(1, 2.0),
        ];
        let bins = bin_by_time(&obs, FIVE_MINUTES_NS).unwrap();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].start_ns, -FIVE_MINUTES_NS);
        assert_eq!(bins[1].index, 1);
        assert_eq!(bins[1].start_ns, 0);
    }

    #[test]
    fn binned_too_few_windows_is_untestable() {
        let obs: Vec<TimedValue> = (0..4)
            .map(|i| TimedValue::new(i * FIVE_MINUTES_NS, 1.0 + i as f64))
            .collect();
        let r = newey_west_binned(&obs, FIVE_MINUTES_NS, 5, None).unwrap();
        assert!(!r.is_testable());
        assert!(r.reason().unwrap().contains("4 non-empty time bins"));
    }

    #[test]
    fn binned_estimate_reports_bin_count() {
        let obs: Vec<TimedValue> = (0..40)
            .map(|i| TimedValue::new(i * FIVE_MINUTES_NS / 2, (i % 5) as f64 - 1.0))
            .collect();
        let r = newey_west_binned(&obs, FIVE_MINUTES_NS, 5, None).unwrap();
        let est = r.outcome.unwrap();
        assert_eq!(est.n_time_bins, 20);
        assert_eq!(est.bin_width_ns, FIVE_MINUTES_NS);
        assert_eq!(est.estimate.n, 20);
    }
}
