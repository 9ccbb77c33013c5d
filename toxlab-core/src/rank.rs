//! Midrank transform and Spearman rank correlation.
//!
//! Ties receive the mean of the ranks they would occupy, so the ranks of any
//! sample of size n sum to n(n+1)/2. Spearman's rho is the Pearson correlation
//! of the two rank vectors using population moments (divide by n).
//!
//! Significance uses `t = rho·sqrt((n−2)/(1−rho²))` with a two-sided p-value from
//! the standard normal CDF. This is a large-sample approximation to the
//! t-distribution and is labelled as such in the result.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptive::{is_constant, mean, population_std};
use crate::error::{ensure_aligned, StatsError};
use crate::fdr::benjamini_hochberg;
use crate::special::two_sided_p;
use crate::verdict::{insufficient, PValueMethod, TestResult};

/// Minimum paired observations for a Spearman correlation.
pub const MIN_SPEARMAN_N: usize = 10;

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Ascending 1-based midranks.
///
/// `rank(&[5.0, 1.0, 1.0, 3.0]) == [4.0, 1.5, 1.5, 3.0]`.
pub fn rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // NaN never equals itself; give it its own block
        if j == i {
            j = i + 1;
        }
        // positions i..j (0-based) hold ranks i+1..=j; their mean is (i+1+j)/2
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Spearman correlation with its normal-approximation significance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpearmanResult {
    #[serde(with = "crate::serde_float")]
    pub rho: f64,
    pub n: usize,
    #[serde(with = "crate::serde_float")]
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub alpha: f64,
    pub method: PValueMethod,
    /// Set when a degenerate input short-circuited the t-test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Spearman rho between `x` and `y` at α = 0.05.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<TestResult<SpearmanResult>, StatsError> {
    spearman_with_alpha(x, y, DEFAULT_ALPHA)
}

/// Spearman rho between `x` and `y` at the given significance level.
///
/// Unequal lengths are an error; fewer than [`MIN_SPEARMAN_N`] pairs is untestable.
pub fn spearman_with_alpha(
    x: &[f64],
    y: &[f64],
    alpha: f64,
) -> Result<TestResult<SpearmanResult>, StatsError> {
    ensure_aligned(x, y)?;
    let n = x.len();
    if n < MIN_SPEARMAN_N {
        return Ok(TestResult::untestable(insufficient(
            "paired observations",
            n,
            MIN_SPEARMAN_N,
        )));
    }

    let rx = rank(x);
    let ry = rank(y);

    if is_constant(&rx) || is_constant(&ry) {
        debug!(n, "spearman: zero rank variance, rho reported as 0");
        return Ok(TestResult::tested(SpearmanResult {
            rho: 0.0,
            n,
            t_statistic: 0.0,
            p_value: 1.0,
            significant: false,
            alpha,
            method: PValueMethod::NormalApproximation,
            note: Some("zero variance".into()),
        }));
    }

    let rho = pearson_population(&rx, &ry);
    let t_statistic = rank_t_statistic(rho, n);
    let p_value = two_sided_p(t_statistic);

    Ok(TestResult::tested(SpearmanResult {
        rho,
        n,
        t_statistic,
        p_value,
        significant: p_value < alpha,
        alpha,
        method: PValueMethod::NormalApproximation,
        note: None,
    }))
}

/// Pearson correlation using population covariance and standard deviations.
fn pearson_population(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let ma = mean(a);
    let mb = mean(b);
    let cov = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / n;
    let rho = cov / (population_std(a) * population_std(b));
    rho.clamp(-1.0, 1.0)
}

/// `rho·sqrt((n−2)/(1−rho²))`; a perfect correlation maps to a signed infinity.
fn rank_t_statistic(rho: f64, n: usize) -> f64 {
    if 1.0 - rho.abs() <= 1e-12 {
        return if rho > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
    }
    rho * ((n as f64 - 2.0) / (1.0 - rho * rho)).sqrt()
}

// ─── Feature ranking ─────────────────────────────────────────────────

/// Correlation of one named feature against the target outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCorrelation {
    pub feature: String,
    #[serde(with = "crate::serde_float")]
    pub rho: f64,
    #[serde(with = "crate::serde_float")]
    pub abs_rho: f64,
    #[serde(with = "crate::serde_float")]
    pub t_statistic: f64,
    pub p_value: f64,
    /// Benjamini-Hochberg adjusted p-value across all ranked features.
    pub adjusted_p: f64,
    pub significant: bool,
    #[serde(with = "crate::serde_float")]
    pub mean_value: f64,
    #[serde(with = "crate::serde_float")]
    pub std_value: f64,
}

/// Correlate every feature against `target` and sort by descending `|rho|`.
///
/// All feature columns must align with `target`. Features with no rank
/// variance report rho 0, t 0, p 1. Fewer than [`MIN_SPEARMAN_N`] observations
/// makes the whole ranking untestable.
pub fn rank_features(
    features: &[(&str, &[f64])],
    target: &[f64],
    alpha: f64,
) -> Result<TestResult<Vec<FeatureCorrelation>>, StatsError> {
    for (_, values) in features {
        ensure_aligned(values, target)?;
    }
    if target.len() < MIN_SPEARMAN_N {
        return Ok(TestResult::untestable(insufficient(
            "observations",
            target.len(),
            MIN_SPEARMAN_N,
        )));
    }

    let mut ranked = Vec::with_capacity(features.len());
    for (name, values) in features {
        let result = spearman_with_alpha(values, target, alpha)?;
        let Some(s) = result.outcome else {
            continue;
        };
        ranked.push(FeatureCorrelation {
            feature: (*name).to_string(),
            rho: s.rho,
            abs_rho: s.rho.abs(),
            t_statistic: s.t_statistic,
            p_value: s.p_value,
            adjusted_p: s.p_value,
            significant: s.significant,
            mean_value: mean(values),
            std_value: population_std(values),
        });
    }

    let raw: Vec<(String, f64)> = ranked
        .iter()
        .map(|f| (f.feature.clone(), f.p_value))
        .collect();
    for adjusted in benjamini_hochberg(&raw, alpha) {
        if let Some(entry) = ranked.iter_mut().find(|f| f.feature == adjusted.label) {
            entry.adjusted_p = adjusted.adjusted_p;
        }
    }

    ranked.sort_by(|a, b| b.abs_rho.total_cmp(&a.abs_rho));
    debug!(features = ranked.len(), n = target.len(), "ranked features");
    Ok(TestResult::tested(ranked))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_assigns_midranks_to_ties() {
        assert_eq!(rank(&[5.0, 1.0, 1.0, 3.0]), vec![4.0, 1.5, 1.5, 3.0]);
    }

    #[test]
    fn rank_all_tied() {
        assert_eq!(rank(&[2.0, 2.0, 2.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn rank_sum_invariant() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        let n = v.len() as f64;
        let total: f64 = rank(&v).iter().sum();
        assert!((total - n * (n + 1.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn rank_empty() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn spearman_identity_is_one() {
        let x: Vec<f64> = (0..15).map(|i| (i as f64 * 0.7).sin()).collect();
        let s = spearman(&x, &x).unwrap().outcome.unwrap();
        assert!((s.rho - 1.0).abs() < 1e-12);
        assert_eq!(s.t_statistic, f64::INFINITY);
        assert_eq!(s.p_value, 0.0);
        assert!(s.significant);
    }

    #[test]
    fn spearman_reversed_is_minus_one() {
        let x: Vec<f64> = (0..12).map(|i| i as f64 * 1.5).collect();
        let y: Vec<f64> = x.iter().rev().copied().collect();
        let s = spearman(&x, &y).unwrap().outcome.unwrap();
        assert!((s.rho + 1.0).abs() < 1e-12);
    }

    #[test]
    fn spearman_monotone_nonlinear_is_one() {
        let x: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v.powi(3)).collect();
        let s = spearman(&x, &y).unwrap().outcome.unwrap();
        assert!((s.rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn spearman_too_few_is_untestable() {
        let x = [1.0, 2.0, 3.0];
        let r = spearman(&x, &x).unwrap();
        assert!(!r.is_testable());
        assert!(r.reason().unwrap().contains("3 paired observations"));
    }

    #[test]
    fn spearman_misaligned_is_error() {
        let x = vec![1.0; 12];
        let y = vec![1.0; 11];
        assert!(matches!(
            spearman(&x, &y),
            Err(StatsError::Misaligned { left: 12, right: 11 })
        ));
    }

    #[test]
    fn spearman_zero_variance_reports_note() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![4.0; 10];
        let s = spearman(&x, &y).unwrap().outcome.unwrap();
        assert_eq!(s.rho, 0.0);
        assert_eq!(s.p_value, 1.0);
        assert_eq!(s.note.as_deref(), Some("zero variance"));
    }

    #[test]
    fn feature_summary_with_overflow_keeps_infinities_in_json() {
        let fc = FeatureCorrelation {
            feature: "cancel_ratio".to_string(),
            rho: 1.0,
            abs_rho: 1.0,
            t_statistic: f64::INFINITY,
            p_value: 0.0,
            adjusted_p: 0.0,
            significant: true,
            mean_value: f64::INFINITY,
            std_value: f64::NAN,
        };
        let json = serde_json::to_string(&fc).unwrap();
        assert!(json.contains("\"mean_value\":\"inf\""), "{json}");
        assert!(json.contains("\"std_value\":\"nan\""), "{json}");
        let back: FeatureCorrelation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mean_value, f64::INFINITY);
        assert!(back.std_value.is_nan());
        assert_eq!(back.rho, 1.0);
    }

    #[test]
    fn spearman_uncorrelated_is_not_significant() {
        // alternating pattern has near-zero rank correlation with a ramp
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let s = spearman(&x, &y).unwrap().outcome.unwrap();
        assert!(s.rho.abs() < 0.2);
        assert!(!s.significant);
    }

    #[test]
    fn rank_features_sorted_by_abs_rho() {
        let target: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let strong_neg: Vec<f64> = target.iter().map(|v| -v).collect();
        let noise: Vec<f64> = (0..30).map(|i| ((i * 7) % 11) as f64).collect();
        let flat = vec![0.5; 30];
        let features: Vec<(&str, &[f64])> = vec![
            ("noise", &noise),
            ("flat", &flat),
            ("strong_neg", &strong_neg),
        ];
        let ranked = rank_features(&features, &target, 0.05)
            .unwrap()
            .outcome
            .unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].feature, "strong_neg");
        assert!((ranked[0].rho + 1.0).abs() < 1e-12);
        let flat = ranked.iter().find(|f| f.feature == "flat").unwrap();
        assert_eq!(flat.rho, 0.0);
        assert_eq!(flat.p_value, 1.0);
        assert_eq!(flat.std_value, 0.0);
        for w in ranked.windows(2) {
            assert!(w[0].abs_rho >= w[1].abs_rho);
        }
        for f in &ranked {
            assert!(f.adjusted_p >= f.p_value - 1e-12);
        }
    }

    #[test]
    fn rank_features_misaligned_column_is_error() {
        let target = vec![1.0; 12];
        let short = vec![1.0; 5];
        let features: Vec<(&str, &[f64])> = vec![("short", &short)];
        assert!(rank_features(&features, &target, 0.05).is_err());
    }
}
