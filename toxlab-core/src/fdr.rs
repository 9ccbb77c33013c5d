//! Benjamini-Hochberg false discovery rate correction.
//!
//! Applied when several correlations are tested against the same outcome
//! (the per-feature ranking), so that a handful of lucky features are not
//! reported as predictive.

use serde::{Deserialize, Serialize};

/// Adjusted p-value for one labelled hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FdrAdjusted {
    pub label: String,
    pub raw_p: f64,
    pub adjusted_p: f64,
    pub significant: bool,
}

/// Apply Benjamini-Hochberg correction to labelled p-values.
///
/// Given `m` tests sorted ascending, `adjusted_(k) = min(p_(k)·m/k, adjusted_(k+1))`,
/// clamped to 1. Returns results sorted by raw p-value (ascending).
pub fn benjamini_hochberg(p_values: &[(String, f64)], alpha: f64) -> Vec<FdrAdjusted> {
    if p_values.is_empty() {
        return Vec::new();
    }

    let m = p_values.len();
    let mut indexed: Vec<(&str, f64)> = p_values
        .iter()
        .map(|(label, p)| (label.as_str(), *p))
        .collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    // Step-up from the largest p-value.
    let mut adjusted = vec![0.0; m];
    adjusted[m - 1] = indexed[m - 1].1.min(1.0);
    for k in (0..m - 1).rev() {
        let corrected = indexed[k].1 * m as f64 / (k + 1) as f64;
        adjusted[k] = corrected.min(adjusted[k + 1]).min(1.0);
    }

    indexed
        .iter()
        .zip(adjusted.iter())
        .map(|(&(label, raw_p), &adjusted_p)| FdrAdjusted {
            label: label.to_string(),
            raw_p,
            adjusted_p,
            significant: adjusted_p <= alpha,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bh_empty() {
        assert!(benjamini_hochberg(&[], 0.05).is_empty());
    }

    #[test]
    fn bh_single_is_unchanged() {
        let result = benjamini_hochberg(&[("a".into(), 0.01)], 0.05);
        assert_eq!(result.len(), 1);
        assert!(result[0].significant);
        assert!((result[0].adjusted_p - 0.01).abs() < 1e-12);
    }

    #[test]
    fn bh_mixed_significance() {
        let pvals: Vec<(String, f64)> = vec![
            ("cancel_ratio".into(), 0.001),
            ("ping_ratio".into(), 0.020),
            ("odd_lot_ratio".into(), 0.040),
            ("precision_ratio".into(), 0.300),
            ("price_momentum".into(), 0.700),
        ];
        let result = benjamini_hochberg(&pvals, 0.05);
        // thresholds k/5·0.05: 0.01, 0.02, 0.03; the third fails
        let sig: Vec<&str> = result
            .iter()
            .filter(|r| r.significant)
            .map(|r| r.label.as_str())
            .collect();
        assert_eq!(sig, vec!["cancel_ratio", "ping_ratio"]);
    }

    #[test]
    fn bh_adjusted_p_monotonic_and_bounded() {
        let pvals: Vec<(String, f64)> = [0.5, 0.01, 0.9, 0.03, 0.05]
            .iter()
            .enumerate()
            .map(|(i, &p)| (format!("f{i}"), p))
            .collect();
        let result = benjamini_hochberg(&pvals, 0.05);
        for w in result.windows(2) {
            assert!(w[1].adjusted_p >= w[0].adjusted_p - 1e-12);
        }
        for r in &result {
            assert!(r.adjusted_p <= 1.0);
            assert!(r.adjusted_p >= r.raw_p - 1e-12);
        }
    }
}
