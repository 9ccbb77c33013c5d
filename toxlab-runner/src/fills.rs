//! Per-fill analyses of the treatment arm.
//!
//! - Toxicity deciles: does a higher score precede larger adverse moves?
//! - Spearman of toxicity score against |adverse PnL|
//! - Per-feature Spearman ranking with Benjamini-Hochberg adjustment
//! - Newey-West mean of fill PnL in fixed time bins

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use toxlab_core::descriptive::mean;
use toxlab_core::error::StatsError;
use toxlab_core::hac::{newey_west_binned, BinnedHacEstimate, TimedValue};
use toxlab_core::rank::{rank_features, spearman_with_alpha, FeatureCorrelation, SpearmanResult};
use toxlab_core::verdict::{insufficient, TestResult};

use crate::config::FillConfig;
use crate::records::{Arm, FillRecord, FEATURE_NAMES};

const DECILES: usize = 10;

// ─── Toxicity deciles ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicityBucket {
    /// 1-based.
    pub decile: usize,
    pub n_fills: usize,
    pub mean_toxicity: f64,
    pub min_toxicity: f64,
    pub max_toxicity: f64,
    pub mean_abs_adverse_pnl: f64,
    pub total_abs_adverse_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicityDeciles {
    pub n_fills: usize,
    pub n_baseline_fills: usize,
    pub buckets: Vec<ToxicityBucket>,
}

fn measured(fills: &[FillRecord], arm: Arm) -> Vec<&FillRecord> {
    fills
        .iter()
        .filter(|f| f.arm == arm && f.adverse_measured)
        .collect()
}

/// Sort measured treatment fills by score and split into ten buckets of
/// `max(1, n/10)`. The last bucket takes the remainder.
pub fn toxicity_deciles(fills: &[FillRecord], min_fills: usize) -> TestResult<ToxicityDeciles> {
    let mut treated = measured(fills, Arm::Treatment);
    let n = treated.len();
    if n < min_fills {
        return TestResult::untestable(insufficient("measured treatment fills", n, min_fills));
    }
    let n_baseline_fills = measured(fills, Arm::Baseline).len();
    treated.sort_by(|a, b| a.toxicity_at_fill.total_cmp(&b.toxicity_at_fill));

    let size = (n / DECILES).max(1);
    let mut buckets = Vec::with_capacity(DECILES);
    for decile in 0..DECILES {
        let start = decile * size;
        let end = if decile == DECILES - 1 {
            n
        } else {
            ((decile + 1) * size).min(n)
        };
        if start >= end {
            continue;
        }
        let bucket = &treated[start..end];
        let toxicity: Vec<f64> = bucket.iter().map(|f| f.toxicity_at_fill).collect();
        let adverse: Vec<f64> = bucket.iter().map(|f| f.adverse_pnl.abs()).collect();
        buckets.push(ToxicityBucket {
            decile: decile + 1,
            n_fills: bucket.len(),
            mean_toxicity: mean(&toxicity),
            min_toxicity: toxicity.iter().copied().fold(f64::INFINITY, f64::min),
            max_toxicity: toxicity.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_abs_adverse_pnl: mean(&adverse),
            total_abs_adverse_pnl: adverse.iter().sum(),
        });
    }

    TestResult::tested(ToxicityDeciles {
        n_fills: n,
        n_baseline_fills,
        buckets,
    })
}

// ─── Rank correlations ───────────────────────────────────────────────

/// Spearman of toxicity score against |adverse PnL| over measured treatment fills.
pub fn toxicity_adverse_correlation(
    fills: &[FillRecord],
    min_n: usize,
    alpha: f64,
) -> Result<TestResult<SpearmanResult>, StatsError> {
    let treated = measured(fills, Arm::Treatment);
    if treated.len() < min_n {
        return Ok(TestResult::untestable(insufficient(
            "measured treatment fills",
            treated.len(),
            min_n,
        )));
    }
    let toxicity: Vec<f64> = treated.iter().map(|f| f.toxicity_at_fill).collect();
    let adverse: Vec<f64> = treated.iter().map(|f| f.adverse_pnl.abs()).collect();
    spearman_with_alpha(&toxicity, &adverse, alpha)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanking {
    pub n_fills: usize,
    /// Sorted by descending `|rho|`.
    pub features: Vec<FeatureCorrelation>,
}

/// Rank the eight features by |Spearman rho| against |adverse PnL|.
///
/// Every measured treatment fill must carry a feature vector.
pub fn feature_ranking(
    fills: &[FillRecord],
    min_fills: usize,
    alpha: f64,
) -> Result<TestResult<FeatureRanking>, StatsError> {
    let treated = measured(fills, Arm::Treatment);
    let n = treated.len();
    if n < min_fills {
        return Ok(TestResult::untestable(insufficient(
            "measured treatment fills",
            n,
            min_fills,
        )));
    }
    let Some(vectors) = treated
        .iter()
        .map(|f| f.features)
        .collect::<Option<Vec<_>>>()
    else {
        return Ok(TestResult::untestable("feature columns not present for every fill"));
    };

    let adverse: Vec<f64> = treated.iter().map(|f| f.adverse_pnl.abs()).collect();
    let columns: Vec<Vec<f64>> = (0..FEATURE_NAMES.len())
        .map(|k| vectors.iter().map(|v| v.values()[k]).collect())
        .collect();
    let named: Vec<(&str, &[f64])> = FEATURE_NAMES
        .iter()
        .zip(&columns)
        .map(|(name, col)| (*name, col.as_slice()))
        .collect();

    Ok(rank_features(&named, &adverse, alpha)?.map(|features| FeatureRanking { n_fills: n, features }))
}

// ─── Time-series HAC ─────────────────────────────────────────────────

/// Newey-West over binned treatment-fill PnL. Windows with no fills are dropped.
pub fn fill_pnl_hac(
    fills: &[FillRecord],
    config: &FillConfig,
) -> Result<TestResult<BinnedHacEstimate>, StatsError> {
    let observations: Vec<TimedValue> = fills
        .iter()
        .filter(|f| f.arm == Arm::Treatment)
        .map(|f| TimedValue::new(f.fill_time_ns, f.pnl_contribution()))
        .collect();
    if observations.is_empty() {
        return Ok(TestResult::untestable("no treatment fills"));
    }
    newey_west_binned(
        &observations,
        config.bin_width_ns,
        config.min_bins,
        config.max_lag,
    )
}

// ─── Combined ────────────────────────────────────────────────────────

/// Every per-fill analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillAnalysis {
    pub n_fills: usize,
    pub toxicity_deciles: TestResult<ToxicityDeciles>,
    pub toxicity_adverse_correlation: TestResult<SpearmanResult>,
    pub feature_ranking: TestResult<FeatureRanking>,
    pub time_series_hac: TestResult<BinnedHacEstimate>,
}

pub fn analyze_fills(
    fills: &[FillRecord],
    config: &FillConfig,
    alpha: f64,
) -> Result<FillAnalysis, StatsError> {
    debug!(n_fills = fills.len(), "analyzing fills");
    let analysis = FillAnalysis {
        n_fills: fills.len(),
        toxicity_deciles: toxicity_deciles(fills, config.min_fills),
        toxicity_adverse_correlation: toxicity_adverse_correlation(
            fills,
            config.min_spearman_n,
            alpha,
        )?,
        feature_ranking: feature_ranking(fills, config.min_fills, alpha)?,
        time_series_hac: fill_pnl_hac(fills, config)?,
    };

    for (name, reason) in [
        ("toxicity_deciles", analysis.toxicity_deciles.reason()),
        (
            "toxicity_adverse_correlation",
            analysis.toxicity_adverse_correlation.reason(),
        ),
        ("feature_ranking", analysis.feature_ranking.reason()),
        ("time_series_hac", analysis.time_series_hac.reason()),
    ] {
        if let Some(reason) = reason {
            warn!(analysis = name, reason, "fill analysis not testable");
        }
    }
    Ok(analysis)
}
