//! The five group-level hypothesis tests.
//!
//! 1. Sharpe improvement: bootstrap of `Sharpe(treatment) − Sharpe(baseline)`
//! 2. Adverse-selection reduction: paired one-sided test on |adverse PnL|
//! 3. Inventory-variance reduction: paired one-sided test on inventory variance
//! 4. Cross-sectional robustness: exact binomial tail of group wins vs p0 = 0.8
//! 5. Dominance proxy: the same tail vs p0 = 0.9
//!
//! Testability depends only on group count and on which optional columns the
//! input carries. The result always holds all five entries.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use toxlab_core::bootstrap::{bootstrap, par_bootstrap, statistics, BootstrapConfig};
use toxlab_core::descriptive::{sharpe, sharpe_difference};
use toxlab_core::error::StatsError;
use toxlab_core::paired::{paired_less, win_fraction_test, PairedComparison, PassRule, WinFraction};
use toxlab_core::verdict::{insufficient, ConfidenceInterval, PValueMethod, TestResult};

use crate::config::{AnalysisConfig, HypothesisConfig};
use crate::records::{ArmColumns, HypothesisInput};

/// Bootstrap verdict on the Sharpe-ratio difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharpeImprovement {
    pub n_groups: usize,
    #[serde(with = "toxlab_core::serde_float")]
    pub sharpe_baseline: f64,
    #[serde(with = "toxlab_core::serde_float")]
    pub sharpe_treatment: f64,
    #[serde(with = "toxlab_core::serde_float")]
    pub observed_difference: f64,
    /// Fraction of resampled differences ≤ 0.
    pub p_value: f64,
    pub significant: bool,
    pub alpha: f64,
    pub ci_95: ConfidenceInterval,
    pub resamples: usize,
    pub seed: u64,
    pub parallel: bool,
    pub method: PValueMethod,
}

/// All five verdicts, keyed by name when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisResults {
    pub sharpe_improvement: TestResult<SharpeImprovement>,
    pub adverse_selection_reduction: TestResult<PairedComparison>,
    pub inventory_variance_reduction: TestResult<PairedComparison>,
    pub cross_sectional_robustness: TestResult<WinFraction>,
    pub dominance: TestResult<WinFraction>,
}

impl HypothesisResults {
    /// `(name, testable, reason)` for each test in order.
    pub fn testability(&self) -> [(&'static str, bool, Option<&str>); 5] {
        [
            (
                "sharpe_improvement",
                self.sharpe_improvement.is_testable(),
                self.sharpe_improvement.reason(),
            ),
            (
                "adverse_selection_reduction",
                self.adverse_selection_reduction.is_testable(),
                self.adverse_selection_reduction.reason(),
            ),
            (
                "inventory_variance_reduction",
                self.inventory_variance_reduction.is_testable(),
                self.inventory_variance_reduction.reason(),
            ),
            (
                "cross_sectional_robustness",
                self.cross_sectional_robustness.is_testable(),
                self.cross_sectional_robustness.reason(),
            ),
            (
                "dominance",
                self.dominance.is_testable(),
                self.dominance.reason(),
            ),
        ]
    }
}

/// Runs the five tests with one configuration.
#[derive(Debug, Clone)]
pub struct HypothesisSuite {
    config: HypothesisConfig,
    parallel: bool,
}

impl HypothesisSuite {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.hypotheses.clone(),
            parallel: config.parallel,
        }
    }

    pub fn run(&self, input: &HypothesisInput) -> Result<HypothesisResults, StatsError> {
        debug!(
            n_groups = input.n_groups(),
            adverse = input.adverse.is_some(),
            inventory = input.inventory_variance.is_some(),
            "running hypothesis suite"
        );

        let results = HypothesisResults {
            sharpe_improvement: self.sharpe_improvement(&input.pnl)?,
            adverse_selection_reduction: self.adverse_selection(input.adverse.as_ref())?,
            inventory_variance_reduction: self.inventory_variance(input.inventory_variance.as_ref())?,
            cross_sectional_robustness: win_fraction_test(
                &input.pnl.treatment,
                &input.pnl.baseline,
                self.config.cross_section_p0,
                PassRule::Exceeds,
            )?,
            dominance: win_fraction_test(
                &input.pnl.treatment,
                &input.pnl.baseline,
                self.config.dominance_p0,
                PassRule::AtLeast,
            )?,
        };

        for (name, testable, reason) in results.testability() {
            if !testable {
                warn!(test = name, reason = reason.unwrap_or(""), "hypothesis not testable");
            }
        }
        Ok(results)
    }

    /// Test 1. Needs `min_bootstrap_groups` groups.
    pub fn sharpe_improvement(
        &self,
        pnl: &ArmColumns,
    ) -> Result<TestResult<SharpeImprovement>, StatsError> {
        let n = pnl.len();
        if n < self.config.min_bootstrap_groups {
            return Ok(TestResult::untestable(insufficient(
                "groups",
                n,
                self.config.min_bootstrap_groups,
            )));
        }

        let cfg: BootstrapConfig = self.config.bootstrap();
        let samples: [&[f64]; 2] = [&pnl.treatment, &pnl.baseline];
        let stat = statistics::sharpe_difference(0, 1);
        let dist = if self.parallel {
            par_bootstrap(&samples, &stat, cfg)?
        } else {
            bootstrap(&samples, &stat, cfg)?
        };

        let p_value = dist.p_value_le_zero();
        Ok(TestResult::tested(SharpeImprovement {
            n_groups: n,
            sharpe_baseline: sharpe(&pnl.baseline),
            sharpe_treatment: sharpe(&pnl.treatment),
            observed_difference: sharpe_difference(&pnl.treatment, &pnl.baseline),
            p_value,
            significant: p_value < self.config.alpha,
            alpha: self.config.alpha,
            ci_95: dist.ci_95(),
            resamples: cfg.resamples,
            seed: cfg.seed,
            parallel: self.parallel,
            method: PValueMethod::Bootstrap,
        }))
    }

    /// Test 2. Penalties are compared by magnitude.
    pub fn adverse_selection(
        &self,
        adverse: Option<&ArmColumns>,
    ) -> Result<TestResult<PairedComparison>, StatsError> {
        let Some(cols) = adverse else {
            return Ok(TestResult::untestable(
                "no per-group adverse-selection metrics for every group",
            ));
        };
        let baseline: Vec<f64> = cols.baseline.iter().map(|v| v.abs()).collect();
        let treatment: Vec<f64> = cols.treatment.iter().map(|v| v.abs()).collect();
        paired_less(
            &treatment,
            &baseline,
            self.config.min_paired_groups,
            self.config.alpha,
        )
    }

    /// Test 3.
    pub fn inventory_variance(
        &self,
        inventory: Option<&ArmColumns>,
    ) -> Result<TestResult<PairedComparison>, StatsError> {
        let Some(cols) = inventory else {
            return Ok(TestResult::untestable(
                "no per-group inventory-variance metrics for every group",
            ));
        };
        paired_less(
            &cols.treatment,
            &cols.baseline,
            self.config.min_paired_groups,
            self.config.alpha,
        )
    }
}
