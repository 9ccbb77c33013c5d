//! JSON and plain-text reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

use toxlab_core::paired::{PairedComparison, WinFraction};
use toxlab_core::verdict::{ConfidenceInterval, TestResult};

use crate::fills::FillAnalysis;
use crate::hypotheses::HypothesisResults;
use crate::records::{HypothesisInput, RunTotals};
use crate::summary::{fill_efficiency, summarize_groups, FillEfficiency, GroupSummary};
use crate::symbols::SymbolBootstrap;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn write_pretty<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}

fn fmt_ci(ci: &ConfidenceInterval) -> String {
    format!("[{:.4}, {:.4}]", ci.lower, ci.upper)
}

fn verdict(yes: bool) -> &'static str {
    if yes {
        "SUPPORTED"
    } else {
        "not supported"
    }
}

fn write_untestable<T>(f: &mut fmt::Formatter<'_>, name: &str, result: &TestResult<T>) -> fmt::Result {
    writeln!(
        f,
        "  {name}: NOT TESTABLE ({})",
        result.reason().unwrap_or("no reason given")
    )
}

// ─── Hypothesis report ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub n_groups: usize,
    pub results: HypothesisResults,
    pub treatment_summary: TestResult<GroupSummary>,
    pub baseline_summary: TestResult<GroupSummary>,
    /// Present when the run totals include treatment fill counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_efficiency: Option<FillEfficiency>,
    pub run_totals: RunTotals,
}

impl HypothesisReport {
    pub fn new(input: &HypothesisInput, results: HypothesisResults, run_totals: RunTotals) -> Self {
        let fill_efficiency = run_totals
            .treatment_fills
            .is_some()
            .then(|| fill_efficiency(&run_totals));
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            n_groups: input.n_groups(),
            results,
            treatment_summary: summarize_groups(&input.pnl.treatment),
            baseline_summary: summarize_groups(&input.pnl.baseline),
            fill_efficiency,
            run_totals,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize hypothesis report")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_pretty(self, path)
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

fn write_paired(f: &mut fmt::Formatter<'_>, name: &str, result: &TestResult<PairedComparison>) -> fmt::Result {
    let Some(p) = result.outcome() else {
        return write_untestable(f, name, result);
    };
    writeln!(
        f,
        "  {name}: {} (baseline {:.4}, treatment {:.4}, reduction {:.1}%, t={:.3}, p={:.4}, improved {}/{})",
        verdict(p.significant),
        p.baseline_mean,
        p.treatment_mean,
        p.reduction_pct,
        p.t_statistic,
        p.p_value,
        p.units_improved,
        p.n
    )
}

fn write_wins(f: &mut fmt::Formatter<'_>, name: &str, result: &TestResult<WinFraction>) -> fmt::Result {
    let Some(w) = result.outcome() else {
        return write_untestable(f, name, result);
    };
    writeln!(
        f,
        "  {name}: {} ({}/{} groups = {:.1}%, p0={:.2}, exact p={:.4})",
        if w.passes { "PASS" } else { "FAIL" },
        w.successes,
        w.n,
        w.fraction * 100.0,
        w.p0,
        w.p_value
    )
}

fn write_summary(f: &mut fmt::Formatter<'_>, name: &str, result: &TestResult<GroupSummary>) -> fmt::Result {
    let Some(s) = result.outcome() else {
        return write_untestable(f, name, result);
    };
    writeln!(
        f,
        "  {name}: mean {:.4} ± {:.4}, Sharpe {:.4} (ann. {:.2}), 95% CI {}, power {:.2}",
        s.mean,
        s.std_dev,
        s.sharpe,
        s.annualized_sharpe,
        fmt_ci(&s.ci_95),
        s.power
    )?;
    if let Some(required) = s.required_groups {
        writeln!(f, "    groups for 80% power: {required}")?;
    }
    Ok(())
}

impl fmt::Display for HypothesisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hypothesis report ({} groups, {})", self.n_groups, self.generated_at.to_rfc3339())?;
        writeln!(f)?;

        writeln!(f, "Per-group PnL:")?;
        write_summary(f, "treatment", &self.treatment_summary)?;
        write_summary(f, "baseline", &self.baseline_summary)?;
        writeln!(f)?;

        writeln!(f, "Hypotheses:")?;
        let r = &self.results;
        match r.sharpe_improvement.outcome() {
            Some(s) => writeln!(
                f,
                "  sharpe_improvement: {} (Δ={:.4}, 95% CI {}, bootstrap p={:.4}, B={})",
                verdict(s.significant),
                s.observed_difference,
                fmt_ci(&s.ci_95),
                s.p_value,
                s.resamples
            )?,
            None => write_untestable(f, "sharpe_improvement", &r.sharpe_improvement)?,
        }
        write_paired(f, "adverse_selection_reduction", &r.adverse_selection_reduction)?;
        write_paired(f, "inventory_variance_reduction", &r.inventory_variance_reduction)?;
        write_wins(f, "cross_sectional_robustness", &r.cross_sectional_robustness)?;
        write_wins(f, "dominance", &r.dominance)?;

        if let Some(e) = &self.fill_efficiency {
            writeln!(f)?;
            writeln!(f, "Fill efficiency:")?;
            writeln!(
                f,
                "  fill rate {:.1}%, suppression {:.1}%, adverse fills {:.1}%",
                e.fill_rate * 100.0,
                e.suppression_rate * 100.0,
                e.adverse_fill_rate * 100.0
            )?;
            writeln!(
                f,
                "  PnL/fill treatment {:.4}, baseline {:.4}; penalty/adverse fill {:.4}",
                e.treatment_pnl_per_fill, e.baseline_pnl_per_fill, e.adverse_penalty_per_fill
            )?;
        }
        Ok(())
    }
}

// ─── Fill analysis report ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillAnalysisReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub fills: FillAnalysis,
    pub symbols: TestResult<SymbolBootstrap>,
}

impl FillAnalysisReport {
    pub fn new(fills: FillAnalysis, symbols: TestResult<SymbolBootstrap>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            fills,
            symbols,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize fill analysis report")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_pretty(self, path)
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FillAnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.fills;
        writeln!(f, "Fill analysis ({} fills, {})", a.n_fills, self.generated_at.to_rfc3339())?;
        writeln!(f)?;

        match a.toxicity_deciles.outcome() {
            Some(d) => {
                writeln!(
                    f,
                    "Toxicity deciles ({} treatment fills, {} baseline):",
                    d.n_fills, d.n_baseline_fills
                )?;
                for b in &d.buckets {
                    writeln!(
                        f,
                        "  D{:<2} n={:<6} toxicity {:.3} [{:.3}, {:.3}]  mean |adverse| {:.4}  total {:.2}",
                        b.decile,
                        b.n_fills,
                        b.mean_toxicity,
                        b.min_toxicity,
                        b.max_toxicity,
                        b.mean_abs_adverse_pnl,
                        b.total_abs_adverse_pnl
                    )?;
                }
            }
            None => write_untestable(f, "toxicity_deciles", &a.toxicity_deciles)?,
        }

        match a.toxicity_adverse_correlation.outcome() {
            Some(s) => writeln!(
                f,
                "Toxicity vs |adverse|: rho={:.4} (n={}, p={:.4}{})",
                s.rho,
                s.n,
                s.p_value,
                if s.significant { ", significant" } else { "" }
            )?,
            None => write_untestable(
                f,
                "toxicity_adverse_correlation",
                &a.toxicity_adverse_correlation,
            )?,
        }

        match a.feature_ranking.outcome() {
            Some(r) => {
                writeln!(f, "Feature ranking ({} fills):", r.n_fills)?;
                for c in &r.features {
                    writeln!(
                        f,
                        "  {:<22} rho={:+.4}  p={:.4}  BH p={:.4}{}",
                        c.feature,
                        c.rho,
                        c.p_value,
                        c.adjusted_p,
                        if c.significant { " *" } else { "" }
                    )?;
                }
            }
            None => write_untestable(f, "feature_ranking", &a.feature_ranking)?,
        }

        match a.time_series_hac.outcome() {
            Some(h) => {
                let e = &h.estimate;
                writeln!(
                    f,
                    "HAC over {} time bins: mean {:.4}, SE {:.4} (naive {:.4}, ×{:.2}), lag {}, p={:.4}, 95% CI {}",
                    h.n_time_bins,
                    e.mean,
                    e.hac_se,
                    e.naive_se,
                    e.se_inflation_ratio,
                    e.max_lag,
                    e.p_value,
                    fmt_ci(&e.ci_95)
                )?;
            }
            None => write_untestable(f, "time_series_hac", &a.time_series_hac)?,
        }

        match self.symbols.outcome() {
            Some(s) => {
                writeln!(
                    f,
                    "Symbol bootstrap ({} active symbols, B={}):",
                    s.n_symbols, s.resamples
                )?;
                writeln!(
                    f,
                    "  mean improvement {:.4}, 95% CI {}, p={:.4}",
                    s.observed_mean_improvement,
                    fmt_ci(&s.ci_95_mean_improvement),
                    s.p_value
                )?;
                writeln!(
                    f,
                    "  fraction improved {:.1}%, 95% CI {}",
                    s.fraction_improved * 100.0,
                    fmt_ci(&s.ci_95_fraction_improved)
                )?;
            }
            None => write_untestable(f, "symbol_bootstrap", &self.symbols)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::hypotheses::HypothesisSuite;

    fn report(totals: RunTotals) -> HypothesisReport {
        let baseline: Vec<f64> = (0..12).map(|i| (i as f64).sin() * 10.0).collect();
        let treatment: Vec<f64> = baseline.iter().map(|b| b + 3.0).collect();
        let input = HypothesisInput::from_columns(baseline, treatment).unwrap();
        let mut config = AnalysisConfig::default();
        config.hypotheses.bootstrap_resamples = 200;
        let results = HypothesisSuite::new(&config).run(&input).unwrap();
        HypothesisReport::new(&input, results, totals)
    }

    #[test]
    fn json_reloads() {
        let r = report(RunTotals::default());
        let json = r.to_json().unwrap();
        let back: HypothesisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.schema_version, SCHEMA_VERSION);
        assert_eq!(back.n_groups, 12);
        assert_eq!(back.generated_at, r.generated_at);
        assert_eq!(back.results.testability(), r.results.testability());
        assert!(back.fill_efficiency.is_none());
    }

    #[test]
    fn fill_efficiency_needs_fill_counts() {
        let r = report(RunTotals {
            treatment_fills: Some(10),
            quotes_suppressed: Some(10),
            ..RunTotals::default()
        });
        let e = r.fill_efficiency.as_ref().unwrap();
        assert!((e.fill_rate - 0.5).abs() < 1e-12);
        assert!(r.render_text().contains("Fill efficiency"));
    }

    #[test]
    fn text_names_untestable_hypotheses() {
        let text = report(RunTotals::default()).render_text();
        assert!(text.contains("adverse_selection_reduction: NOT TESTABLE"));
        assert!(text.contains("dominance: PASS"));
        assert!(text.contains("sharpe_improvement"));
    }

    #[test]
    fn write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report(RunTotals::default()).write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"schema_version\": 1"));
    }
}
