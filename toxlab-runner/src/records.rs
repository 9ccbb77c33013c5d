//! Typed input records handed to the analyses.
//!
//! Optional simulator columns are `Option` fields, so "column present" is a
//! type-level fact rather than a key lookup.

use serde::{Deserialize, Serialize};
use toxlab_core::error::{ensure_aligned, StatsError};

/// Which strategy produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm {
    Baseline,
    /// The simulator labels this arm `toxicity`.
    #[serde(alias = "toxicity")]
    Treatment,
}

/// One value per arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmPair {
    pub baseline: f64,
    pub treatment: f64,
}

impl ArmPair {
    pub fn new(baseline: f64, treatment: f64) -> Self {
        Self {
            baseline,
            treatment,
        }
    }
}

/// Per-group outcome of one simulator process group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group: u32,
    pub baseline_pnl: f64,
    pub treatment_pnl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse: Option<ArmPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_variance: Option<ArmPair>,
}

impl GroupRecord {
    pub fn new(group: u32, baseline_pnl: f64, treatment_pnl: f64) -> Self {
        Self {
            group,
            baseline_pnl,
            treatment_pnl,
            adverse: None,
            inventory_variance: None,
        }
    }

    pub fn with_adverse(mut self, baseline: f64, treatment: f64) -> Self {
        self.adverse = Some(ArmPair::new(baseline, treatment));
        self
    }

    pub fn with_inventory_variance(mut self, baseline: f64, treatment: f64) -> Self {
        self.inventory_variance = Some(ArmPair::new(baseline, treatment));
        self
    }
}

// ─── Fills ───────────────────────────────────────────────────────────

/// Feature names in their canonical order.
pub const FEATURE_NAMES: [&str; 8] = [
    "cancel_ratio",
    "ping_ratio",
    "odd_lot_ratio",
    "precision_ratio",
    "resistance_ratio",
    "trade_flow_imbalance",
    "spread_change_rate",
    "price_momentum",
];

/// The eight order-flow toxicity features recorded at fill time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub cancel_ratio: f64,
    pub ping_ratio: f64,
    pub odd_lot_ratio: f64,
    pub precision_ratio: f64,
    pub resistance_ratio: f64,
    pub trade_flow_imbalance: f64,
    pub spread_change_rate: f64,
    pub price_momentum: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.cancel_ratio,
            self.ping_ratio,
            self.odd_lot_ratio,
            self.precision_ratio,
            self.resistance_ratio,
            self.trade_flow_imbalance,
            self.spread_change_rate,
            self.price_momentum,
        ]
    }
}

/// A single simulated fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub group: u32,
    pub symbol: u32,
    pub ticker: String,
    pub arm: Arm,
    pub fill_time_ns: i64,
    pub fill_price: f64,
    pub fill_qty: i64,
    pub is_buy: bool,
    pub mid_price_at_fill: f64,
    pub toxicity_at_fill: f64,
    pub adverse_measured: bool,
    pub adverse_pnl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

impl FillRecord {
    /// Spread capture against the mid, sign-flipped for buys, plus adverse PnL.
    pub fn pnl_contribution(&self) -> f64 {
        let spread = (self.fill_price - self.mid_price_at_fill) * self.fill_qty as f64;
        let spread = if self.is_buy { -spread } else { spread };
        spread + self.adverse_pnl
    }
}

// ─── Symbols ─────────────────────────────────────────────────────────

/// Per-symbol totals for one group. Deserializes directly from the
/// simulator's `symbols_group_*.csv` headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub group: u32,
    pub symbol_index: u32,
    pub ticker: String,
    pub baseline_pnl: f64,
    #[serde(alias = "toxicity_pnl")]
    pub treatment_pnl: f64,
    pub improvement: f64,
    pub baseline_fills: u64,
    #[serde(alias = "toxicity_fills")]
    pub treatment_fills: u64,
    pub quotes_suppressed: u64,
    pub baseline_adverse_pnl: f64,
    #[serde(alias = "toxicity_adverse_pnl")]
    pub treatment_adverse_pnl: f64,
    pub baseline_inv_var: f64,
    #[serde(alias = "toxicity_inv_var")]
    pub treatment_inv_var: f64,
}

impl SymbolRecord {
    /// Traded at least once in either arm.
    pub fn is_active(&self) -> bool {
        self.baseline_fills > 0 || self.treatment_fills > 0
    }
}

// ─── Run totals ──────────────────────────────────────────────────────

/// Whole-run aggregates printed by the simulator. Each may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub baseline_total_pnl: Option<f64>,
    pub treatment_total_pnl: Option<f64>,
    pub baseline_fills: Option<u64>,
    pub treatment_fills: Option<u64>,
    pub quotes_suppressed: Option<u64>,
    pub adverse_fills: Option<u64>,
    pub adverse_penalty: Option<f64>,
}

// ─── Hypothesis input ────────────────────────────────────────────────

/// Two index-aligned columns, one per arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmColumns {
    pub baseline: Vec<f64>,
    pub treatment: Vec<f64>,
}

impl ArmColumns {
    pub fn new(baseline: Vec<f64>, treatment: Vec<f64>) -> Result<Self, StatsError> {
        ensure_aligned(&baseline, &treatment)?;
        Ok(Self {
            baseline,
            treatment,
        })
    }

    pub fn len(&self) -> usize {
        self.baseline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baseline.is_empty()
    }

    fn from_pairs(pairs: impl Iterator<Item = ArmPair>) -> Self {
        let (baseline, treatment) = pairs.map(|p| (p.baseline, p.treatment)).unzip();
        Self {
            baseline,
            treatment,
        }
    }
}

/// Aligned per-group columns for the hypothesis suite.
///
/// An optional column is `Some` only when every group carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisInput {
    pub pnl: ArmColumns,
    pub adverse: Option<ArmColumns>,
    pub inventory_variance: Option<ArmColumns>,
}

impl HypothesisInput {
    pub fn from_groups(groups: &[GroupRecord]) -> Self {
        let pnl = ArmColumns::from_pairs(
            groups
                .iter()
                .map(|g| ArmPair::new(g.baseline_pnl, g.treatment_pnl)),
        );
        let adverse = groups
            .iter()
            .map(|g| g.adverse)
            .collect::<Option<Vec<_>>>()
            .map(|pairs| ArmColumns::from_pairs(pairs.into_iter()));
        let inventory_variance = groups
            .iter()
            .map(|g| g.inventory_variance)
            .collect::<Option<Vec<_>>>()
            .map(|pairs| ArmColumns::from_pairs(pairs.into_iter()));
        Self {
            pnl,
            adverse,
            inventory_variance,
        }
    }

    /// Build from raw PnL columns; unequal lengths are an error.
    pub fn from_columns(baseline: Vec<f64>, treatment: Vec<f64>) -> Result<Self, StatsError> {
        Ok(Self {
            pnl: ArmColumns::new(baseline, treatment)?,
            adverse: None,
            inventory_variance: None,
        })
    }

    pub fn with_adverse(mut self, baseline: Vec<f64>, treatment: Vec<f64>) -> Result<Self, StatsError> {
        let cols = ArmColumns::new(baseline, treatment)?;
        ensure_aligned(&self.pnl.baseline, &cols.baseline)?;
        self.adverse = Some(cols);
        Ok(self)
    }

    pub fn with_inventory_variance(
        mut self,
        baseline: Vec<f64>,
        treatment: Vec<f64>,
    ) -> Result<Self, StatsError> {
        let cols = ArmColumns::new(baseline, treatment)?;
        ensure_aligned(&self.pnl.baseline, &cols.baseline)?;
        self.inventory_variance = Some(cols);
        Ok(self)
    }

    pub fn n_groups(&self) -> usize {
        self.pnl.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toxicity_label_maps_to_treatment() {
        let arm: Arm = serde_json::from_str(r#""toxicity""#).unwrap();
        assert_eq!(arm, Arm::Treatment);
        let arm: Arm = serde_json::from_str(r#""baseline""#).unwrap();
        assert_eq!(arm, Arm::Baseline);
        assert_eq!(serde_json::to_string(&Arm::Treatment).unwrap(), r#""treatment""#);
    }

    #[test]
    fn optional_columns_need_every_group() {
        let groups = vec![
            GroupRecord::new(0, 1.0, 2.0).with_adverse(-3.0, -1.0),
            GroupRecord::new(1, 1.5, 2.5).with_adverse(-2.0, -1.5),
            GroupRecord::new(2, 0.5, 1.0),
        ];
        let input = HypothesisInput::from_groups(&groups);
        assert_eq!(input.n_groups(), 3);
        assert!(input.adverse.is_none());

        let input = HypothesisInput::from_groups(&groups[..2]);
        let adverse = input.adverse.unwrap();
        assert_eq!(adverse.baseline, vec![-3.0, -2.0]);
        assert_eq!(adverse.treatment, vec![-1.0, -1.5]);
        assert!(input.inventory_variance.is_none());
    }

    #[test]
    fn from_columns_rejects_misalignment() {
        assert_eq!(
            HypothesisInput::from_columns(vec![1.0, 2.0], vec![1.0]),
            Err(StatsError::Misaligned { left: 2, right: 1 })
        );
        let input = HypothesisInput::from_columns(vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
        assert!(input.with_adverse(vec![1.0], vec![1.0]).is_err());
    }

    #[test]
    fn pnl_contribution_flips_buys() {
        let mut fill = FillRecord {
            group: 0,
            symbol: 1,
            ticker: "AAPL".into(),
            arm: Arm::Treatment,
            fill_time_ns: 0,
            fill_price: 100.02,
            fill_qty: 100,
            is_buy: false,
            mid_price_at_fill: 100.0,
            toxicity_at_fill: 0.3,
            adverse_measured: true,
            adverse_pnl: -1.0,
            features: None,
        };
        assert!((fill.pnl_contribution() - 1.0).abs() < 1e-9);
        fill.is_buy = true;
        fill.fill_price = 99.98;
        assert!((fill.pnl_contribution() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn feature_values_follow_name_order() {
        let fv = FeatureVector {
            cancel_ratio: 1.0,
            ping_ratio: 2.0,
            odd_lot_ratio: 3.0,
            precision_ratio: 4.0,
            resistance_ratio: 5.0,
            trade_flow_imbalance: 6.0,
            spread_change_rate: 7.0,
            price_momentum: 8.0,
        };
        assert_eq!(fv.values(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(FEATURE_NAMES.len(), fv.values().len());
    }
}
