//! Loaders for simulator output.
//!
//! - `fills_group_*.csv` / `symbols_group_*.csv` in an output directory,
//!   read in sorted file-name order
//! - The simulator's text log: per-group result lines and whole-run totals

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::records::{Arm, FeatureVector, FillRecord, GroupRecord, RunTotals, SymbolRecord};

/// Errors from the loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed {field} in {context}: '{value}'")]
    Malformed {
        context: String,
        field: String,
        value: String,
    },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Raw fill row as written by the simulator.
#[derive(Debug, Deserialize)]
struct FillRow {
    group: u32,
    symbol: u32,
    ticker: String,
    strategy: Arm,
    fill_time_ns: i64,
    fill_price: f64,
    fill_qty: i64,
    is_buy: String,
    mid_price_at_fill: f64,
    toxicity_at_fill: f64,
    #[serde(default)]
    adverse_measured: Option<String>,
    adverse_pnl: f64,
    #[serde(default)]
    cancel_ratio: Option<f64>,
    #[serde(default)]
    ping_ratio: Option<f64>,
    #[serde(default)]
    odd_lot_ratio: Option<f64>,
    #[serde(default)]
    precision_ratio: Option<f64>,
    #[serde(default)]
    resistance_ratio: Option<f64>,
    #[serde(default)]
    trade_flow_imbalance: Option<f64>,
    #[serde(default)]
    spread_change_rate: Option<f64>,
    #[serde(default)]
    price_momentum: Option<f64>,
}

fn flag(value: &str) -> bool {
    let v = value.trim();
    v == "1" || v.eq_ignore_ascii_case("true")
}

impl FillRow {
    fn features(&self) -> Option<FeatureVector> {
        Some(FeatureVector {
            cancel_ratio: self.cancel_ratio?,
            ping_ratio: self.ping_ratio?,
            odd_lot_ratio: self.odd_lot_ratio?,
            precision_ratio: self.precision_ratio?,
            resistance_ratio: self.resistance_ratio?,
            trade_flow_imbalance: self.trade_flow_imbalance?,
            spread_change_rate: self.spread_change_rate?,
            price_momentum: self.price_momentum?,
        })
    }

    fn into_record(self) -> FillRecord {
        let features = self.features();
        FillRecord {
            group: self.group,
            symbol: self.symbol,
            ticker: self.ticker,
            arm: self.strategy,
            fill_time_ns: self.fill_time_ns,
            fill_price: self.fill_price,
            fill_qty: self.fill_qty,
            is_buy: flag(&self.is_buy),
            mid_price_at_fill: self.mid_price_at_fill,
            toxicity_at_fill: self.toxicity_at_fill,
            adverse_measured: self.adverse_measured.as_deref().map_or(true, flag),
            adverse_pnl: self.adverse_pnl,
            features,
        }
    }
}

/// Files in `dir` named `{prefix}*.csv`, sorted by name.
fn matching_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".csv"));
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_csv<T, R>(path: &Path, convert: impl Fn(T) -> R) -> Result<Vec<R>, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let mut out = Vec::new();
    for row in reader.deserialize::<T>() {
        out.push(convert(row.map_err(csv_err)?));
    }
    Ok(out)
}

/// Load every `fills_group_*.csv` in `dir`.
pub fn load_fills(dir: &Path) -> Result<Vec<FillRecord>, LoadError> {
    let mut fills = Vec::new();
    for path in matching_files(dir, "fills_group_")? {
        let rows = read_csv(&path, FillRow::into_record)?;
        debug!(path = %path.display(), rows = rows.len(), "read fills file");
        fills.extend(rows);
    }
    info!(dir = %dir.display(), fills = fills.len(), "loaded fills");
    Ok(fills)
}

/// Load every `symbols_group_*.csv` in `dir`.
pub fn load_symbols(dir: &Path) -> Result<Vec<SymbolRecord>, LoadError> {
    let mut symbols = Vec::new();
    for path in matching_files(dir, "symbols_group_")? {
        let rows = read_csv(&path, |row: SymbolRecord| row)?;
        debug!(path = %path.display(), rows = rows.len(), "read symbols file");
        symbols.extend(rows);
    }
    info!(dir = %dir.display(), symbols = symbols.len(), "loaded symbols");
    Ok(symbols)
}

// ─── Simulator log ───────────────────────────────────────────────────

const NUM: &str = r"[-+]?\d+(?:\.\d*)?(?:[eE][-+]?\d+)?";

/// Group records and run totals recovered from a simulator log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorLog {
    pub groups: Vec<GroupRecord>,
    pub totals: RunTotals,
}

fn parse_f64(value: &str, field: &str) -> Result<f64, LoadError> {
    value.parse().map_err(|_| LoadError::Malformed {
        context: "simulator log".into(),
        field: field.into(),
        value: value.into(),
    })
}

fn parse_u64(value: &str, field: &str) -> Result<u64, LoadError> {
    value.replace(',', "").parse().map_err(|_| LoadError::Malformed {
        context: "simulator log".into(),
        field: field.into(),
        value: value.into(),
    })
}

/// First `label: value` occurrence (case-insensitive, optional `$`).
fn find_labelled<'t>(text: &'t str, label: &str, value_pattern: &str) -> Result<Option<&'t str>, LoadError> {
    let re = Regex::new(&format!(
        r"(?i){}\s*[:=]?\s*\$?({value_pattern})",
        regex::escape(label)
    ))?;
    Ok(re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str()))
}

fn parse_totals(text: &str) -> Result<RunTotals, LoadError> {
    let float = |label: &str| -> Result<Option<f64>, LoadError> {
        find_labelled(text, label, NUM)?
            .map(|v| parse_f64(v, label))
            .transpose()
    };
    let count = |label: &str| -> Result<Option<u64>, LoadError> {
        find_labelled(text, label, r"\d[\d,]*")?
            .map(|v| parse_u64(v, label))
            .transpose()
    };
    Ok(RunTotals {
        baseline_total_pnl: float("Baseline Total PnL")?,
        treatment_total_pnl: float("Toxicity Total PnL")?,
        baseline_fills: count("Baseline fills")?,
        treatment_fills: count("Toxicity fills")?,
        quotes_suppressed: count("Quotes suppressed")?,
        adverse_fills: count("Adverse fills")?,
        adverse_penalty: float("Total adverse penalty")?,
    })
}

/// Parse per-group results and run totals from simulator log text.
///
/// Full `Group N: baseline_pnl=…, toxicity_pnl=…, baseline_adv=…,
/// toxicity_adv=…, baseline_inv_var=…, toxicity_inv_var=…` lines take
/// precedence. Without them, `Aggregation done: … baseline $X, toxicity $Y`
/// lines give PnL-only groups numbered in order of appearance.
pub fn parse_simulator_log(text: &str) -> Result<SimulatorLog, LoadError> {
    let detailed = Regex::new(&format!(
        r"Group (\d+): baseline_pnl=({NUM}), toxicity_pnl=({NUM}), baseline_adv=({NUM}), toxicity_adv=({NUM}), baseline_inv_var=({NUM}), toxicity_inv_var=({NUM})"
    ))?;
    let mut groups = Vec::new();
    for caps in detailed.captures_iter(text) {
        let field = |i: usize, name: &str| parse_f64(&caps[i], name);
        let group = u32::try_from(parse_u64(&caps[1], "group")?).map_err(|_| {
            LoadError::Malformed {
                context: "simulator log".into(),
                field: "group".into(),
                value: caps[1].into(),
            }
        })?;
        groups.push(
            GroupRecord::new(group, field(2, "baseline_pnl")?, field(3, "toxicity_pnl")?)
                .with_adverse(field(4, "baseline_adv")?, field(5, "toxicity_adv")?)
                .with_inventory_variance(
                    field(6, "baseline_inv_var")?,
                    field(7, "toxicity_inv_var")?,
                ),
        );
    }

    if groups.is_empty() {
        let aggregation = Regex::new(&format!(
            r"Aggregation done: [^\n]*baseline \$({NUM}), toxicity \$({NUM})"
        ))?;
        for (i, caps) in aggregation.captures_iter(text).enumerate() {
            groups.push(GroupRecord::new(
                i as u32,
                parse_f64(&caps[1], "baseline")?,
                parse_f64(&caps[2], "toxicity")?,
            ));
        }
    }

    let totals = parse_totals(text)?;
    debug!(groups = groups.len(), "parsed simulator log");
    Ok(SimulatorLog { groups, totals })
}

pub fn load_simulator_log(path: &Path) -> Result<SimulatorLog, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let log = parse_simulator_log(&text)?;
    info!(path = %path.display(), groups = log.groups.len(), "loaded simulator log");
    Ok(log)
}
