//! Loader integration tests against files in a temporary directory.

use std::path::Path;
use toxlab_runner::{
    load_fills, load_simulator_log, load_symbols, run_fill_analysis, AnalysisConfig, Arm, LoadError,
};

const FILL_HEADER: &str = "group,symbol,ticker,strategy,fill_time_ns,fill_price,fill_qty,is_buy,mid_price_at_fill,toxicity_at_fill,adverse_measured,adverse_pnl";
const FEATURE_HEADER: &str = ",cancel_ratio,ping_ratio,odd_lot_ratio,precision_ratio,resistance_ratio,trade_flow_imbalance,spread_change_rate,price_momentum";
const SYMBOL_HEADER: &str = "group,symbol_index,ticker,baseline_pnl,toxicity_pnl,improvement,baseline_fills,toxicity_fills,quotes_suppressed,baseline_adverse_pnl,toxicity_adverse_pnl,baseline_inv_var,toxicity_inv_var";

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn fill_rows(group: u32, n: usize, with_features: bool) -> String {
    let mut out = String::from(FILL_HEADER);
    if with_features {
        out.push_str(FEATURE_HEADER);
    }
    out.push('\n');
    for i in 0..n {
        let strategy = if i % 4 == 0 { "baseline" } else { "toxicity" };
        let time_ns = i as i64 * 90_000_000_000;
        out.push_str(&format!(
            "{group},{},SYM{},{strategy},{time_ns},100.0{},100,{},100.0,{:.2},1,{:.3}",
            i % 5,
            i % 5,
            i % 3,
            (i + 1) % 2,
            (i % 10) as f64 / 10.0,
            -((i % 7) as f64) * 0.25,
        ));
        if with_features {
            let v = i as f64;
            out.push_str(&format!(
                ",{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
                v * 0.01,
                (v * 0.3).sin(),
                (i % 4) as f64,
                0.5,
                (v * 0.7).cos(),
                v.sqrt(),
                -v * 0.02,
                (i % 9) as f64 * 0.1,
            ));
        }
        out.push('\n');
    }
    out
}

fn symbol_rows(group: u32, n: u32) -> String {
    let mut out = format!("{SYMBOL_HEADER}\n");
    for i in 0..n {
        let b = i as f64 - 3.0;
        let t = b + 2.0;
        let fills = if i == 0 { 0 } else { 4 };
        out.push_str(&format!(
            "{group},{i},SYM{i},{b},{t},{},{fills},{fills},3,-1.5,-0.5,10.0,8.0\n",
            t - b
        ));
    }
    out
}

#[test]
fn fills_are_read_from_all_group_files_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "fills_group_1.csv", &fill_rows(1, 8, false));
    write(dir.path(), "fills_group_0.csv", &fill_rows(0, 4, false));
    write(dir.path(), "notes.csv", "ignored\n");

    let fills = load_fills(dir.path()).unwrap();
    assert_eq!(fills.len(), 12);
    assert_eq!(fills[0].group, 0);
    assert_eq!(fills[4].group, 1);
    assert_eq!(fills[0].arm, Arm::Baseline);
    assert_eq!(fills[1].arm, Arm::Treatment);
    assert!(fills[0].is_buy);
    assert!(!fills[1].is_buy);
    assert!(fills.iter().all(|f| f.adverse_measured));
    assert!(fills.iter().all(|f| f.features.is_none()));
}

#[test]
fn feature_columns_populate_vectors() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "fills_group_0.csv", &fill_rows(0, 5, true));
    let fills = load_fills(dir.path()).unwrap();
    let fv = fills[2].features.unwrap();
    assert!((fv.cancel_ratio - 0.02).abs() < 1e-12);
    assert_eq!(fv.precision_ratio, 0.5);
}

#[test]
fn missing_measured_column_defaults_to_measured() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "fills_group_0.csv",
        "group,symbol,ticker,strategy,fill_time_ns,fill_price,fill_qty,is_buy,mid_price_at_fill,toxicity_at_fill,adverse_pnl\n\
         0,1,AAA,toxicity,1000,10.01,5,0,10.0,0.7,-0.2\n",
    );
    let fills = load_fills(dir.path()).unwrap();
    assert_eq!(fills.len(), 1);
    assert!(fills[0].adverse_measured);
    assert_eq!(fills[0].fill_time_ns, 1000);
}

#[test]
fn malformed_row_reports_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "fills_group_0.csv",
        &format!("{FILL_HEADER}\n0,1,AAA,toxicity,notatime,10.0,5,0,10.0,0.7,1,-0.2\n"),
    );
    match load_fills(dir.path()) {
        Err(LoadError::Csv { path, .. }) => assert!(path.ends_with("fills_group_0.csv")),
        other => panic!("expected CSV error, got {other:?}"),
    }
}

#[test]
fn symbols_map_toxicity_columns_to_treatment() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "symbols_group_0.csv", &symbol_rows(0, 3));
    let symbols = load_symbols(dir.path()).unwrap();
    assert_eq!(symbols.len(), 3);
    assert_eq!(symbols[1].treatment_pnl, 0.0);
    assert_eq!(symbols[1].baseline_pnl, -2.0);
    assert_eq!(symbols[1].treatment_inv_var, 8.0);
    assert!(!symbols[0].is_active());
    assert!(symbols[1].is_active());
}

#[test]
fn missing_directory_is_io_error() {
    let err = load_fills(Path::new("/nonexistent/toxlab/output")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn simulator_log_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.log");
    std::fs::write(
        &path,
        "Group 0: baseline_pnl=1.5, toxicity_pnl=2.5, baseline_adv=-1, toxicity_adv=-0.5, baseline_inv_var=10, toxicity_inv_var=8\n\
         Group 1: baseline_pnl=-0.5, toxicity_pnl=1.0, baseline_adv=-2, toxicity_adv=-1.0, baseline_inv_var=12, toxicity_inv_var=9\n\
         Quotes suppressed: 17\n",
    )
    .unwrap();
    let log = load_simulator_log(&path).unwrap();
    assert_eq!(log.groups.len(), 2);
    assert_eq!(log.groups[1].treatment_pnl, 1.0);
    assert_eq!(log.totals.quotes_suppressed, Some(17));
    assert_eq!(log.totals.baseline_total_pnl, None);
}

#[test]
fn full_directory_analysis() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "fills_group_0.csv", &fill_rows(0, 80, true));
    write(dir.path(), "symbols_group_0.csv", &symbol_rows(0, 8));
    write(dir.path(), "symbols_group_1.csv", &symbol_rows(1, 8));

    let mut config = AnalysisConfig::default();
    config.symbols.resamples = 500;
    let report = run_fill_analysis(dir.path(), &config).unwrap();

    assert_eq!(report.fills.n_fills, 80);
    let deciles = report.fills.toxicity_deciles.outcome().unwrap();
    assert_eq!(deciles.n_fills, 60);
    assert_eq!(deciles.n_baseline_fills, 20);
    assert_eq!(deciles.buckets.len(), 10);

    let ranking = report.fills.feature_ranking.outcome().unwrap();
    assert_eq!(ranking.features.len(), 8);
    assert!(ranking
        .features
        .windows(2)
        .all(|w| w[0].abs_rho >= w[1].abs_rho));

    let symbols = report.symbols.outcome().unwrap();
    assert_eq!(symbols.n_symbols, 14);
    assert_eq!(symbols.fraction_improved, 1.0);

    let text = report.render_text();
    assert!(text.contains("Toxicity deciles"));
    assert!(text.contains("Symbol bootstrap"));
}
