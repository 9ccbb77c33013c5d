//! Property tests for the hypothesis suite and the log parser.

use proptest::prelude::*;
use toxlab_runner::{parse_simulator_log, AnalysisConfig, HypothesisInput, HypothesisSuite};

fn suite() -> HypothesisSuite {
    let mut config = AnalysisConfig::default();
    config.hypotheses.bootstrap_resamples = 50;
    HypothesisSuite::new(&config)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every test is either testable with an outcome or untestable with a reason.
    #[test]
    fn every_entry_is_decided(
        pairs in prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 1..30),
    ) {
        let (baseline, treatment): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let input = HypothesisInput::from_columns(baseline, treatment).unwrap();
        let results = suite().run(&input).unwrap();
        for (name, testable, reason) in results.testability() {
            prop_assert_eq!(testable, reason.is_none(), "{}", name);
        }
        let cross = results.cross_sectional_robustness.outcome().unwrap();
        prop_assert!((0.0..=1.0).contains(&cross.p_value));
        prop_assert!(cross.successes <= cross.n);
    }

    /// Detailed lines round-trip their PnL values.
    #[test]
    fn detailed_lines_parse_back(
        rows in prop::collection::vec((-1e4f64..1e4, -1e4f64..1e4), 1..20),
    ) {
        let text: String = rows
            .iter()
            .enumerate()
            .map(|(i, (b, t))| format!(
                "Group {i}: baseline_pnl={b}, toxicity_pnl={t}, baseline_adv=-1, toxicity_adv=-1, baseline_inv_var=1, toxicity_inv_var=1\n"
            ))
            .collect();
        let log = parse_simulator_log(&text).unwrap();
        prop_assert_eq!(log.groups.len(), rows.len());
        for (g, (b, t)) in log.groups.iter().zip(&rows) {
            prop_assert_eq!(g.baseline_pnl, *b);
            prop_assert_eq!(g.treatment_pnl, *t);
        }
    }
}
