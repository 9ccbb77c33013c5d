//! ToxLab Core: inference engine for two-arm strategy comparisons.
//!
//! This crate holds the statistics behind every baseline-vs-treatment verdict:
//! - Midrank ranking and Spearman correlation with a normal-approximation test
//! - Newey-West (Bartlett) standard errors and fixed-width time binning
//! - Seeded bootstrap resampling, sequential or parallel
//! - Paired one-sided tests and exact binomial win-fraction tests
//! - Benjamini-Hochberg correction for feature rankings
//!
//! Everything here is a pure function over slices. Too little data yields a
//! [`TestResult`] marked untestable; only misaligned or invalid input is an
//! error.

pub mod bootstrap;
pub mod descriptive;
pub mod error;
pub mod fdr;
pub mod hac;
pub mod paired;
pub mod rank;
pub mod rng;
pub mod serde_float;
pub mod special;
pub mod verdict;

pub use bootstrap::{
    bootstrap, bootstrap_many, bootstrap_with_rng, par_bootstrap, par_bootstrap_many,
    statistics, BootstrapConfig, BootstrapDistribution, StatisticFn,
};
pub use error::StatsError;
pub use fdr::{benjamini_hochberg, FdrAdjusted};
pub use hac::{
    bin_by_time, default_max_lag, newey_west, newey_west_binned, BinnedHacEstimate, HacEstimate,
    TimeBin, TimedValue,
};
pub use paired::{paired_less, win_fraction_test, PairedComparison, PassRule, WinFraction};
pub use rank::{rank, rank_features, spearman, spearman_with_alpha, FeatureCorrelation, SpearmanResult};
pub use rng::SeedHierarchy;
pub use verdict::{ConfidenceInterval, PValueMethod, TestResult};
