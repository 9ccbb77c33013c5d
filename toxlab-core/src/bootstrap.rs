//! Seeded bootstrap resampling over aligned sequences.
//!
//! Each iteration draws `n` indices uniformly with replacement from `[0, n)`,
//! gathers every input column at those indices, and applies the statistic.
//! The resulting distribution is sorted once and never mutated afterwards.
//!
//! Sequential runs seed one `StdRng` per call. Parallel runs derive one RNG
//! per iteration from the master seed (see [`SeedHierarchy`]), so their
//! output is independent of thread count but differs from the sequential
//! stream for the same seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StatsError;
use crate::rng::SeedHierarchy;
use crate::verdict::ConfidenceInterval;

/// A statistic evaluated on one resample. Columns arrive in input order.
pub type StatisticFn<'a> = dyn Fn(&[Vec<f64>]) -> f64 + Sync + 'a;

const PARALLEL_STREAM: &str = "bootstrap";

/// Number of resamples and the seed that makes them reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub resamples: usize,
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 10_000,
            seed: 0,
        }
    }
}

impl BootstrapConfig {
    pub fn new(resamples: usize, seed: u64) -> Self {
        Self { resamples, seed }
    }
}

// ─── Distribution ────────────────────────────────────────────────────

/// Sorted statistic values from `B` resamples.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapDistribution {
    values: Vec<f64>,
}

impl BootstrapDistribution {
    /// Sorts ascending with `total_cmp`; NaN draws sort last.
    pub fn from_draws(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn at_fraction(&self, fraction: f64) -> f64 {
        let b = self.values.len();
        if b == 0 {
            return f64::NAN;
        }
        let idx = ((fraction * b as f64).floor() as usize).min(b - 1);
        self.values[idx]
    }

    /// Simple percentile interval at `level` (e.g. 0.95): values at ranks
    /// `floor(α/2·B)` and `floor((1−α/2)·B)`.
    pub fn percentile_ci(&self, level: f64) -> ConfidenceInterval {
        let tail = (1.0 - level) / 2.0;
        ConfidenceInterval::new(self.at_fraction(tail), self.at_fraction(1.0 - tail))
    }

    pub fn ci_95(&self) -> ConfidenceInterval {
        ConfidenceInterval::new(self.at_fraction(0.025), self.at_fraction(0.975))
    }

    pub fn median(&self) -> f64 {
        self.at_fraction(0.5)
    }

    /// One-sided p-value for "statistic > 0": fraction of draws ≤ 0.
    pub fn p_value_le_zero(&self) -> f64 {
        self.fraction_where(|v| v <= 0.0)
    }

    /// One-sided p-value for "statistic < 0": fraction of draws ≥ 0.
    pub fn p_value_ge_zero(&self) -> f64 {
        self.fraction_where(|v| v >= 0.0)
    }

    pub fn two_sided_p_value(&self) -> f64 {
        (2.0 * self.p_value_le_zero().min(self.p_value_ge_zero())).min(1.0)
    }

    fn fraction_where(&self, pred: impl Fn(f64) -> bool) -> f64 {
        if self.values.is_empty() {
            return 1.0;
        }
        let hits = self.values.iter().filter(|&&v| pred(v)).count();
        hits as f64 / self.values.len() as f64
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Common length of the aligned inputs.
fn aligned_len(samples: &[&[f64]]) -> Result<usize, StatsError> {
    let first = samples.first().ok_or(StatsError::Empty)?;
    let n = first.len();
    for s in &samples[1..] {
        if s.len() != n {
            return Err(StatsError::Misaligned {
                left: n,
                right: s.len(),
            });
        }
    }
    if n == 0 {
        return Err(StatsError::Empty);
    }
    Ok(n)
}

fn check_resamples(resamples: usize) -> Result<(), StatsError> {
    if resamples == 0 {
        return Err(StatsError::InvalidParameter(
            "bootstrap needs at least one resample".into(),
        ));
    }
    Ok(())
}

/// Fill `buffers` with the columns of `samples` at fresh random indices.
fn draw_into<R: Rng + ?Sized>(samples: &[&[f64]], n: usize, rng: &mut R, buffers: &mut [Vec<f64>]) {
    for buf in buffers.iter_mut() {
        buf.clear();
    }
    for _ in 0..n {
        let idx = rng.gen_range(0..n);
        for (buf, column) in buffers.iter_mut().zip(samples) {
            buf.push(column[idx]);
        }
    }
}

/// Bootstrap one statistic with an RNG seeded from `config.seed`.
pub fn bootstrap<F>(
    samples: &[&[f64]],
    statistic: F,
    config: BootstrapConfig,
) -> Result<BootstrapDistribution, StatsError>
where
    F: Fn(&[Vec<f64>]) -> f64 + Sync,
{
    let mut rng = StdRng::seed_from_u64(config.seed);
    bootstrap_with_rng(samples, &statistic, config.resamples, &mut rng)
}

/// Bootstrap one statistic, consuming draws from a caller-owned RNG.
pub fn bootstrap_with_rng<R: Rng + ?Sized>(
    samples: &[&[f64]],
    statistic: &StatisticFn<'_>,
    resamples: usize,
    rng: &mut R,
) -> Result<BootstrapDistribution, StatsError> {
    let mut out = bootstrap_many_with_rng(samples, &[statistic], resamples, rng)?;
    out.pop().ok_or(StatsError::Empty)
}

/// Evaluate several statistics on the same drawn indices.
///
/// Returns one distribution per statistic, in order.
pub fn bootstrap_many(
    samples: &[&[f64]],
    statistics: &[&StatisticFn<'_>],
    config: BootstrapConfig,
) -> Result<Vec<BootstrapDistribution>, StatsError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    bootstrap_many_with_rng(samples, statistics, config.resamples, &mut rng)
}

pub fn bootstrap_many_with_rng<R: Rng + ?Sized>(
    samples: &[&[f64]],
    statistics: &[&StatisticFn<'_>],
    resamples: usize,
    rng: &mut R,
) -> Result<Vec<BootstrapDistribution>, StatsError> {
    let n = aligned_len(samples)?;
    check_resamples(resamples)?;

    let mut buffers: Vec<Vec<f64>> = samples.iter().map(|_| Vec::with_capacity(n)).collect();
    let mut draws: Vec<Vec<f64>> = statistics
        .iter()
        .map(|_| Vec::with_capacity(resamples))
        .collect();

    for _ in 0..resamples {
        draw_into(samples, n, rng, &mut buffers);
        for (stat, out) in statistics.iter().zip(draws.iter_mut()) {
            out.push(stat(&buffers));
        }
    }

    debug!(n, resamples, statistics = statistics.len(), "bootstrap complete");
    Ok(draws.into_iter().map(BootstrapDistribution::from_draws).collect())
}

/// Parallel [`bootstrap`]. Iteration `i` uses a sub-seed of `config.seed`.
pub fn par_bootstrap<F>(
    samples: &[&[f64]],
    statistic: F,
    config: BootstrapConfig,
) -> Result<BootstrapDistribution, StatsError>
where
    F: Fn(&[Vec<f64>]) -> f64 + Sync,
{
    let mut out = par_bootstrap_many(samples, &[&statistic], config)?;
    out.pop().ok_or(StatsError::Empty)
}

/// Parallel [`bootstrap_many`].
pub fn par_bootstrap_many(
    samples: &[&[f64]],
    statistics: &[&StatisticFn<'_>],
    config: BootstrapConfig,
) -> Result<Vec<BootstrapDistribution>, StatsError> {
    let n = aligned_len(samples)?;
    check_resamples(config.resamples)?;
    let seeds = SeedHierarchy::new(config.seed);

    let per_iteration: Vec<Vec<f64>> = (0..config.resamples)
        .into_par_iter()
        .map(|i| {
            let mut rng = seeds.rng_for(PARALLEL_STREAM, i as u64);
            let mut buffers: Vec<Vec<f64>> =
                samples.iter().map(|_| Vec::with_capacity(n)).collect();
            draw_into(samples, n, &mut rng, &mut buffers);
            statistics.iter().map(|stat| stat(&buffers)).collect()
        })
        .collect();

    let mut draws: Vec<Vec<f64>> = statistics
        .iter()
        .map(|_| Vec::with_capacity(config.resamples))
        .collect();
    for row in per_iteration {
        for (out, value) in draws.iter_mut().zip(row) {
            out.push(value);
        }
    }

    debug!(
        n,
        resamples = config.resamples,
        statistics = statistics.len(),
        "parallel bootstrap complete"
    );
    Ok(draws.into_iter().map(BootstrapDistribution::from_draws).collect())
}

// ─── Statistics ──────────────────────────────────────────────────────

/// Ready-made statistics addressing input columns by position.
///
/// A missing column yields NaN rather than panicking.
pub mod statistics {
    use crate::descriptive;

    fn column(columns: &[Vec<f64>], idx: usize) -> Option<&[f64]> {
        columns.get(idx).map(Vec::as_slice)
    }

    pub fn mean(col: usize) -> impl Fn(&[Vec<f64>]) -> f64 + Sync + Send {
        move |cols| column(cols, col).map_or(f64::NAN, descriptive::mean)
    }

    pub fn sum(col: usize) -> impl Fn(&[Vec<f64>]) -> f64 + Sync + Send {
        move |cols| column(cols, col).map_or(f64::NAN, |v| v.iter().sum())
    }

    /// Fraction of values strictly above `threshold`; 0 for an empty column.
    pub fn fraction_above(col: usize, threshold: f64) -> impl Fn(&[Vec<f64>]) -> f64 + Sync + Send {
        move |cols| {
            column(cols, col).map_or(f64::NAN, |v| {
                if v.is_empty() {
                    0.0
                } else {
                    v.iter().filter(|&&x| x > threshold).count() as f64 / v.len() as f64
                }
            })
        }
    }

    /// Mean of the per-unit difference `treatment − baseline`.
    pub fn mean_difference(treatment: usize, baseline: usize) -> impl Fn(&[Vec<f64>]) -> f64 + Sync + Send {
        move |cols| match (column(cols, treatment), column(cols, baseline)) {
            (Some(t), Some(b)) => descriptive::mean(&descriptive::differences(t, b)),
            _ => f64::NAN,
        }
    }

    /// `Sharpe(treatment) − Sharpe(baseline)` with zero-dispersion sentinels.
    pub fn sharpe_difference(treatment: usize, baseline: usize) -> impl Fn(&[Vec<f64>]) -> f64 + Sync + Send {
        move |cols| match (column(cols, treatment), column(cols, baseline)) {
            (Some(t), Some(b)) => descriptive::sharpe_difference(t, b),
            _ => f64::NAN,
        }
    }
}
