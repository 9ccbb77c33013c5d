//! Structured outcomes shared by every test.

use serde::{Deserialize, Serialize};

/// How a p-value was obtained.
///
/// Reported alongside every p-value so that normal approximations are never
/// mistaken for exact inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    /// Standard normal CDF applied to a t-like statistic. Approximate.
    NormalApproximation,
    /// Exact binomial tail probability.
    ExactBinomial,
    /// Empirical fraction of bootstrap draws.
    Bootstrap,
}

impl PValueMethod {
    pub fn is_approximation(self) -> bool {
        matches!(self, PValueMethod::NormalApproximation | PValueMethod::Bootstrap)
    }
}

/// A closed interval `[lower, upper]`. Bounds may be infinite sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    #[serde(with = "crate::serde_float")]
    pub lower: f64,
    #[serde(with = "crate::serde_float")]
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Symmetric normal interval `center ± z·se`.
    pub fn symmetric(center: f64, z: f64, se: f64) -> Self {
        Self {
            lower: center - z * se,
            upper: center + z * se,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Outcome of a single test: either an estimate or the reason none was possible.
///
/// Serializes as `{"testable": true, ...estimate fields}` or
/// `{"testable": false, "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct TestResult<T> {
    pub testable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<T>,
}

impl<T> TestResult<T> {
    pub fn tested(outcome: T) -> Self {
        Self {
            testable: true,
            reason: None,
            outcome: Some(outcome),
        }
    }

    pub fn untestable(reason: impl Into<String>) -> Self {
        Self {
            testable: false,
            reason: Some(reason.into()),
            outcome: None,
        }
    }

    pub fn is_testable(&self) -> bool {
        self.testable
    }

    pub fn outcome(&self) -> Option<&T> {
        self.outcome.as_ref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TestResult<U> {
        TestResult {
            testable: self.testable,
            reason: self.reason,
            outcome: self.outcome.map(f),
        }
    }
}

/// Reason string for a sample below its minimum size.
pub fn insufficient(what: &str, have: usize, need: usize) -> String {
    format!("insufficient data: {have} {what} < minimum {need}")
}
