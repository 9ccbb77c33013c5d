//! Contract violations raised by the inference primitives.
//!
//! Only caller mistakes are errors. Too few observations and zero-variance
//! denominators are ordinary outcomes and are reported through
//! [`TestResult`](crate::verdict::TestResult) and sentinel values instead.

use thiserror::Error;

/// Errors from the inference engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// Paired sequences of unequal length. Indicates upstream data corruption.
    #[error("misaligned input: paired sequences have lengths {left} and {right}")]
    Misaligned { left: usize, right: usize },
    /// A sequence that must hold at least one value is empty.
    #[error("empty input: at least one observation is required")]
    Empty,
    /// A parameter outside its valid domain (e.g. zero resamples, zero bin width).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Check that two paired sequences have equal length.
pub fn ensure_aligned(left: &[f64], right: &[f64]) -> Result<(), StatsError> {
    if left.len() != right.len() {
        return Err(StatsError::Misaligned {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(())
}
