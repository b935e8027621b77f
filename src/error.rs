//! Configuration errors.

use thiserror::Error;

/// Error returned when an optimizer configuration is rejected.
///
/// Search itself never fails: budget exhaustion, overflow and memory
/// pressure are all absorbed. Only the parameter blocks are validated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A numeric parameter lies outside its legal range.
    #[error("{name} must be {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    /// Two parameters contradict each other.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),

    /// An optimizer name that names no optimizer.
    #[error("unknown optimization algorithm: {0}")]
    UnknownAlgorithm(String),
}

impl ConfigError {
    pub(crate) fn out_of_range(name: &'static str, expected: &'static str, value: f64) -> Self {
        ConfigError::OutOfRange {
            name,
            expected,
            value,
        }
    }
}
