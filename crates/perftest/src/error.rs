//! Error types for the timing wrappers.

use crate::report::Violation;
use thiserror::Error;

/// Invalid wrapper configuration.
///
/// Returned when a wrapper is built, never when it is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Both or neither of `warn` and `throw` were selected
    #[error("Either `warn` or `throw` should be set; both cannot be set, at least one must be set")]
    PolicyNotExclusive,

    /// Zero, or more than one, of the budget units was given
    #[error("Either `nanoseconds`, `milliseconds`, or `seconds` should be set; all three cannot be set, at least one must be set")]
    UnitNotExclusive,

    /// The budget does not fit in a 64-bit nanosecond count
    #[error("Budget of {value} {unit} overflows the nanosecond range")]
    BudgetOverflow {
        /// Value as given by the caller
        value: u64,
        /// Unit the value was given in
        unit: &'static str,
    },
}

/// Errors surfaced by the timing wrappers.
#[derive(Debug, Error)]
pub enum PerfError {
    /// The wrapper was misconfigured
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A call exceeded its budget under the throw policy
    #[error("{0}")]
    BudgetExceeded(Violation),

    /// The background worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl PerfError {
    /// The violation carried by a `BudgetExceeded` error.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            PerfError::BudgetExceeded(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Result type for wrapper operations.
pub type PerfResult<T> = Result<T, PerfError>;
