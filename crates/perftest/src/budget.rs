//! Duration budgets and violation policies

use crate::error::ConfigError;
use std::time::Duration;

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A single time limit, normalized to nanoseconds.
///
/// Callers give it in exactly one of nanoseconds, milliseconds or seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DurationBudget {
    nanos: u64,
}

impl DurationBudget {
    /// Build a budget from the three optional unit inputs.
    ///
    /// Exactly one must be present and non-zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use perftest::DurationBudget;
    ///
    /// let budget = DurationBudget::from_units(None, Some(50), None).unwrap();
    /// assert_eq!(budget.as_nanos(), 50_000_000);
    ///
    /// assert!(DurationBudget::from_units(Some(1), Some(1), None).is_err());
    /// ```
    pub fn from_units(
        nanoseconds: Option<u64>,
        milliseconds: Option<u64>,
        seconds: Option<u64>,
    ) -> Result<Self, ConfigError> {
        match (nanoseconds, milliseconds, seconds) {
            (Some(ns), None, None) if ns > 0 => Ok(Self { nanos: ns }),
            (None, Some(ms), None) if ms > 0 => Self::scaled(ms, NANOS_PER_MILLI, "milliseconds"),
            (None, None, Some(s)) if s > 0 => Self::scaled(s, NANOS_PER_SEC, "seconds"),
            _ => Err(ConfigError::UnitNotExclusive),
        }
    }

    fn scaled(value: u64, factor: u64, unit: &'static str) -> Result<Self, ConfigError> {
        value
            .checked_mul(factor)
            .map(|nanos| Self { nanos })
            .ok_or(ConfigError::BudgetOverflow { value, unit })
    }

    /// Budget from a positive nanosecond count.
    pub fn from_nanos(nanoseconds: u64) -> Result<Self, ConfigError> {
        Self::from_units(Some(nanoseconds), None, None)
    }

    /// Budget from a positive millisecond count.
    ///
    /// This is a true millisecond, 1,000,000 nanoseconds. Earlier perftest
    /// releases multiplied milliseconds by 1,000, which made a 50 ms budget
    /// 50 µs; a budget carried over from them is 1,000 times looser here.
    pub fn from_millis(milliseconds: u64) -> Result<Self, ConfigError> {
        Self::from_units(None, Some(milliseconds), None)
    }

    /// Budget from a positive second count.
    pub fn from_secs(seconds: u64) -> Result<Self, ConfigError> {
        Self::from_units(None, None, Some(seconds))
    }

    /// The budget in nanoseconds.
    #[inline]
    pub fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// The budget in (fractional) seconds.
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.nanos as f64 / NANOS_PER_SEC as f64
    }

    /// The budget as a [`Duration`].
    #[inline]
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.nanos)
    }

    /// Whether a measured duration breaks the budget.
    ///
    /// Strictly greater: a call taking exactly the budget is fine.
    #[inline]
    pub fn is_exceeded_by(&self, elapsed_ns: u64) -> bool {
        elapsed_ns > self.nanos
    }
}

/// What to do when a call runs over its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationPolicy {
    /// Emit a warning and still return the result
    Warn,
    /// Fail the call, discarding the result
    Throw,
}

impl ViolationPolicy {
    /// Resolve the `warn`/`throw` flag pair; exactly one must be set.
    pub fn from_flags(warn: bool, throw: bool) -> Result<Self, ConfigError> {
        match (warn, throw) {
            (true, false) => Ok(Self::Warn),
            (false, true) => Ok(Self::Throw),
            _ => Err(ConfigError::PolicyNotExclusive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unit_normalization() {
        assert_eq!(DurationBudget::from_nanos(1500).unwrap().as_nanos(), 1500);
        assert_eq!(DurationBudget::from_millis(50).unwrap().as_nanos(), 50_000_000);
        assert_eq!(DurationBudget::from_secs(2).unwrap().as_nanos(), 2_000_000_000);
    }

    #[test]
    fn test_unit_exclusivity() {
        assert_eq!(
            DurationBudget::from_units(None, None, None),
            Err(ConfigError::UnitNotExclusive)
        );
        assert_eq!(
            DurationBudget::from_units(Some(1), None, Some(1)),
            Err(ConfigError::UnitNotExclusive)
        );
        assert_eq!(
            DurationBudget::from_units(Some(1), Some(2), Some(3)),
            Err(ConfigError::UnitNotExclusive)
        );
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert_eq!(DurationBudget::from_millis(0), Err(ConfigError::UnitNotExclusive));
        assert_eq!(DurationBudget::from_nanos(0), Err(ConfigError::UnitNotExclusive));
    }

    #[test]
    fn test_overflow_rejected() {
        assert_eq!(
            DurationBudget::from_secs(u64::MAX),
            Err(ConfigError::BudgetOverflow {
                value: u64::MAX,
                unit: "seconds"
            })
        );
    }

    #[test]
    fn test_strict_comparison() {
        let budget = DurationBudget::from_millis(50).unwrap();
        assert!(!budget.is_exceeded_by(50_000_000));
        assert!(budget.is_exceeded_by(50_000_001));
    }

    #[test]
    fn test_seconds_conversion() {
        let budget = DurationBudget::from_millis(250).unwrap();
        assert_eq!(budget.as_secs_f64(), 0.25);
        assert_eq!(budget.as_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_policy_flags() {
        assert_eq!(ViolationPolicy::from_flags(true, false), Ok(ViolationPolicy::Warn));
        assert_eq!(ViolationPolicy::from_flags(false, true), Ok(ViolationPolicy::Throw));
        assert_eq!(
            ViolationPolicy::from_flags(true, true),
            Err(ConfigError::PolicyNotExclusive)
        );
        assert_eq!(
            ViolationPolicy::from_flags(false, false),
            Err(ConfigError::PolicyNotExclusive)
        );
    }

    proptest! {
        #[test]
        fn prop_millis_match_std_duration(ms in 1u64..=1_000_000_000) {
            let budget = DurationBudget::from_millis(ms).unwrap();
            prop_assert_eq!(budget.as_duration(), Duration::from_millis(ms));
        }

        #[test]
        fn prop_two_units_always_rejected(a in 1u64..1_000, b in 1u64..1_000) {
            prop_assert!(DurationBudget::from_units(Some(a), Some(b), None).is_err());
            prop_assert!(DurationBudget::from_units(None, Some(a), Some(b)).is_err());
        }
    }
}
