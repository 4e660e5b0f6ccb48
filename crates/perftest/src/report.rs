//! Report, warning and violation messages

use crate::budget::DurationBudget;
use crate::callsite::CallSite;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit a measured duration is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Floating point seconds, e.g. `0.0125 secs`
    #[default]
    Seconds,
    /// Integer nanoseconds, e.g. `12500000ns`
    Nanoseconds,
}

impl TimeUnit {
    /// Render a nanosecond count in this unit.
    pub fn format(self, elapsed_ns: u64) -> String {
        match self {
            TimeUnit::Seconds => format!("{} secs", elapsed_ns as f64 / 1_000_000_000.0),
            TimeUnit::Nanoseconds => format!("{}ns", elapsed_ns),
        }
    }
}

/// The first lines of every verbose message.
fn verbose_header(site: &CallSite) -> String {
    format!(
        "perftest:\n\t{}\n\t\ton line {}\n\t\tin file {}",
        site.quoted(),
        site.line(),
        site.file()
    )
}

/// `perftest: {name} took {duration}`
pub fn duration_report(name: &str, elapsed_ns: u64, unit: TimeUnit) -> String {
    format!("perftest: {} took {}", name, unit.format(elapsed_ns))
}

/// Multi-line duration report naming the call site.
pub fn verbose_duration_report(site: &CallSite, elapsed_ns: u64, unit: TimeUnit) -> String {
    format!("{}\n\ttook {}", verbose_header(site), unit.format(elapsed_ns))
}

/// Multi-line report for a call abandoned at its deadline.
pub fn verbose_timeout_report(site: &CallSite, budget: &DurationBudget) -> String {
    format!(
        "{}\n\ttimed out after {} secs",
        verbose_header(site),
        budget.as_secs_f64()
    )
}

/// A call that ran over its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Name of the wrapped callable
    pub name: String,
    /// Measured duration in nanoseconds
    pub elapsed_ns: u64,
    /// Budget in nanoseconds
    pub budget_ns: u64,
    /// Human-readable message, simple or verbose
    pub message: String,
}

impl Violation {
    /// Violation with the one-line message.
    pub fn simple(name: impl Into<String>, elapsed_ns: u64, budget: &DurationBudget) -> Self {
        let name = name.into();
        let message = format!("perftest: {} took more than the expected time!", name);
        Self {
            name,
            elapsed_ns,
            budget_ns: budget.as_nanos(),
            message,
        }
    }

    /// Violation with the multi-line message naming the call site.
    pub fn verbose(
        name: impl Into<String>,
        site: &CallSite,
        elapsed_ns: u64,
        budget: &DurationBudget,
    ) -> Self {
        let message = format!(
            "{}\n\ttook more than the expected time!\n\t\treal: {}ns\n\t\texpected: {}ns",
            verbose_header(site),
            elapsed_ns,
            budget.as_nanos()
        );
        Self {
            name: name.into(),
            elapsed_ns,
            budget_ns: budget.as_nanos(),
            message,
        }
    }

    /// How far over budget the call went, in nanoseconds.
    pub fn excess_ns(&self) -> u64 {
        self.elapsed_ns.saturating_sub(self.budget_ns)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A non-fatal budget warning, attributed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Location of the call that ran over budget
    pub site: CallSite,
    /// The violation being warned about
    pub violation: Violation,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: RuntimeWarning: {}",
            self.site.file(),
            self.site.line(),
            self.violation
        )
    }
}
