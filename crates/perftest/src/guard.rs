//! Time budgets enforced per call

use crate::budget::{DurationBudget, ViolationPolicy};
use crate::callsite::CallSite;
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, PerfError, PerfResult};
use crate::report::{Violation, Warning};
use crate::sink::{OutputSink, StdoutSink};
use crate::timing::{callable_name, measure_call};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Options of a [`ShouldTake`] guard.
///
/// Exactly one of the three units and exactly one of `warn`/`throw` must
/// be set; this is checked by [`ShouldTake::new`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShouldTakeOptions {
    pub nanoseconds: Option<u64>,
    pub milliseconds: Option<u64>,
    pub seconds: Option<u64>,
    /// Name the call site in violation messages
    pub verbose: bool,
    /// Discard console output of the wrapped callable
    pub suppress_output: bool,
    /// Warn on violation and still return the result
    pub warn: bool,
    /// Fail the call on violation
    pub throw: bool,
}

impl ShouldTakeOptions {
    pub fn nanoseconds(nanoseconds: u64) -> Self {
        Self {
            nanoseconds: Some(nanoseconds),
            ..Self::default()
        }
    }

    pub fn milliseconds(milliseconds: u64) -> Self {
        Self {
            milliseconds: Some(milliseconds),
            ..Self::default()
        }
    }

    pub fn seconds(seconds: u64) -> Self {
        Self {
            seconds: Some(seconds),
            ..Self::default()
        }
    }

    /// Builder method to warn on violation.
    pub fn with_warn(mut self, warn: bool) -> Self {
        self.warn = warn;
        self
    }

    /// Builder method to fail on violation.
    pub fn with_throw(mut self, throw: bool) -> Self {
        self.throw = throw;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_suppress_output(mut self, suppress_output: bool) -> Self {
        self.suppress_output = suppress_output;
        self
    }
}

/// Checks every call against a time budget.
///
/// # Example
///
/// ```rust
/// use perftest::{PerfError, ShouldTake, ShouldTakeOptions};
/// use std::time::Duration;
///
/// let guard = ShouldTake::new(ShouldTakeOptions::milliseconds(5).with_throw(true)).unwrap();
/// let slow = guard.wrap(|()| std::thread::sleep(Duration::from_millis(20)));
///
/// let err = slow.call(()).unwrap_err();
/// assert!(matches!(err, PerfError::BudgetExceeded(_)));
/// ```
#[derive(Clone)]
pub struct ShouldTake {
    budget: DurationBudget,
    policy: ViolationPolicy,
    verbose: bool,
    suppress_output: bool,
    sink: Arc<dyn OutputSink>,
    clock: Arc<dyn Clock>,
}

impl ShouldTake {
    /// Validate the options and build the guard.
    pub fn new(options: ShouldTakeOptions) -> Result<Self, ConfigError> {
        let policy = ViolationPolicy::from_flags(options.warn, options.throw)?;
        let budget = DurationBudget::from_units(
            options.nanoseconds,
            options.milliseconds,
            options.seconds,
        )?;

        Ok(Self {
            budget,
            policy,
            verbose: options.verbose,
            suppress_output: options.suppress_output,
            sink: Arc::new(StdoutSink),
            clock: Arc::new(SystemClock),
        })
    }

    /// Builder method to set where warnings go.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builder method to set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn budget(&self) -> &DurationBudget {
        &self.budget
    }

    pub fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    /// Wrap a callable; every call through the wrapper is checked.
    pub fn wrap<F>(&self, func: F) -> Guarded<F> {
        Guarded {
            guard: self.clone(),
            name: callable_name::<F>(),
            func,
        }
    }

    /// Check a single call.
    #[track_caller]
    pub fn check<R>(&self, name: &str, f: impl FnOnce() -> R) -> PerfResult<R> {
        self.invoke(name, CallSite::caller(), f)
    }

    fn invoke<R>(&self, name: &str, site: CallSite, f: impl FnOnce() -> R) -> PerfResult<R> {
        let (result, elapsed_ns) = measure_call(self.clock.as_ref(), self.suppress_output, f);

        tracing::trace!(
            target: "perftest::guard",
            name,
            elapsed_ns,
            budget_ns = self.budget.as_nanos(),
            "call checked"
        );

        if !self.budget.is_exceeded_by(elapsed_ns) {
            return Ok(result);
        }

        let violation = if self.verbose {
            Violation::verbose(name, &site, elapsed_ns, &self.budget)
        } else {
            Violation::simple(name, elapsed_ns, &self.budget)
        };

        tracing::warn!(
            target: "perftest::guard",
            name,
            elapsed_ns,
            budget_ns = self.budget.as_nanos(),
            policy = ?self.policy,
            "budget exceeded"
        );

        match self.policy {
            ViolationPolicy::Warn => {
                self.sink.warn(&Warning { site, violation });
                Ok(result)
            }
            ViolationPolicy::Throw => Err(PerfError::BudgetExceeded(violation)),
        }
    }
}

impl fmt::Debug for ShouldTake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldTake")
            .field("budget", &self.budget)
            .field("policy", &self.policy)
            .field("verbose", &self.verbose)
            .field("suppress_output", &self.suppress_output)
            .finish_non_exhaustive()
    }
}

/// A callable wrapped by [`ShouldTake::wrap`].
#[derive(Clone)]
pub struct Guarded<F> {
    guard: ShouldTake,
    name: String,
    func: F,
}

impl<F> Guarded<F> {
    /// Override the name used in messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the wrapped callable and check its duration.
    ///
    /// Under the throw policy an over-budget call returns
    /// [`PerfError::BudgetExceeded`] and its result is dropped. Warnings
    /// are attributed to the caller of this method.
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> PerfResult<R>
    where
        F: Fn(A) -> R,
    {
        self.call_at(CallSite::caller(), args)
    }

    /// Like [`call`](Self::call) with an explicit call site.
    pub fn call_at<A, R>(&self, site: CallSite, args: A) -> PerfResult<R>
    where
        F: Fn(A) -> R,
    {
        self.guard.invoke(&self.name, site, || (self.func)(args))
    }
}
