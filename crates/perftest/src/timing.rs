//! Duration measurement and reporting

use crate::callsite::CallSite;
use crate::clock::{Clock, SystemClock};
use crate::report::{duration_report, verbose_duration_report, TimeUnit};
use crate::sink::{suppress_console, OutputSink, StdoutSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Options of a [`Perf`] wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerfOptions {
    /// Unit durations are reported in
    pub unit: TimeUnit,
    /// Report the call site instead of the callable's name
    pub verbose: bool,
    /// Discard console output of the wrapped callable
    pub suppress_output: bool,
}

impl PerfOptions {
    /// Builder method to set the report unit.
    pub fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Builder method to enable call-site reports.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builder method to discard the callable's console output.
    pub fn with_suppress_output(mut self, suppress_output: bool) -> Self {
        self.suppress_output = suppress_output;
        self
    }
}

/// Run `f` once, bracketed by two clock readings.
///
/// The console is suppressed for exactly the duration of the call when
/// asked to; the redirect guard restores it even if `f` panics.
pub(crate) fn measure_call<R>(
    clock: &dyn Clock,
    suppress_output: bool,
    f: impl FnOnce() -> R,
) -> (R, u64) {
    let _quiet = suppress_output.then(suppress_console);
    let start = clock.now_ns();
    let result = f();
    let elapsed_ns = clock.now_ns().saturating_sub(start);
    (result, elapsed_ns)
}

/// Best-effort name of a callable, from its type name.
///
/// `my_crate::parse` gives `parse`; a closure gives the name of the
/// function it was written in.
pub(crate) fn callable_name<F: ?Sized>() -> String {
    let full = std::any::type_name::<F>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::")
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .unwrap_or(full)
        .to_string()
}

/// Measures and reports how long each call takes.
///
/// # Example
///
/// ```rust
/// use perftest::{MemorySink, Perf};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let square = Perf::nanos()
///     .with_sink(sink.clone())
///     .wrap(|x: u64| x * x)
///     .named("square");
///
/// assert_eq!(square.call(12), 144);
/// assert!(sink.lines()[0].starts_with("perftest: square took "));
/// ```
#[derive(Clone)]
pub struct Perf {
    options: PerfOptions,
    sink: Arc<dyn OutputSink>,
    clock: Arc<dyn Clock>,
}

impl Perf {
    /// Create a wrapper reporting to standard output.
    pub fn new(options: PerfOptions) -> Self {
        Self {
            options,
            sink: Arc::new(StdoutSink),
            clock: Arc::new(SystemClock),
        }
    }

    /// Report durations in floating point seconds.
    pub fn secs() -> Self {
        Self::new(PerfOptions::default().with_unit(TimeUnit::Seconds))
    }

    /// Report durations in integer nanoseconds.
    pub fn nanos() -> Self {
        Self::new(PerfOptions::default().with_unit(TimeUnit::Nanoseconds))
    }

    /// Builder method to enable call-site reports.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    /// Builder method to discard the callable's console output.
    pub fn with_suppress_output(mut self, suppress_output: bool) -> Self {
        self.options.suppress_output = suppress_output;
        self
    }

    /// Builder method to set where reports go.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builder method to set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &PerfOptions {
        &self.options
    }

    /// Wrap a callable; every call through the wrapper is measured.
    pub fn wrap<F>(&self, func: F) -> Timed<F> {
        Timed {
            perf: self.clone(),
            name: callable_name::<F>(),
            func,
        }
    }

    /// Measure a single call.
    #[track_caller]
    pub fn measure<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        self.invoke(name, CallSite::caller(), f)
    }

    fn invoke<R>(&self, name: &str, site: CallSite, f: impl FnOnce() -> R) -> R {
        let (result, elapsed_ns) =
            measure_call(self.clock.as_ref(), self.options.suppress_output, f);

        tracing::trace!(
            target: "perftest::timing",
            name,
            elapsed_ns,
            "call measured"
        );

        let report = if self.options.verbose {
            verbose_duration_report(&site, elapsed_ns, self.options.unit)
        } else {
            duration_report(name, elapsed_ns, self.options.unit)
        };
        self.sink.write_line(&report);

        result
    }
}

impl fmt::Debug for Perf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Perf")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A callable wrapped by [`Perf::wrap`].
#[derive(Clone)]
pub struct Timed<F> {
    perf: Perf,
    name: String,
    func: F,
}

impl<F> Timed<F> {
    /// Override the name used in reports.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the wrapped callable and report how long it took.
    ///
    /// The result is returned unchanged; a panic propagates unreported.
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        self.call_at(CallSite::caller(), args)
    }

    /// Like [`call`](Self::call) with an explicit call site.
    pub fn call_at<A, R>(&self, site: CallSite, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        self.perf.invoke(&self.name, site, || (self.func)(args))
    }
}
