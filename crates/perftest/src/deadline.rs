//! Soft deadlines: race a call against a timeout
//!
//! The call runs on its own worker. If the deadline passes first the caller
//! gets `None` back straight away and the worker is left to finish on its
//! own: it is never stopped, signalled or joined, and whatever it produces
//! afterwards is discarded. Anything the worker holds (locks, handles) stays
//! held until it finishes or the process exits.

use crate::budget::DurationBudget;
use crate::callsite::CallSite;
use crate::error::{ConfigError, PerfResult};
use crate::report::verbose_timeout_report;
use crate::sink::{current_console, redirect_console, with_task_console, NullSink, OutputSink, StdoutSink};
use crate::timing::callable_name;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, SendError};
use std::sync::Arc;
use std::thread;

/// Options of a [`Timeout`] wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutOptions {
    pub nanoseconds: Option<u64>,
    pub milliseconds: Option<u64>,
    pub seconds: Option<u64>,
    /// Report the call site when a call is abandoned
    pub verbose: bool,
    /// Discard console output of the wrapped callable
    pub suppress_output: bool,
}

impl TimeoutOptions {
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

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_suppress_output(mut self, suppress_output: bool) -> Self {
        self.suppress_output = suppress_output;
        self
    }
}

/// Returns a call's result if it finishes within the deadline, `None`
/// otherwise.
///
/// # Example
///
/// ```rust
/// use perftest::{Timeout, TimeoutOptions};
/// use std::time::Duration;
///
/// let timeout = Timeout::new(TimeoutOptions::milliseconds(100)).unwrap();
///
/// let quick = timeout.wrap(|x: u32| x * 2);
/// assert_eq!(quick.call(21).unwrap(), Some(42));
///
/// let stuck = timeout.wrap(|()| std::thread::sleep(Duration::from_secs(1)));
/// assert_eq!(stuck.call(()).unwrap(), None);
/// ```
#[derive(Clone)]
pub struct Timeout {
    budget: DurationBudget,
    verbose: bool,
    suppress_output: bool,
    sink: Arc<dyn OutputSink>,
}

impl Timeout {
    /// Validate the options and build the wrapper.
    pub fn new(options: TimeoutOptions) -> Result<Self, ConfigError> {
        let budget = DurationBudget::from_units(
            options.nanoseconds,
            options.milliseconds,
            options.seconds,
        )?;

        Ok(Self {
            budget,
            verbose: options.verbose,
            suppress_output: options.suppress_output,
            sink: Arc::new(StdoutSink),
        })
    }

    /// Builder method to set where verbose reports go.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn budget(&self) -> &DurationBudget {
        &self.budget
    }

    /// Wrap a callable to run on a worker thread per call.
    pub fn wrap<F>(&self, func: F) -> Raced<F> {
        Raced {
            timeout: self.clone(),
            name: callable_name::<F>(),
            func: Arc::new(func),
        }
    }

    /// Wrap an async callable to run as a tokio task per call.
    pub fn wrap_async<F>(&self, func: F) -> RacedAsync<F> {
        RacedAsync {
            timeout: self.clone(),
            name: callable_name::<F>(),
            func,
        }
    }

    /// Race a single call.
    #[track_caller]
    pub fn run<R, J>(&self, name: &str, job: J) -> PerfResult<Option<R>>
    where
        J: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.race(name, CallSite::caller(), job)
    }

    /// Console the worker should write to.
    fn worker_console(&self) -> Option<Arc<dyn OutputSink>> {
        if self.suppress_output {
            Some(Arc::new(NullSink))
        } else {
            current_console()
        }
    }

    fn race<R, J>(&self, name: &str, site: CallSite, job: J) -> PerfResult<Option<R>>
    where
        J: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        // One slot per call; the receiver is dropped when this returns.
        let (slot, outcome) = mpsc::sync_channel::<thread::Result<R>>(1);
        let console = self.worker_console();
        let worker_name = name.to_string();

        thread::Builder::new()
            .name(format!("perftest-timeout:{}", name))
            .spawn(move || {
                let _console = console.map(redirect_console);
                let result = panic::catch_unwind(AssertUnwindSafe(job));
                if let Err(SendError(late)) = slot.send(result) {
                    discard_late(&worker_name, late);
                }
            })?;

        match outcome.recv_timeout(self.budget.as_duration()) {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(RecvTimeoutError::Timeout) => {
                self.expired(name, &site);
                Ok(None)
            }
            // catch_unwind means the worker always sends; treat a vanished
            // worker like an expired one.
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn expired(&self, name: &str, site: &CallSite) {
        tracing::debug!(
            target: "perftest::deadline",
            name,
            budget_secs = self.budget.as_secs_f64(),
            call_site = %site,
            "deadline elapsed, abandoning worker"
        );

        if self.verbose {
            self.sink.write_line(&verbose_timeout_report(site, &self.budget));
        }
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("budget", &self.budget)
            .field("verbose", &self.verbose)
            .field("suppress_output", &self.suppress_output)
            .finish_non_exhaustive()
    }
}

/// Log an outcome that arrived after its caller gave up.
fn discard_late<R>(name: &str, late: thread::Result<R>) {
    match late {
        Ok(_) => tracing::debug!(
            target: "perftest::deadline",
            name,
            "late result discarded"
        ),
        Err(payload) => tracing::warn!(
            target: "perftest::deadline",
            name,
            panic = panic_message(&*payload),
            "late panic discarded"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// A callable wrapped by [`Timeout::wrap`].
pub struct Raced<F> {
    timeout: Timeout,
    name: String,
    func: Arc<F>,
}

impl<F> Clone for Raced<F> {
    fn clone(&self) -> Self {
        Self {
            timeout: self.timeout.clone(),
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F> Raced<F> {
    /// Override the name used in logs and thread names.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the callable on a fresh worker and wait up to the deadline.
    ///
    /// `Ok(None)` means the deadline passed first; the worker keeps
    /// running. A panic raised before the deadline is resumed here; one
    /// raised after it is logged and dropped.
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> PerfResult<Option<R>>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        self.call_at(CallSite::caller(), args)
    }

    /// Like [`call`](Self::call) with an explicit call site.
    pub fn call_at<A, R>(&self, site: CallSite, args: A) -> PerfResult<Option<R>>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        let func = Arc::clone(&self.func);
        self.timeout.race(&self.name, site, move || func(args))
    }
}

/// An async callable wrapped by [`Timeout::wrap_async`].
#[derive(Clone)]
pub struct RacedAsync<F> {
    timeout: Timeout,
    name: String,
    func: F,
}

impl<F> RacedAsync<F> {
    /// Override the name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the callable's future as a task and wait up to the deadline.
    ///
    /// On expiry the task is detached, not aborted. Must be awaited inside
    /// a tokio runtime.
    #[track_caller]
    pub fn call<A, Fut>(&self, args: A) -> impl Future<Output = Option<Fut::Output>>
    where
        F: Fn(A) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let site = CallSite::caller();
        let future = (self.func)(args);
        let console = self.timeout.worker_console();
        let timeout = self.timeout.clone();
        let name = self.name.clone();

        async move {
            let mut task = match console {
                Some(console) => tokio::spawn(with_task_console(console, future)),
                None => tokio::spawn(future),
            };

            match tokio::time::timeout(timeout.budget.as_duration(), &mut task).await {
                Ok(Ok(value)) => Some(value),
                Ok(Err(err)) if err.is_panic() => panic::resume_unwind(err.into_panic()),
                Ok(Err(_cancelled)) => None,
                Err(_elapsed) => {
                    timeout.expired(&name, &site);
                    None
                }
            }
        }
    }
}
