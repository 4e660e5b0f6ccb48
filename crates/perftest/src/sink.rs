//! Output sinks and the console seen by wrapped callables
//!
//! Two separate channels exist:
//!
//! - the **report sink** each wrapper owns, receiving duration reports and
//!   budget warnings;
//! - the **console**, which wrapped callables write to through
//!   [`perf_println!`](crate::perf_println). It defaults to standard output
//!   and can be redirected for a scope with [`redirect_console`] or
//!   silenced with [`suppress_console`].

use crate::report::Warning;
use std::cell::RefCell;
use std::future::{poll_fn, Future};
use std::marker::PhantomData;
use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for human-readable reports.
pub trait OutputSink: Send + Sync {
    /// Write one report line (which may itself contain newlines).
    fn write_line(&self, line: &str);

    /// Surface a non-fatal budget warning.
    fn warn(&self, warning: &Warning) {
        eprintln!("{}", warning);
    }
}

/// Prints reports to standard output and warnings to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_line(&self, _line: &str) {}

    fn warn(&self, _warning: &Warning) {}
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    warnings: Mutex<Vec<Warning>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// All warnings received so far.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether nothing at all was received.
    pub fn is_empty(&self) -> bool {
        self.lines().is_empty() && self.warnings().is_empty()
    }

    /// Forget everything received.
    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl OutputSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }

    fn warn(&self, warning: &Warning) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning.clone());
    }
}

// =============================================================================
// Console
// =============================================================================

thread_local! {
    static THREAD_CONSOLE: RefCell<Option<Arc<dyn OutputSink>>> = const { RefCell::new(None) };
}

/// The console currently in effect, if it was redirected.
///
/// The innermost redirect wins; `None` means standard output.
pub fn current_console() -> Option<Arc<dyn OutputSink>> {
    THREAD_CONSOLE
        .try_with(|console| console.borrow().clone())
        .ok()
        .flatten()
}

/// Write a line to the current console.
///
/// Usually reached through [`perf_println!`](crate::perf_println).
pub fn console_line(line: &str) {
    match current_console() {
        Some(console) => console.write_line(line),
        None => println!("{}", line),
    }
}

/// Restores the previous console of this thread when dropped.
#[must_use = "the console is restored as soon as the guard is dropped"]
pub struct ConsoleRedirect {
    previous: Option<Arc<dyn OutputSink>>,
    // Thread-local state: the guard must be dropped on the thread that made it.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ConsoleRedirect {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = THREAD_CONSOLE.try_with(|console| *console.borrow_mut() = previous);
    }
}

/// Send this thread's console output to `sink` until the guard drops.
pub fn redirect_console(sink: Arc<dyn OutputSink>) -> ConsoleRedirect {
    let previous = THREAD_CONSOLE.with(|console| console.replace(Some(sink)));
    ConsoleRedirect {
        previous,
        _not_send: PhantomData,
    }
}

/// Discard this thread's console output until the guard drops.
pub fn suppress_console() -> ConsoleRedirect {
    redirect_console(Arc::new(NullSink))
}

/// Run a future with its console output sent to `sink`.
///
/// The redirect is installed around every poll of `future`, so it follows
/// the task across threads and wins over any redirect held by the thread
/// doing the polling.
pub async fn with_task_console<F>(sink: Arc<dyn OutputSink>, future: F) -> F::Output
where
    F: Future,
{
    let mut future = pin!(future);
    poll_fn(|cx| {
        let _console = redirect_console(Arc::clone(&sink));
        future.as_mut().poll(cx)
    })
    .await
}

/// Print a line to the current console.
///
/// Wrapped callables use this in place of `println!` so that
/// `suppress_output` can withhold what they print.
#[macro_export]
macro_rules! perf_println {
    () => {
        $crate::console_line("")
    };
    ($($arg:tt)*) => {
        $crate::console_line(&format!($($arg)*))
    };
}
