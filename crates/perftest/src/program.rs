//! Whole-program timing

use crate::clock::{Clock, SystemClock};
use crate::sink::{OutputSink, StdoutSink};
use std::sync::Arc;

/// Reports how long a program (or any scope) ran, when dropped.
///
/// Usually created with [`time_this_program!`](crate::time_this_program)
/// as the first line of `main`.
///
/// # Example
///
/// ```rust
/// use perftest::ProgramTimer;
///
/// fn main() {
///     let _timer = ProgramTimer::new(module_path!(), file!());
///     // ... program ...
/// } // "perftest: the module '...' from file '...' took ...ns to run"
/// ```
pub struct ProgramTimer {
    module: &'static str,
    file: &'static str,
    start_ns: u64,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn OutputSink>,
    armed: bool,
}

impl ProgramTimer {
    /// Start timing now.
    pub fn new(module: &'static str, file: &'static str) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            module,
            file,
            start_ns: clock.now_ns(),
            clock,
            sink: Arc::new(StdoutSink),
            armed: true,
        }
    }

    /// Builder method to set where the report goes.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builder method to set the clock; restarts the timer.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.start_ns = clock.now_ns();
        self.clock = clock;
        self
    }

    /// Nanoseconds since the timer started.
    pub fn elapsed_ns(&self) -> u64 {
        self.clock.now_ns().saturating_sub(self.start_ns)
    }

    /// Stop without reporting and return the elapsed nanoseconds.
    pub fn stop(mut self) -> u64 {
        self.armed = false;
        self.elapsed_ns()
    }

    fn report(&self) -> String {
        format!(
            "perftest: the module '{}' from file '{}' took {}ns to run",
            self.module,
            self.file,
            self.elapsed_ns()
        )
    }
}

impl Drop for ProgramTimer {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let elapsed_ns = self.elapsed_ns();
        tracing::trace!(
            target: "perftest::program",
            module = self.module,
            elapsed_ns,
            "program finished"
        );
        self.sink.write_line(&self.report());
    }
}

/// Time the rest of the enclosing scope, reporting when it ends.
///
/// # Example
///
/// ```rust
/// fn main() {
///     perftest::time_this_program!();
///     // ... program ...
/// }
/// ```
#[macro_export]
macro_rules! time_this_program {
    () => {
        let _program_timer = $crate::ProgramTimer::new(module_path!(), file!());
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sink::MemorySink;
    use std::time::Duration;

    #[test]
    fn test_reports_on_drop() {
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(ManualClock::new());

        {
            let _timer = ProgramTimer::new("app::main", "src/main.rs")
                .with_sink(sink.clone())
                .with_clock(clock.clone());
            clock.advance(Duration::from_micros(3));
            assert!(sink.lines().is_empty());
        }

        assert_eq!(
            sink.lines(),
            vec!["perftest: the module 'app::main' from file 'src/main.rs' took 3000ns to run"]
        );
    }

    #[test]
    fn test_stop_skips_report() {
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(ManualClock::new());
        let timer = ProgramTimer::new(module_path!(), file!())
            .with_sink(sink.clone())
            .with_clock(clock.clone());

        clock.advance(Duration::from_nanos(40));
        assert_eq!(timer.stop(), 40);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_macro_names_this_module() {
        time_this_program!();
        assert!(module_path!().ends_with("program::tests"));
    }
}
