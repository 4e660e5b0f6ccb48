//! Timing wrappers for functions
//!
//! This crate wraps callables to measure how long they take:
//! - [`Perf`] reports each call's duration, in seconds or nanoseconds
//! - [`ShouldTake`] checks each call against a time budget and warns or fails
//! - [`Timeout`] races each call against a deadline on a background worker,
//!   returning `None` when the deadline wins and leaving the worker running
//! - [`ProgramTimer`] reports how long a whole program ran
//!
//! Wrapped callables take a single argument: `()` for none, a tuple for
//! several. Reports go to an injectable [`OutputSink`]; output the callable
//! itself prints through [`perf_println!`] goes to the console, which
//! `suppress_output` silences for the duration of the call.
//!
//! # Example
//!
//! ```rust
//! use perftest::{Perf, ShouldTake, ShouldTakeOptions, Timeout, TimeoutOptions};
//!
//! fn checksum(data: &[u8]) -> u32 {
//!     data.iter().map(|&b| b as u32).sum()
//! }
//!
//! let timed = Perf::nanos().wrap(|data: Vec<u8>| checksum(&data));
//! assert_eq!(timed.call(vec![1, 2, 3]), 6); // prints "perftest: main took ...ns"
//!
//! let guarded = ShouldTake::new(ShouldTakeOptions::seconds(1).with_throw(true))
//!     .unwrap()
//!     .wrap(|data: Vec<u8>| checksum(&data));
//! assert_eq!(guarded.call(vec![4, 5]).unwrap(), 9);
//!
//! let raced = Timeout::new(TimeoutOptions::seconds(1))
//!     .unwrap()
//!     .wrap(|data: Vec<u8>| checksum(&data));
//! assert_eq!(raced.call(vec![7]).unwrap(), Some(7));
//! ```

mod budget;
mod callsite;
mod clock;
mod deadline;
mod error;
mod guard;
mod program;
mod report;
mod sink;
mod timing;

pub use budget::{DurationBudget, ViolationPolicy};
pub use callsite::CallSite;
pub use clock::{Clock, ManualClock, SystemClock};
pub use deadline::{Raced, RacedAsync, Timeout, TimeoutOptions};
pub use error::{ConfigError, PerfError, PerfResult};
pub use guard::{Guarded, ShouldTake, ShouldTakeOptions};
pub use program::ProgramTimer;
pub use report::{TimeUnit, Violation, Warning};
pub use sink::{
    console_line, current_console, redirect_console, suppress_console, with_task_console,
    ConsoleRedirect, MemorySink, NullSink, OutputSink, StdoutSink,
};
pub use timing::{Perf, PerfOptions, Timed};
