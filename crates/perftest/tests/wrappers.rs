//! Integration tests for the timing wrappers
//!
//! These run the wrappers against the real clock and real threads, the way
//! a caller would, with budgets generous enough for loaded CI machines.

use perftest::{
    perf_println, redirect_console, timed, ConfigError, MemorySink, Perf, PerfError, ShouldTake,
    ShouldTakeOptions, Timeout, TimeoutOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn nap(ms: u64) -> u64 {
    sleep(Duration::from_millis(ms));
    ms
}

#[test]
fn measured_call_reports_real_duration() {
    init_tracing();
    let sink = Arc::new(MemorySink::new());
    let napper = Perf::nanos().with_sink(sink.clone()).wrap(nap);

    assert_eq!(napper.call(5), 5);

    let line = sink.lines().remove(0);
    let ns: u64 = line
        .strip_prefix("perftest: nap took ")
        .and_then(|rest| rest.strip_suffix("ns"))
        .and_then(|n| n.parse().ok())
        .expect("report in nanoseconds");
    assert!(ns >= 5_000_000, "reported {}ns for a 5ms nap", ns);
}

#[test]
fn guard_throws_when_over_budget() {
    init_tracing();
    let guard = ShouldTake::new(ShouldTakeOptions::milliseconds(20).with_throw(true)).unwrap();
    let slow = guard.wrap(nap);

    match slow.call(30) {
        Err(PerfError::BudgetExceeded(violation)) => {
            assert!(violation.elapsed_ns > violation.budget_ns);
            assert_eq!(violation.name, "nap");
        }
        other => panic!("expected a budget violation, got {:?}", other),
    }
}

#[test]
fn guard_warns_once_and_returns_result() {
    init_tracing();
    let sink = Arc::new(MemorySink::new());
    let guard = ShouldTake::new(ShouldTakeOptions::milliseconds(20).with_warn(true))
        .unwrap()
        .with_sink(sink.clone());
    let slow = guard.wrap(nap);

    assert_eq!(slow.call(30).unwrap(), 30);
    assert_eq!(sink.warnings().len(), 1);
    assert_eq!(sink.warnings()[0].site.file(), file!());
}

#[test]
fn guard_configuration_is_checked_up_front() {
    let both_units = ShouldTakeOptions {
        milliseconds: Some(5),
        seconds: Some(1),
        ..ShouldTakeOptions::default()
    }
    .with_throw(true);
    assert_eq!(
        ShouldTake::new(both_units).unwrap_err(),
        ConfigError::UnitNotExclusive
    );

    let no_policy = ShouldTakeOptions::milliseconds(5);
    assert_eq!(
        ShouldTake::new(no_policy).unwrap_err(),
        ConfigError::PolicyNotExclusive
    );
}

#[test]
fn timeout_returns_result_in_time() {
    init_tracing();
    let timeout = Timeout::new(TimeoutOptions::milliseconds(100)).unwrap();
    let answer = timeout.wrap(|()| {
        sleep(Duration::from_millis(10));
        42
    });
    assert_eq!(answer.call(()).unwrap(), Some(42));
}

#[test]
fn timeout_abandons_slow_call_which_still_finishes() {
    init_tracing();
    let landed = Arc::new(AtomicUsize::new(0));
    let worker_landed = landed.clone();
    let timeout = Timeout::new(TimeoutOptions::milliseconds(50)).unwrap();
    let slow = timeout.wrap(move |()| {
        sleep(Duration::from_millis(200));
        worker_landed.fetch_add(1, Ordering::SeqCst)
    });

    assert_eq!(slow.call(()).unwrap(), None);
    assert_eq!(landed.load(Ordering::SeqCst), 0);

    let give_up = Instant::now() + Duration::from_secs(2);
    while landed.load(Ordering::SeqCst) == 0 && Instant::now() < give_up {
        sleep(Duration::from_millis(10));
    }
    assert_eq!(landed.load(Ordering::SeqCst), 1);
}

#[test]
fn suppressed_output_never_reaches_the_console() {
    let console = Arc::new(MemorySink::new());
    let _console = redirect_console(console.clone());
    let reports = Arc::new(MemorySink::new());

    let noisy = |()| {
        perf_println!("debug chatter");
        1
    };

    let perf = Perf::secs().with_sink(reports.clone()).with_suppress_output(true);
    let quiet_perf = perf.wrap(noisy);
    assert_eq!(quiet_perf.call(()), 1);

    let guard = ShouldTake::new(
        ShouldTakeOptions::seconds(10)
            .with_warn(true)
            .with_suppress_output(true),
    )
    .unwrap();
    assert_eq!(guard.wrap(noisy).call(()).unwrap(), 1);

    assert!(console.lines().is_empty());
    assert_eq!(reports.lines().len(), 1);
    assert!(reports.lines()[0].ends_with(" secs"));
}

#[test]
fn wrapping_twice_gives_identical_results() {
    let guard = ShouldTake::new(ShouldTakeOptions::seconds(10).with_throw(true)).unwrap();
    let first = guard.wrap(|(a, b): (u32, u32)| a * b);
    let second = guard.wrap(|(a, b): (u32, u32)| a * b);
    assert_eq!(first.call((6, 7)).unwrap(), second.call((6, 7)).unwrap());

    let timeout = Timeout::new(TimeoutOptions::seconds(5)).unwrap();
    let first = timeout.wrap(|s: String| s.len());
    let second = timeout.wrap(|s: String| s.len());
    assert_eq!(
        first.call("perftest".to_string()).unwrap(),
        second.call("perftest".to_string()).unwrap()
    );
}

#[test]
fn verbose_report_quotes_the_call() {
    let sink = Arc::new(MemorySink::new());
    let scale = Perf::nanos()
        .with_verbose(true)
        .with_sink(sink.clone())
        .wrap(|(x, factor): (f64, f64)| x * factor);

    assert_eq!(timed!(scale(2.0, 4.0)), 8.0);

    let report = sink.lines().remove(0);
    assert!(report.starts_with("perftest:\n\t\"scale(2.0, 4.0)\"\n\t\ton line "));
    assert!(report.contains(&format!("\t\tin file {}\n\ttook ", file!())));
}
