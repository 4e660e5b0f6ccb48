//! Call-site descriptors for verbose reports

use std::fmt;
use std::panic::Location;

/// Where a wrapped call was made from.
///
/// `call` methods capture this through `#[track_caller]`. The
/// [`call_site!`](crate::call_site) and [`timed!`](crate::timed) macros also
/// capture the literal source text of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    file: &'static str,
    line: u32,
    column: u32,
    source: Option<&'static str>,
}

impl CallSite {
    /// Create a call site without source text.
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self {
            file,
            line,
            column,
            source: None,
        }
    }

    /// Attach the literal source text of the call.
    pub const fn with_source(self, source: &'static str) -> Self {
        Self {
            source: Some(source),
            ..self
        }
    }

    /// The location of whoever called the `#[track_caller]` function
    /// this is invoked from.
    #[track_caller]
    #[inline]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn source(&self) -> Option<&'static str> {
        self.source
    }

    /// The source text quoted for a report, or the location when no
    /// text was captured.
    pub fn quoted(&self) -> String {
        match self.source {
            Some(source) => format!("{:?}", source),
            None => format!("{:?}", self.to_string()),
        }
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Capture the current location, optionally with the text of a call.
///
/// # Example
///
/// ```rust
/// use perftest::call_site;
///
/// let site = call_site!(compute(1, 2));
/// assert_eq!(site.source(), Some("compute(1, 2)"));
/// assert_eq!(site.file(), file!());
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new(file!(), line!(), column!())
    };
    ($($call:tt)+) => {
        $crate::CallSite::new(file!(), line!(), column!()).with_source(stringify!($($call)+))
    };
}

/// Call a wrapper like a function, recording the call's source text.
///
/// No arguments pass `()`, one argument passes it as is, several pass a
/// tuple; this matches the argument type of the wrapped callable.
///
/// # Example
///
/// ```rust
/// use perftest::{timed, Perf};
///
/// let add = Perf::nanos().wrap(|(a, b): (i32, i32)| a + b);
/// assert_eq!(timed!(add(2, 3)), 5);
/// ```
#[macro_export]
macro_rules! timed {
    ($wrapper:ident ( $($args:tt)* )) => {
        $wrapper.call_at(
            $crate::CallSite::new(file!(), line!(), column!())
                .with_source(concat!(stringify!($wrapper), stringify!(( $($args)* )))),
            $crate::__timed_args!($($args)*),
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __timed_args {
    () => {
        ()
    };
    ($($arg:expr),+ $(,)?) => {
        ($($arg),+)
    };
}
