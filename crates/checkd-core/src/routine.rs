//! Check routine contract and per-invocation execution context.
//!
//! A routine writes its report into a [`CheckContext`] owned by exactly one
//! invocation, so concurrent checks can never interleave output. The
//! "terminate now with code C" convention of classic plugins is modelled as a
//! [`CheckSignal::Exit`] value in the routine's result type instead of a
//! process exit.

use crate::status::Severity;

/// Result type for check routine bodies and check-side helpers.
pub type CheckResult<T = ()> = std::result::Result<T, CheckSignal>;

/// Non-local exit taken by a check routine.
#[derive(Debug)]
pub enum CheckSignal {
    /// The routine fixed its outcome and stopped early. The severity rides in
    /// the report text already written to the context; the code itself is
    /// discarded at the isolation boundary.
    Exit(Severity),

    /// The routine hit an unexpected error.
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for CheckSignal {
    fn from(err: anyhow::Error) -> Self {
        CheckSignal::Failed(err)
    }
}

impl std::fmt::Display for CheckSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckSignal::Exit(severity) => write!(f, "exit({})", severity.code()),
            CheckSignal::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Private capture buffer for one check invocation.
///
/// Both primary and diagnostic routine output land here; nothing a routine
/// writes reaches a process-wide stream.
#[derive(Debug, Default)]
pub struct CheckContext {
    captured: String,
}

impl CheckContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw text to the capture buffer.
    pub fn write(&mut self, text: &str) {
        self.captured.push_str(text);
    }

    /// Append one line to the capture buffer.
    pub fn write_line(&mut self, line: &str) {
        self.captured.push_str(line);
        self.captured.push('\n');
    }

    /// Everything the routine has written so far.
    pub fn output(&self) -> &str {
        &self.captured
    }

    pub fn into_output(self) -> String {
        self.captured
    }
}

/// A named check routine.
///
/// Bodies are synchronous and blocking; the dispatcher decides whether to run
/// them inline or on the worker pool. `args` follows the argv convention:
/// `args[0]` is the check's own invocation name.
pub trait CheckRoutine: Send + Sync {
    fn run(&self, ctx: &mut CheckContext, args: &[String]) -> CheckResult;
}

impl<F> CheckRoutine for F
where
    F: Fn(&mut CheckContext, &[String]) -> CheckResult + Send + Sync,
{
    fn run(&self, ctx: &mut CheckContext, args: &[String]) -> CheckResult {
        self(ctx, args)
    }
}
