//! Isolated execution of a single check routine.
//!
//! The isolator owns the invocation's capture buffer, absorbs the routine's
//! early-termination signal, and converts uncaught errors and panics into a
//! severity-coded text line. A failing check never propagates past this
//! boundary.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::routine::{CheckContext, CheckRoutine, CheckSignal};

/// Run one routine to completion and return its captured output.
///
/// - An `Exit` signal is absorbed silently; the carried code is discarded and
///   whatever the routine already wrote is the result.
/// - A `Failed` signal or a panic is logged with the check name and replaced
///   by a `CRIT: Checker exception` line.
///
/// Synchronous: returns only after the routine has fully returned or signaled.
pub fn run_isolated(name: &str, routine: &dyn CheckRoutine, args: &[String]) -> String {
    let mut ctx = CheckContext::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| routine.run(&mut ctx, args)));

    match outcome {
        Ok(Ok(())) | Ok(Err(CheckSignal::Exit(_))) => ctx.into_output(),
        Ok(Err(CheckSignal::Failed(err))) => {
            error!(check = %name, error = %err, "check routine failed");
            format!("CRIT: Checker exception: {err}")
        }
        Err(panic) => {
            let reason = panic_text(panic);
            error!(check = %name, panic = %reason, "check routine panicked");
            format!("CRIT: Checker exception: {reason}")
        }
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
