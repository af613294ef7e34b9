//! Argv-style argument parsing for check bodies.
//!
//! Checks receive their arguments the way a standalone plugin binary would:
//! `argv[0]` is the invocation name, the rest are positional values. Wrong
//! arity or an unparseable value terminates the check as UNKNOWN with a usage
//! hint in the report text.

use std::str::FromStr;

use crate::routine::{CheckContext, CheckResult, CheckSignal};
use crate::status::Severity;

/// Check argv arity against the expected positional names.
///
/// Returns the positional values (everything after `argv[0]`). On a mismatch,
/// writes a USAGE line and terminates the check as UNKNOWN.
pub fn parse_args(
    ctx: &mut CheckContext,
    script: &str,
    names: &[&str],
    argv: &[String],
) -> CheckResult<Vec<String>> {
    if argv.len() != names.len() + 1 {
        ctx.write_line(&format!("USAGE: {script} {}", names.join(" ")));
        return Err(CheckSignal::Exit(Severity::Unknown));
    }
    Ok(argv[1..].to_vec())
}

/// Parse one positional value. An unparseable value terminates the check as
/// UNKNOWN, naming the offending argument.
pub fn parse_arg<T: FromStr>(ctx: &mut CheckContext, name: &str, raw: &str) -> CheckResult<T> {
    raw.parse().map_err(|_| {
        ctx.write_line(&format!("Invalid value for {name}: {raw:?}."));
        CheckSignal::Exit(Severity::Unknown)
    })
}
