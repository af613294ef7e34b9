//! Network and input helpers for check bodies.
//!
//! These follow the plugin convention for their own failures: they write a
//! severity-coded line to the invocation's context and signal an early exit
//! with that severity, so the check's caller always receives interpretable
//! report text. They are blocking by design — check bodies run on the worker
//! pool, never on the async accept path.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use serde_json::Value;

use crate::routine::{CheckContext, CheckResult, CheckSignal};
use crate::status::Severity;

/// Timed HTTP GET against `host:port`.
///
/// Returns the elapsed seconds and the response body. A connect failure or a
/// timeout terminates the check as CRITICAL.
pub fn http_get_timed(
    ctx: &mut CheckContext,
    host: &str,
    port: u16,
    path: &str,
    timeout: Duration,
    secure: bool,
) -> CheckResult<(f64, String)> {
    let scheme = if secure { "https" } else { "http" };
    let url = format!("{scheme}://{host}:{port}{path}");

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")?;

    let start = Instant::now();
    let response = match client.get(&url).send() {
        Ok(response) => response,
        Err(err) if err.is_timeout() => {
            ctx.write_line(&format!(
                "CRIT: Timed out after {} seconds",
                timeout.as_secs_f64()
            ));
            return Err(CheckSignal::Exit(Severity::Critical));
        }
        Err(_) => {
            ctx.write_line(&format!("CRIT: Could not connect to {host}"));
            return Err(CheckSignal::Exit(Severity::Critical));
        }
    };

    let body = match response.text() {
        Ok(body) => body,
        Err(err) if err.is_timeout() => {
            ctx.write_line(&format!(
                "CRIT: Timed out after {} seconds",
                timeout.as_secs_f64()
            ));
            return Err(CheckSignal::Exit(Severity::Critical));
        }
        Err(_) => {
            ctx.write_line(&format!("CRIT: Could not connect to {host}"));
            return Err(CheckSignal::Exit(Severity::Critical));
        }
    };

    Ok((start.elapsed().as_secs_f64(), body))
}

/// Parse JSON, terminating the check as CRITICAL when the parse fails.
pub fn parse_json(ctx: &mut CheckContext, text: &str) -> CheckResult<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(err) => {
            ctx.write_line(&format!("CRIT: {err}"));
            Err(CheckSignal::Exit(Severity::Critical))
        }
    }
}

/// Parse JSON from a file; a missing or unreadable file terminates the check
/// as UNKNOWN, malformed content as CRITICAL.
pub fn parse_json_file(ctx: &mut CheckContext, path: &Path) -> CheckResult<Value> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_json(ctx, &text),
        Err(err) => {
            ctx.write_line(&format!("UNKNOWN: {err}"));
            Err(CheckSignal::Exit(Severity::Unknown))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_ok() {
        let mut ctx = CheckContext::new();
        let value = parse_json(&mut ctx, r#"{"a": 1}"#).expect("parse");
        assert_eq!(value["a"], 1);
        assert!(ctx.output().is_empty());
    }

    #[test]
    fn test_parse_json_failure_is_critical() {
        let mut ctx = CheckContext::new();
        match parse_json(&mut ctx, "{nope") {
            Err(CheckSignal::Exit(Severity::Critical)) => {}
            other => panic!("expected Exit(Critical), got {other:?}"),
        }
        assert!(ctx.output().starts_with("CRIT: "));
    }

    #[test]
    fn test_parse_json_file_missing_is_unknown() {
        let mut ctx = CheckContext::new();
        match parse_json_file(&mut ctx, Path::new("/definitely/not/here.json")) {
            Err(CheckSignal::Exit(Severity::Unknown)) => {}
            other => panic!("expected Exit(Unknown), got {other:?}"),
        }
        assert!(ctx.output().starts_with("UNKNOWN: "));
    }

    #[test]
    fn test_parse_json_file_reads_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stats.json");
        std::fs::write(&path, r#"{"depth": 3}"#).expect("write");

        let mut ctx = CheckContext::new();
        let value = parse_json_file(&mut ctx, &path).expect("parse");
        assert_eq!(value["depth"], 3);
    }
}
