//! Parsing of the status report wire format.
//!
//! Inverse of [`crate::response::ResponseBuilder`] rendering:
//! `SEVERITY_WORD[: message, message, ...][|token token ...]` with each perf
//! token shaped like `'name'=value[unit][;warn;crit;;;]`. The dispatcher uses
//! this to pull numeric samples out of check output for metrics forwarding.

use std::collections::BTreeMap;

use crate::status::Severity;

/// One performance-data field from a report.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfValue {
    /// Value field as written, unit included.
    pub raw: String,
    /// Numeric reading of the value, unit stripped. `None` when non-numeric.
    pub value: Option<f64>,
}

/// A status report decomposed into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub severity: Severity,
    pub messages: Vec<String>,
    pub perf: BTreeMap<String, PerfValue>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReportParseError {
    #[error("empty report")]
    Empty,

    #[error("unknown severity word: {word}")]
    UnknownSeverity { word: String },

    #[error("malformed perf token: {token}")]
    MalformedToken { token: String },
}

/// Parse a status report line.
pub fn parse_report(text: &str) -> Result<ParsedReport, ReportParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ReportParseError::Empty);
    }

    let (head, perf_part) = match text.split_once('|') {
        Some((head, perf)) => (head, Some(perf)),
        None => (text, None),
    };

    let (word, message_part) = match head.split_once(": ") {
        Some((word, messages)) => (word, Some(messages)),
        None => (head, None),
    };

    let word = word.trim();
    let severity = Severity::from_word(word).ok_or_else(|| ReportParseError::UnknownSeverity {
        word: word.to_string(),
    })?;

    let messages = message_part
        .map(|m| m.split(", ").map(str::to_string).collect())
        .unwrap_or_default();

    let mut perf = BTreeMap::new();
    if let Some(tokens) = perf_part {
        for token in tokens.split_whitespace() {
            let (name, value) = parse_perf_token(token)?;
            perf.insert(name, value);
        }
    }

    Ok(ParsedReport {
        severity,
        messages,
        perf,
    })
}

fn parse_perf_token(token: &str) -> Result<(String, PerfValue), ReportParseError> {
    let malformed = || ReportParseError::MalformedToken {
        token: token.to_string(),
    };

    let rest = token.strip_prefix('\'').ok_or_else(malformed)?;
    let (name, rest) = rest.split_once('\'').ok_or_else(malformed)?;
    let rest = rest.strip_prefix('=').ok_or_else(malformed)?;
    let raw = rest.split(';').next().unwrap_or("").to_string();

    let value = numeric_value(&raw);
    Ok((name.to_string(), PerfValue { raw, value }))
}

/// Read a number out of a perf value, tolerating a trailing unit label.
fn numeric_value(raw: &str) -> Option<f64> {
    if let Ok(value) = raw.parse() {
        return Some(value);
    }
    let stripped = raw.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    if stripped.len() < raw.len() {
        stripped.parse().ok()
    } else {
        None
    }
}
