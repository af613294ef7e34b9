//! Path lookup over JSON stat trees.
//!
//! Checks routinely dig values out of nested JSON reported by other services.
//! The helpers here never fail: any dead end (missing key, index past the end,
//! scalar where a container was expected) yields `None` and the caller picks
//! a default.

use serde_json::Value;

/// Successively look up each path segment in `source`.
///
/// A segment is tried as an object key first; on a sequence, a segment that
/// parses as an index is used positionally. Returns `None` on any dead end.
pub fn lookup<'a>(source: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = source;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Numeric value of a stat, coercing numeric strings.
pub fn stat_value(source: &Value, path: &[&str]) -> Option<f64> {
    match lookup(source, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Text rendering of a scalar leaf, without JSON quoting for strings.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format a fraction as a percentage, e.g. `0.5` becomes `50.000000%`.
pub fn percent(value: f64) -> String {
    format!("{:.6}%", value * 100.0)
}
