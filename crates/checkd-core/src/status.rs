//! Severity ordering and threshold rules.
//!
//! A [`Severity`] is the ordinal outcome of a check. Combining two severities
//! always yields the worse one, so a response can only escalate. [`Rule`]
//! implementations map a scalar value to a severity and render the matching
//! performance-data token in the plugin wire format.

use serde::{Deserialize, Serialize};

/// Ordinal check outcome. Ordering is total: `Ok < Warning < Critical < Unknown`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl Severity {
    /// Exit code carried by the plugin convention.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Leading word of the report line for this severity.
    pub fn word(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARN",
            Severity::Critical => "CRIT",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Inverse of [`Severity::word`].
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "OK" => Some(Severity::Ok),
            "WARN" => Some(Severity::Warning),
            "CRIT" => Some(Severity::Critical),
            "UNKNOWN" => Some(Severity::Unknown),
            _ => None,
        }
    }

    /// Worse of the two severities.
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.word())
    }
}

/// Threshold values and samples are rendered as integers on the wire.
fn level(value: f64) -> String {
    format!("{}", value as i64)
}

/// A reusable threshold policy over a single scalar value.
///
/// Rules are immutable once constructed and are evaluated against many values
/// over their lifetime. Custom predicates implement this trait directly.
pub trait Rule: Send + Sync {
    /// Map a value to a severity. Pure and deterministic.
    fn check(&self, value: f64) -> Severity;

    /// Render the performance-data token: `'name'=value[unit];warn;crit;;;`.
    fn perf_data(&self, name: &str, value: f64) -> String;

    /// Error message for a violated threshold, `None` when the value is OK.
    fn message(&self, name: &str, value: f64) -> Option<String>;
}

/// A rule that specifies minimum acceptable levels for a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    warn: f64,
    crit: f64,
    unit: String,
}

impl Minimum {
    /// Invariant: `crit <= warn`.
    pub fn new(warn: f64, crit: f64) -> Self {
        assert!(crit <= warn, "Minimum rule requires crit <= warn");
        Self {
            warn,
            crit,
            unit: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

impl Rule for Minimum {
    fn check(&self, value: f64) -> Severity {
        if value < self.crit {
            Severity::Critical
        } else if value < self.warn {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    fn perf_data(&self, name: &str, value: f64) -> String {
        format!(
            "'{}'={}{};{};{};;;",
            name,
            level(value),
            self.unit,
            level(self.warn),
            level(self.crit)
        )
    }

    fn message(&self, name: &str, value: f64) -> Option<String> {
        let threshold = match self.check(value) {
            Severity::Critical => self.crit,
            Severity::Warning => self.warn,
            _ => return None,
        };
        Some(format!(
            "{}: {}{} < {}{}",
            name,
            level(value),
            self.unit,
            level(threshold),
            self.unit
        ))
    }
}

/// A rule that specifies maximum acceptable levels for a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Maximum {
    warn: f64,
    crit: f64,
    unit: String,
}

impl Maximum {
    /// Invariant: `crit >= warn`.
    pub fn new(warn: f64, crit: f64) -> Self {
        assert!(crit >= warn, "Maximum rule requires crit >= warn");
        Self {
            warn,
            crit,
            unit: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

impl Rule for Maximum {
    fn check(&self, value: f64) -> Severity {
        if value > self.crit {
            Severity::Critical
        } else if value > self.warn {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    fn perf_data(&self, name: &str, value: f64) -> String {
        format!(
            "'{}'={}{};{};{};;;",
            name,
            level(value),
            self.unit,
            level(self.warn),
            level(self.crit)
        )
    }

    fn message(&self, name: &str, value: f64) -> Option<String> {
        let threshold = match self.check(value) {
            Severity::Critical => self.crit,
            Severity::Warning => self.warn,
            _ => return None,
        };
        Some(format!(
            "{}: {}{} > {}{}",
            name,
            level(value),
            self.unit,
            level(threshold),
            self.unit
        ))
    }
}
