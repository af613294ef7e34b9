//! Response accumulation for one check invocation.
//!
//! [`ResponseBuilder`] holds the worst severity seen so far, four message
//! buckets, and the ordered performance-data tokens. Severity only escalates.
//! [`ResponseBuilder::finish`] is the terminal operation: it consumes the
//! builder, so reuse after finishing is ruled out at compile time.

use serde_json::Value;

use crate::lookup::{lookup, render_scalar};
use crate::routine::{CheckContext, CheckResult, CheckSignal};
use crate::status::{Rule, Severity};

/// Accumulates messages and performance data for a single check invocation.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    severity: Severity,
    perf: Vec<String>,
    unknown_messages: Vec<String>,
    crit_messages: Vec<String>,
    warn_messages: Vec<String>,
    info_messages: Vec<String>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an untyped metric token. No severity effect.
    pub fn add_value(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.perf.push(format!("'{name}'={value};;;;;"));
        self
    }

    /// Append a metric from a sequential key lookup. Missing data emits nothing.
    pub fn add_stat_lookup(self, name: &str, data: &Value, path: &[&str], suffix: &str) -> Self {
        match lookup(data, path) {
            Some(value) => {
                let rendered = format!("{}{}", render_scalar(value), suffix);
                self.add_value(name, rendered)
            }
            None => self,
        }
    }

    /// Append one metric per child of the mapping at `path`.
    ///
    /// `pattern` contains a `{}` placeholder for the child name. Missing or
    /// non-mapping data emits nothing.
    pub fn add_stat_children(
        mut self,
        pattern: &str,
        data: &Value,
        path: &[&str],
        suffix: &str,
    ) -> Self {
        if let Some(Value::Object(children)) = lookup(data, path) {
            for (child, value) in children {
                let name = pattern.replacen("{}", child, 1);
                let rendered = format!("{}{}", render_scalar(value), suffix);
                self = self.add_value(&name, rendered);
            }
        }
        self
    }

    /// Evaluate a threshold rule against `value`.
    ///
    /// Escalates the aggregate severity, queues the rule's message on
    /// violation, and always appends the performance token so graphs keep
    /// continuity across OK samples.
    pub fn add_rule(mut self, name: &str, rule: &dyn Rule, value: f64) -> Self {
        let status = rule.check(value);
        if status != Severity::Ok {
            self.severity = self.severity.combine(status);
            if let Some(message) = rule.message(name, value) {
                self.info_messages.push(message);
            }
        }
        self.perf.push(rule.perf_data(name, value));
        self
    }

    /// Escalate to at least `severity` without queueing a message.
    pub fn escalate(mut self, severity: Severity) -> Self {
        self.severity = self.severity.combine(severity);
        self
    }

    /// Mark state as warning.
    pub fn warn(mut self, message: impl Into<String>) -> Self {
        self.severity = self.severity.combine(Severity::Warning);
        self.warn_messages.push(message.into());
        self
    }

    /// Mark state as critical.
    pub fn crit(mut self, message: impl Into<String>) -> Self {
        self.severity = self.severity.combine(Severity::Critical);
        self.crit_messages.push(message.into());
        self
    }

    /// Mark state as unknown.
    pub fn unknown(mut self, message: impl Into<String>) -> Self {
        self.severity = self.severity.combine(Severity::Unknown);
        self.unknown_messages.push(message.into());
        self
    }

    /// Warn on a given condition.
    pub fn warn_if(self, condition: bool, message: impl Into<String>) -> Self {
        if condition {
            self.warn(message)
        } else {
            self
        }
    }

    /// Mark state as critical on a given condition.
    pub fn crit_if(self, condition: bool, message: impl Into<String>) -> Self {
        if condition {
            self.crit(message)
        } else {
            self
        }
    }

    /// Mark state as unknown on a given condition.
    pub fn unknown_if(self, condition: bool, message: impl Into<String>) -> Self {
        if condition {
            self.unknown(message)
        } else {
            self
        }
    }

    /// Append an unconditional informational message. Empty text is dropped.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.info_messages.push(text);
        }
        self
    }

    /// Current aggregate severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Space-joined performance tokens only. Side-effect-free and repeatable.
    pub fn build(&self) -> String {
        self.perf.join(" ")
    }

    /// Full report line: severity word, messages in priority order, perf data.
    fn render(&self) -> String {
        let mut out = self.severity.word().to_string();
        let messages: Vec<&str> = self
            .unknown_messages
            .iter()
            .chain(&self.crit_messages)
            .chain(&self.warn_messages)
            .chain(&self.info_messages)
            .map(String::as_str)
            .collect();
        if !messages.is_empty() {
            out.push_str(": ");
            out.push_str(&messages.join(", "));
        }
        if !self.perf.is_empty() {
            out.push('|');
            out.push_str(&self.build());
        }
        out
    }

    /// Write the full report to the invocation's context and end the routine.
    ///
    /// Terminal: the builder is consumed and the returned signal carries the
    /// aggregate severity as the invocation's outcome.
    pub fn finish(self, ctx: &mut CheckContext) -> CheckResult {
        let severity = self.severity;
        ctx.write_line(&self.render());
        Err(CheckSignal::Exit(severity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Maximum, Minimum};
    use serde_json::json;

    #[test]
    fn test_build_is_idempotent() {
        let builder = ResponseBuilder::new()
            .add_value("a", 1)
            .add_rule("b", &Maximum::new(10.0, 20.0), 5.0);
        assert_eq!(builder.build(), builder.build());
        assert_eq!(builder.build(), "'a'=1;;;;; 'b'=5;10;20;;;");
    }

    #[test]
    fn test_add_rule_always_emits_one_token() {
        let builder = ResponseBuilder::new()
            .add_rule("ok", &Maximum::new(10.0, 20.0), 5.0)
            .add_rule("warn", &Maximum::new(10.0, 20.0), 15.0)
            .add_rule("crit", &Maximum::new(10.0, 20.0), 25.0);
        assert_eq!(builder.build().split(' ').count(), 3);
        assert_eq!(builder.severity(), Severity::Critical);
    }

    #[test]
    fn test_severity_only_escalates() {
        let builder = ResponseBuilder::new()
            .crit("bad")
            .add_rule("fine", &Minimum::new(10.0, 5.0), 50.0)
            .warn("meh");
        assert_eq!(builder.severity(), Severity::Critical);

        let builder = builder.unknown("confused");
        assert_eq!(builder.severity(), Severity::Unknown);
    }

    #[test]
    fn test_message_priority_order() {
        let mut ctx = CheckContext::new();
        let result = ResponseBuilder::new()
            .message("info")
            .warn("warned")
            .unknown("unknown")
            .crit("critted")
            .finish(&mut ctx);

        match result {
            Err(CheckSignal::Exit(Severity::Unknown)) => {}
            other => panic!("expected Exit(Unknown), got {other:?}"),
        }
        assert_eq!(ctx.output(), "UNKNOWN: unknown, critted, warned, info\n");
    }

    #[test]
    fn test_finish_renders_report_and_signals_severity() {
        let mut ctx = CheckContext::new();
        let result = ResponseBuilder::new()
            .add_rule("harrypotter", &Maximum::new(42.0, 108.0), 69.0)
            .finish(&mut ctx);

        match result {
            Err(CheckSignal::Exit(Severity::Warning)) => {}
            other => panic!("expected Exit(Warning), got {other:?}"),
        }
        assert_eq!(
            ctx.output(),
            "WARN: harrypotter: 69 > 42|'harrypotter'=69;42;108;;;\n"
        );
    }

    #[test]
    fn test_ok_report_without_messages_or_perf() {
        let mut ctx = CheckContext::new();
        let _ = ResponseBuilder::new().finish(&mut ctx);
        assert_eq!(ctx.output(), "OK\n");
    }

    #[test]
    fn test_add_stat_lookup_skips_missing_data() {
        let data = json!({ "queue": { "depth": 7 } });
        let builder = ResponseBuilder::new()
            .add_stat_lookup("depth", &data, &["queue", "depth"], "")
            .add_stat_lookup("missing", &data, &["queue", "nope"], "");
        assert_eq!(builder.build(), "'depth'=7;;;;;");
    }

    #[test]
    fn test_add_stat_lookup_applies_suffix() {
        let data = json!({ "load": "0.25" });
        let builder = ResponseBuilder::new().add_stat_lookup("load", &data, &["load"], "%");
        assert_eq!(builder.build(), "'load'=0.25%;;;;;");
    }

    #[test]
    fn test_add_stat_children_fans_out() {
        let data = json!({ "queues": { "a": 1, "b": 2 } });
        let builder =
            ResponseBuilder::new().add_stat_children("queue_{}", &data, &["queues"], "");
        assert_eq!(builder.build(), "'queue_a'=1;;;;; 'queue_b'=2;;;;;");
    }

    #[test]
    fn test_conditional_escalation() {
        let builder = ResponseBuilder::new()
            .warn_if(false, "not taken")
            .crit_if(true, "taken");
        assert_eq!(builder.severity(), Severity::Critical);
        let mut ctx = CheckContext::new();
        let _ = builder.finish(&mut ctx);
        assert_eq!(ctx.output(), "CRIT: taken\n");
    }
}
