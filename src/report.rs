//! Audit reports and violation records
//!
//! Rules accumulate every violation before returning, so one audit pass
//! yields the complete diagnostic picture. Reports render as
//! human-readable text or JSON.

use crate::attributes::MemoryAttributes;
use crate::validator::MatchMode;
use serde::Serialize;
use std::fmt::Write as _;

/// A single policy violation within a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Inclusive start of the offending range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Exclusive end of the offending range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    /// Names of the attribute bits involved
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    pub message: String,
}

impl Violation {
    /// Violation anchored to an address range
    pub fn range(start: u64, end: u64, attributes: &[&str], message: String) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            attributes: attributes.iter().map(|name| (*name).to_string()).collect(),
            message,
        }
    }

    /// Violation with no specific address range
    pub fn general(message: String) -> Self {
        Self {
            start: None,
            end: None,
            attributes: Vec::new(),
            message,
        }
    }
}

/// Outcome of one audit rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub name: String,
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl RuleReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            violations: Vec::new(),
        }
    }

    /// Records a violation and fails the rule
    pub fn record(&mut self, violation: Violation) {
        tracing::error!(rule = %self.name, "{}", violation.message);
        self.passed = false;
        self.violations.push(violation);
    }

    pub(crate) fn record_mismatch(
        &mut self,
        start: u64,
        end: u64,
        required: MemoryAttributes,
        mode: MatchMode,
    ) {
        let names = required.names();
        let expectation = match mode {
            MatchMode::All => "all of",
            MatchMode::Any => "any of",
        };
        let message = format!(
            "region {start:#x}-{end:#x} does not carry {expectation}: {}",
            names.join(" ")
        );
        self.record(Violation::range(start, end, &names, message));
    }

    pub(crate) fn record_unmapped(&mut self, start: u64, end: u64) {
        let message = format!("region {start:#x}-{end:#x} is not mapped");
        self.record(Violation::range(start, end, &[], message));
    }

    pub(crate) fn record_scan_error(&mut self, address: u64, detail: String) {
        let message = format!("scan aborted at {address:#x}: {detail}");
        self.record(Violation::general(message));
    }
}

/// Aggregate outcome across every rule in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub rules: Vec<RuleReport>,
}

impl AuditReport {
    /// True iff every rule passed
    pub fn passed(&self) -> bool {
        self.rules.iter().all(|rule| rule.passed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report, one line per rule plus indented violations
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let verdict = if rule.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "[{verdict}] {}", rule.name);
            for violation in &rule.violations {
                let _ = writeln!(out, "    {}", violation.message);
            }
        }
        let passed = self.rules.iter().filter(|rule| rule.passed).count();
        let _ = writeln!(out, "{passed} of {} rules passed", self.rules.len());
        out
    }
}
