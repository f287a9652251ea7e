//! Validation report and its renderings.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::Serialize;

use crate::config::WcagVersion;
use crate::error::Result;

/// Severity of a finding, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Critical and High findings break AA conformance.
    pub fn blocks_aa(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// WCAG success criterion, e.g. `"2.4.1"`.
    pub criterion_id: String,
    /// Catalogue entry that produced the issue, e.g. `"bypass-blocks"`.
    pub check: String,
    pub severity: Severity,
    pub message: String,
    /// DOM path or stylesheet selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Issues grouped under one success criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionSummary {
    pub count: usize,
    pub worst: Severity,
}

/// Result of one validation run.
///
/// `wcag_aa_compliant` is true exactly when no issue is Critical or High,
/// and `total_issues` always equals `issues.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub total_issues: usize,
    pub wcag_aa_compliant: bool,
    pub counts: SeverityCounts,
    pub criteria: BTreeMap<String, CriterionSummary>,
    pub wcag_version: String,
    pub strict: bool,
}

impl ValidationReport {
    pub fn new(issues: Vec<ValidationIssue>, version: WcagVersion, strict: bool) -> Self {
        let mut counts = SeverityCounts::default();
        let mut criteria: BTreeMap<String, CriterionSummary> = BTreeMap::new();

        for issue in &issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
            criteria
                .entry(issue.criterion_id.clone())
                .and_modify(|s| {
                    s.count += 1;
                    s.worst = s.worst.min(issue.severity);
                })
                .or_insert(CriterionSummary {
                    count: 1,
                    worst: issue.severity,
                });
        }

        Self {
            total_issues: issues.len(),
            wcag_aa_compliant: !issues.iter().any(|i| i.severity.blocks_aa()),
            issues,
            counts,
            criteria,
            wcag_version: version.to_string(),
            strict,
        }
    }

    /// Issues produced by one catalogue entry.
    pub fn issues_for<'a>(&'a self, check: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues.iter().filter(move |i| i.check == check)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text rendering listing the same issues in the same order.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "WCAG {} validation report", self.wcag_version);
        let _ = writeln!(
            out,
            "AA compliant: {}",
            if self.wcag_aa_compliant { "yes" } else { "no" }
        );
        let _ = writeln!(
            out,
            "Issues: {} (critical {}, high {}, medium {}, low {})",
            self.total_issues,
            self.counts.critical,
            self.counts.high,
            self.counts.medium,
            self.counts.low
        );
        if self.strict {
            out.push_str("Strict mode: ambiguous contrast reported as high\n");
        }

        for (i, issue) in self.issues.iter().enumerate() {
            let _ = write!(
                out,
                "\n{}. [{}] {} ({}): {}",
                i + 1,
                issue.severity.as_str().to_uppercase(),
                issue.criterion_id,
                issue.check,
                issue.message
            );
            if let Some(location) = &issue.location {
                let _ = write!(out, "\n   at {location}");
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(criterion: &str, check: &str, severity: Severity) -> ValidationIssue {
        ValidationIssue {
            criterion_id: criterion.to_string(),
            check: check.to_string(),
            severity,
            message: format!("{check} problem"),
            location: Some("html > body".to_string()),
        }
    }

    #[test]
    fn compliance_follows_severity() {
        let report = ValidationReport::new(
            vec![issue("1.3.1", "landmarks", Severity::Medium), issue("1.4.10", "viewport", Severity::Low)],
            WcagVersion::V2_2,
            false,
        );
        assert!(report.wcag_aa_compliant);
        assert_eq!(report.total_issues, 2);

        let report = ValidationReport::new(
            vec![issue("2.4.1", "bypass-blocks", Severity::Critical)],
            WcagVersion::V2_2,
            false,
        );
        assert!(!report.wcag_aa_compliant);
        assert_eq!(report.counts.critical, 1);
    }

    #[test]
    fn criteria_summary_tracks_worst() {
        let report = ValidationReport::new(
            vec![
                issue("1.3.1", "tables", Severity::Medium),
                issue("1.3.1", "tables", Severity::Critical),
            ],
            WcagVersion::V2_1,
            false,
        );
        let summary = &report.criteria["1.3.1"];
        assert_eq!(summary.count, 2);
        assert_eq!(summary.worst, Severity::Critical);
        assert_eq!(report.issues_for("tables").count(), 2);
    }

    #[test]
    fn renderings_share_order() {
        let report = ValidationReport::new(
            vec![
                issue("3.1.1", "language", Severity::Critical),
                issue("2.4.2", "page-title", Severity::Critical),
            ],
            WcagVersion::V2_2,
            true,
        );
        let text = report.to_text();
        assert!(text.find("language").unwrap() < text.find("page-title").unwrap());
        assert!(text.contains("1. [CRITICAL] 3.1.1"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["issues"][0]["check"], "language");
        assert_eq!(json["issues"][1]["check"], "page-title");
        assert_eq!(json["total_issues"], 2);
        assert_eq!(json["wcag_aa_compliant"], false);
        assert_eq!(json["issues"][0]["severity"], "critical");
    }
}
