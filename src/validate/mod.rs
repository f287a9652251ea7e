//! Compliance validator.
//!
//! Evaluates HTML against a fixed catalogue of WCAG success criteria. Every
//! check is independent and reads the same parsed document and stylesheet;
//! the catalogue order fixes the order of the report, and each check reports
//! in document order, so repeated runs over the same input produce identical
//! reports.
//!
//! Severity follows the conformance class of a finding:
//!
//! | Class | Severity |
//! |---|---|
//! | Level A structural absence | Critical |
//! | Level AA | High |
//! | Best practice | Medium (ambiguous contrast: High in strict mode) |
//! | Cosmetic | Low |

pub(crate) mod checks;
pub mod contrast;
pub mod css;
mod report;

use tracing::debug;

use crate::config::{ValidatorConfig, WcagVersion};
use crate::dom::HtmlDocument;

pub use checks::CATALOGUE;
pub use css::Stylesheet;
pub use report::{CriterionSummary, Severity, SeverityCounts, ValidationIssue, ValidationReport};

/// Conformance class of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conformance {
    A,
    AA,
    BestPractice,
    /// Best practice that likely hides an AA failure; strict mode promotes it.
    LikelyAA,
    Cosmetic,
}

impl Conformance {
    pub fn severity(self, strict: bool) -> Severity {
        match self {
            Conformance::A => Severity::Critical,
            Conformance::AA => Severity::High,
            Conformance::LikelyAA if strict => Severity::High,
            Conformance::BestPractice | Conformance::LikelyAA => Severity::Medium,
            Conformance::Cosmetic => Severity::Low,
        }
    }
}

/// Everything a check may read.
pub struct CheckContext<'a> {
    pub doc: &'a HtmlDocument,
    pub sheet: Stylesheet,
    pub config: &'a ValidatorConfig,
}

impl<'a> CheckContext<'a> {
    pub fn new(doc: &'a HtmlDocument, config: &'a ValidatorConfig) -> Self {
        Self {
            sheet: collect_styles(doc),
            doc,
            config,
        }
    }
}

/// One catalogue entry.
pub trait Check: Send + Sync {
    /// Stable identifier reported with every issue.
    fn id(&self) -> &'static str;

    /// Whether the check is part of the given WCAG version.
    fn applies_to(&self, _version: WcagVersion) -> bool {
        true
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings);
}

/// Collects the issues of one check.
pub struct Findings {
    check: &'static str,
    strict: bool,
    issues: Vec<ValidationIssue>,
}

impl Findings {
    fn new(check: &'static str, strict: bool) -> Self {
        Self {
            check,
            strict,
            issues: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        criterion: &str,
        class: Conformance,
        message: impl Into<String>,
        location: Option<String>,
    ) {
        self.issues.push(ValidationIssue {
            criterion_id: criterion.to_string(),
            check: self.check.to_string(),
            severity: class.severity(self.strict),
            message: message.into(),
            location,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate an HTML string.
pub fn validate(html: &str, config: &ValidatorConfig) -> ValidationReport {
    validate_document(&HtmlDocument::parse(html), config)
}

/// Validate a parsed document.
pub fn validate_document(doc: &HtmlDocument, config: &ValidatorConfig) -> ValidationReport {
    let cx = CheckContext::new(doc, config);
    let mut issues = Vec::new();

    for check in CATALOGUE {
        if !check.applies_to(config.wcag_version) {
            continue;
        }
        let mut findings = Findings::new(check.id(), config.strict);
        check.run(&cx, &mut findings);
        debug!(check = check.id(), issues = findings.issues.len(), "Check finished");
        issues.extend(findings.issues);
    }

    ValidationReport::new(issues, config.wcag_version, config.strict)
}

/// Gather every `<style>` element into one sheet. A `media` attribute wraps
/// the element's rules in the matching media block.
fn collect_styles(doc: &HtmlDocument) -> Stylesheet {
    let mut sheet = Stylesheet::default();
    for style in doc.elements_by_tag("style") {
        let css = doc.text_content(style);
        match doc.attr(style, "media").map(str::trim) {
            Some(media) if !media.is_empty() && media != "all" => {
                sheet.append(&format!("@media {media} {{{css}}}"))
            }
            _ => sheet.append(&css),
        }
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLIANT: &str = r##"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1">
<title>Paper</title></head>
<body>
<a class="skip-link" href="#main-content">Skip to main content</a>
<main id="main-content">
<h1>Paper</h1>
<p>Body text.</p>
<h2>Method</h2>
<p>More text.</p>
</main>
<footer role="contentinfo"><p>Footer</p></footer>
</body>
</html>"##;

    fn checks_of(report: &ValidationReport) -> Vec<&str> {
        report.issues.iter().map(|i| i.check.as_str()).collect()
    }

    #[test]
    fn compliant_document_has_no_issues() {
        let report = validate(COMPLIANT, &ValidatorConfig::default());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(report.wcag_aa_compliant);
    }

    #[test]
    fn bare_document() {
        let report = validate("<p>hello</p>", &ValidatorConfig::default());
        let checks = checks_of(&report);
        for expected in ["language", "page-title", "bypass-blocks", "landmarks", "headings", "viewport"] {
            assert!(checks.contains(&expected), "missing {expected}: {checks:?}");
        }
        assert!(!report.wcag_aa_compliant);
        let language = report.issues_for("language").next().unwrap();
        assert_eq!(language.severity, Severity::Critical);
        assert_eq!(language.criterion_id, "3.1.1");
    }

    #[test]
    fn report_follows_catalogue_order() {
        let report = validate("<p>hello</p>", &ValidatorConfig::default());
        let position = |id: &str| CATALOGUE.iter().position(|c| c.id() == id).unwrap();
        let order: Vec<usize> = report.issues.iter().map(|i| position(&i.check)).collect();
        assert!(order.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn version_gates_two_two_checks() {
        let html = COMPLIANT.replace(
            "</head>",
            "<style>button { width: 16px; height: 16px; }</style></head>",
        );
        let v22 = validate(&html, &ValidatorConfig::default());
        assert_eq!(v22.issues_for("target-size").count(), 1);

        let v21 = validate(
            &html,
            &ValidatorConfig {
                wcag_version: WcagVersion::V2_1,
                ..Default::default()
            },
        );
        assert_eq!(v21.issues_for("target-size").count(), 0);
        assert!(v21.wcag_aa_compliant);
    }

    #[test]
    fn strict_mode_promotes_ambiguous_contrast() {
        let html = COMPLIANT.replace(
            "</head>",
            "<style>.note { color: var(--undefined); background: #fff; }</style></head>",
        );
        let relaxed = validate(&html, &ValidatorConfig::default());
        let issue = relaxed.issues_for("contrast").next().unwrap();
        assert_eq!(issue.severity, Severity::Medium);
        assert!(relaxed.wcag_aa_compliant);

        let strict = validate(
            &html,
            &ValidatorConfig {
                strict: true,
                ..Default::default()
            },
        );
        assert_eq!(strict.issues_for("contrast").next().unwrap().severity, Severity::High);
        assert!(!strict.wcag_aa_compliant);
    }

    #[test]
    fn style_media_attribute() {
        let html = COMPLIANT.replace(
            "</head>",
            "<style media=\"print\">p { color: #aaa; background: #fff; }</style></head>",
        );
        let report = validate(&html, &ValidatorConfig::default());
        let issue = report.issues_for("contrast").next().unwrap();
        assert!(issue.message.contains("@media print"), "{}", issue.message);
    }
}
