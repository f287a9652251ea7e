//! End-to-end conversion tests.
//!
//! These run whole documents through [`Converter`], from a text file or a
//! scripted extractor, and check the written HTML and report.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wcagify::extract::{Extraction, FallbackExtractor, TextExtractor};
use wcagify::{Config, Converter, Error, Severity, WcagVersion};

const PAPER: &str = "\
SOIL MOISTURE AND CROP YIELDS
I. INTRODUCTION
Rainfall varies widely across the region and drives most of the
variation in yield reported by growers.
II. METHODS
2.1 Sites
Twelve sites were sampled twice a year.
\u{000C}III. RESULTS
Yields rose with moisture at every site.
REFERENCES
[1] A. Author, Soil water, 2001.
[2] B. Author, Rain and yield, 2003.
";

/// Extractor returning fixed text, optionally after a delay.
struct Scripted {
    text: &'static str,
    delay: Duration,
}

impl Scripted {
    fn new(text: &'static str) -> Self {
        Self {
            text,
            delay: Duration::ZERO,
        }
    }
}

impl TextExtractor for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn extract(&self, _source: &Path) -> wcagify::Result<Extraction> {
        std::thread::sleep(self.delay);
        Ok(Extraction::from_text(self.text))
    }
}

struct Failing;

impl TextExtractor for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn extract(&self, _source: &Path) -> wcagify::Result<Extraction> {
        Err(Error::Extraction("no text layer".to_string()))
    }
}

fn write_source(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

// ============================================================================
// Text files
// ============================================================================

#[test]
fn test_text_file_to_accessible_html() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "paper.txt", PAPER);
    let out = dir.path().join("out");

    let files = Converter::new(Config::default())
        .convert_to_dir(&source, &out, None)
        .expect("conversion failed");

    assert_eq!(files.html_path, out.join("paper_accessible.html"));
    assert_eq!(files.report_path, out.join("paper_report.json"));

    let html = std::fs::read_to_string(&files.html_path).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<html lang=\"en\""));
    assert!(html.contains("<main id=\"main-content\">"));
    assert!(html.contains("class=\"skip-link\""));
    assert!(html.contains("data-wcagify=\"accessibility\""));
    assert!(html.contains("<h2 id=\"sites-heading\">"));

    let result = &files.result;
    assert_eq!(result.pages_processed, 2);
    assert!(result.total_words > 40);
    assert_eq!(result.report.counts.critical, 0, "{}", result.report.to_text());
}

#[test]
fn test_report_json_shape() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "paper.txt", PAPER);

    let files = Converter::new(Config::default())
        .convert_to_dir(&source, dir.path(), Some("yields"))
        .unwrap();
    assert!(files.report_path.ends_with("yields_report.json"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files.report_path).unwrap()).unwrap();
    assert_eq!(json["pages_processed"], 2);
    assert!(json["title"].is_string());
    let report = &json["report"];
    assert_eq!(report["wcag_version"], "2.2");
    assert!(report["wcag_aa_compliant"].is_boolean());
    assert!(report["counts"]["critical"].is_number());
    assert!(report["issues"].is_array());
}

#[test]
fn test_configured_title_wins() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "paper.txt", PAPER);
    let mut config = Config::default();
    config.generator.title = Some("Field Study 2024".to_string());

    let result = Converter::new(config).convert(&source).unwrap();
    assert_eq!(result.title, "Field Study 2024");
    assert!(result.html.contains("<title>Field Study 2024</title>"));
}

#[test]
fn test_missing_file_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let err = Converter::new(Config::default())
        .convert_to_dir(&dir.path().join("absent.txt"), &out, None)
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");
    assert!(!out.exists());
}

#[test]
fn test_blank_text_is_empty_extraction() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "blank.txt", "\n   \n\u{000C}\n");
    let err = Converter::new(Config::default()).convert(&source).unwrap_err();
    assert!(matches!(err, Error::EmptyExtraction(_)));
}

// ============================================================================
// Extractors
// ============================================================================

#[test]
fn test_fallback_extractor_rescues_failed_primary() {
    let extractor = FallbackExtractor::new(Box::new(Failing), Box::new(Scripted::new(PAPER)), 10);
    let result = Converter::new(Config::default())
        .with_extractor(Arc::new(extractor))
        .convert(Path::new("scan.pdf"))
        .unwrap();
    assert!(result.html.contains("Twelve sites were sampled"));
}

#[test]
fn test_extraction_errors_propagate() {
    let err = Converter::new(Config::default())
        .with_extractor(Arc::new(Failing))
        .convert(Path::new("scan.pdf"))
        .unwrap_err();
    assert!(matches!(err, Error::Extraction(_)));
}

#[test]
fn test_hung_extractor_times_out() {
    let mut config = Config::default();
    config.extraction.timeout_secs = 1;
    let slow = Scripted {
        text: PAPER,
        delay: Duration::from_secs(30),
    };
    let err = Converter::new(config)
        .with_extractor(Arc::new(slow))
        .convert(Path::new("slow.pdf"))
        .unwrap_err();
    assert!(matches!(err, Error::ExtractionTimeout { .. }));
}

#[cfg(unix)]
#[test]
fn test_fallback_runs_after_hung_primary() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "scan.pdf", PAPER);
    let shell = |script: &str| -> Vec<String> {
        ["sh", "-c", script, "{input}"].map(String::from).to_vec()
    };
    let mut config = Config::default();
    config.extraction.timeout_secs = 4;
    config.extraction.command = shell("exec sleep 30");
    // Slower than the worker's grace period, inside its own timeout.
    config.extraction.fallback_command = Some(shell("sleep 3; cat \"$0\""));

    let result = Converter::new(config).convert(&source).unwrap();
    assert!(result.html.contains("Twelve sites were sampled"));
}

#[test]
fn test_cancellation_token_is_shared() {
    let converter = Converter::new(Config::default()).with_extractor(Arc::new(Scripted::new(PAPER)));
    let token = converter.cancellation_token();
    assert!(converter.convert(Path::new("a.pdf")).is_ok());
    token.cancel();
    assert!(matches!(
        converter.convert(Path::new("a.pdf")),
        Err(Error::Cancelled)
    ));
}

// ============================================================================
// Versions
// ============================================================================

#[test]
fn test_wcag_21_output_omits_22_rules() {
    let mut config = Config::default();
    config.enhancement.wcag_version = WcagVersion::V2_1;
    config.validation.wcag_version = WcagVersion::V2_1;
    let result = Converter::new(config)
        .with_extractor(Arc::new(Scripted::new(PAPER)))
        .convert(Path::new("paper.pdf"))
        .unwrap();

    assert!(!result.html.contains("scroll-margin"));
    assert_eq!(result.report.wcag_version, "2.1");
    assert!(
        result
            .report
            .issues
            .iter()
            .all(|i| !["2.4.11", "2.4.13", "2.5.8"].contains(&i.criterion_id.as_str()))
    );
    assert!(result.report.issues.iter().all(|i| i.severity != Severity::Critical));
}
