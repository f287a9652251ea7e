//! Whole-document conversion.
//!
//! A [`Converter`] runs extraction, classification, assembly, generation,
//! enhancement and validation in sequence. Each stage consumes the complete
//! output of the one before it. Cancellation is coarse: the token is checked
//! before every stage, never inside one.
//!
//! ```no_run
//! use std::path::Path;
//! use wcagify::{Config, Converter};
//!
//! let converter = Converter::new(Config::default());
//! let files = converter.convert_to_dir(Path::new("paper.pdf"), Path::new("out"), None)?;
//! println!("{} issues", files.result.report.total_issues);
//! # Ok::<(), wcagify::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::alt_text::AltTextCatalog;
use crate::assemble::assemble;
use crate::classify::{classify, detect_title};
use crate::config::Config;
use crate::enhance::enhance_html;
use crate::error::{Error, Result};
use crate::extract::{Extraction, TextExtractor, extract_with_timeout, extractor_for};
use crate::generate::{PageAssets, generate_with_assets};
use crate::model::{BlockKind, ImageAsset, StructuralBlock};
use crate::validate::{ValidationReport, validate};

/// Title used when neither configuration nor content supplies one.
const FALLBACK_TITLE: &str = "Untitled document";

/// Extra time the worker bound allows beyond the command's own deadline, so
/// a hung command is killed before its worker is abandoned.
const EXTRACTION_GRACE: Duration = Duration::from_secs(2);

/// Shared flag that stops a conversion before its next stage.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output and statistics of one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    #[serde(skip)]
    pub html: String,
    pub title: String,
    #[serde(skip)]
    pub blocks: Vec<StructuralBlock>,
    pub pages_processed: usize,
    pub total_words: usize,
    pub images_embedded: usize,
    pub images_with_alt_text: usize,
    /// Low-confidence blocks emitted as review regions.
    pub review_regions: usize,
    pub report: ValidationReport,
}

impl ConversionResult {
    /// Statistics and validation report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Files written by [`Converter::convert_to_dir`].
#[derive(Debug, Clone)]
pub struct ConvertedFiles {
    pub html_path: PathBuf,
    pub report_path: PathBuf,
    pub result: ConversionResult,
}

/// Converts source documents into accessible HTML.
pub struct Converter {
    config: Config,
    extractor: Option<Arc<dyn TextExtractor>>,
    cancel: CancellationToken,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            extractor: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `extractor` for every source instead of choosing one from the
    /// configuration.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn checkpoint(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!(stage, "Conversion cancelled");
            return Err(Error::Cancelled);
        }
        debug!(stage, "Starting stage");
        Ok(())
    }

    /// Convert one source document.
    pub fn convert(&self, source: &Path) -> Result<ConversionResult> {
        self.checkpoint("extraction")?;
        let extractor = match &self.extractor {
            Some(extractor) => Arc::clone(extractor),
            None => extractor_for(source, &self.config.extraction)?,
        };
        let budget = extractor
            .time_budget()
            .unwrap_or(Duration::from_secs(self.config.extraction.timeout_secs));
        let timeout = budget + EXTRACTION_GRACE;
        let extraction = extract_with_timeout(extractor, source, timeout)?;
        if extraction.text_len() == 0 {
            return Err(Error::EmptyExtraction(source.display().to_string()));
        }
        self.convert_extraction(extraction)
    }

    /// Run every stage after extraction.
    pub fn convert_extraction(&self, extraction: Extraction) -> Result<ConversionResult> {
        let started = Instant::now();
        let config = &self.config;
        let Extraction {
            lines,
            mut images,
            tables,
            page_count,
        } = extraction;

        self.checkpoint("classification")?;
        let blocks = classify(&lines, &config.classifier);

        self.checkpoint("assembly")?;
        let tree = assemble(&blocks);

        self.checkpoint("generation")?;
        let title = config
            .generator
            .title
            .clone()
            .or_else(|| config.enhancement.document_title.clone())
            .unwrap_or_else(|| detect_title(&blocks, FALLBACK_TITLE));
        apply_catalogue(&mut images, &config.enhancement.alt_text);
        let assets = PageAssets {
            stream: &lines,
            images: &images,
            tables: &tables,
        };
        let generated = generate_with_assets(&tree, &title, &config.generator, Some(assets));

        self.checkpoint("enhancement")?;
        let html = enhance_html(&generated, &config.enhancement);

        self.checkpoint("validation")?;
        let report = validate(&html, &config.validation);

        let review_threshold = config.generator.review_threshold;
        let result = ConversionResult {
            html,
            title,
            pages_processed: page_count.max(lines.page_count()),
            total_words: lines.word_count(),
            images_embedded: images.len(),
            images_with_alt_text: images
                .iter()
                .filter(|i| i.alt.as_deref().is_some_and(|a| !a.trim().is_empty()))
                .count(),
            review_regions: blocks
                .iter()
                .filter(|b| b.kind == BlockKind::Unclassified && b.needs_review(review_threshold))
                .count(),
            blocks,
            report,
        };
        info!(
            title = %result.title,
            pages = result.pages_processed,
            blocks = result.blocks.len(),
            issues = result.report.total_issues,
            compliant = result.report.wcag_aa_compliant,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversion finished"
        );
        Ok(result)
    }

    /// Convert `source` and write `{name}_accessible.html` and
    /// `{name}_report.json` into `out_dir`. `name` defaults to the source file
    /// stem. Nothing is written when conversion fails.
    pub fn convert_to_dir(
        &self,
        source: &Path,
        out_dir: &Path,
        name: Option<&str>,
    ) -> Result<ConvertedFiles> {
        let result = self.convert(source)?;
        let report = result.to_json()?;

        let stem = match name {
            Some(name) => name.to_string(),
            None => source
                .file_stem()
                .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned()),
        };
        std::fs::create_dir_all(out_dir)?;
        let html_path = out_dir.join(format!("{stem}_accessible.html"));
        let report_path = out_dir.join(format!("{stem}_report.json"));
        std::fs::write(&html_path, &result.html)?;
        std::fs::write(&report_path, report)?;
        info!(html = %html_path.display(), report = %report_path.display(), "Wrote output");

        Ok(ConvertedFiles {
            html_path,
            report_path,
            result,
        })
    }
}

/// Fill missing alt text and captions of extracted images from the catalogue.
fn apply_catalogue(images: &mut [ImageAsset], catalog: &AltTextCatalog) {
    if catalog.is_empty() {
        return;
    }
    for image in images {
        let Some(entry) = catalog.get(&image.id) else {
            continue;
        };
        if image.alt.as_deref().is_none_or(|a| a.trim().is_empty()) && !entry.alt.trim().is_empty() {
            image.alt = Some(entry.alt.trim().to_string());
        }
        if image.caption.is_none() {
            image.caption = entry
                .caption
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alt_text::AltText;
    use crate::model::ImageSource;
    use crate::validate::Severity;

    struct Lines(&'static str);

    impl TextExtractor for Lines {
        fn name(&self) -> &str {
            "lines"
        }

        fn extract(&self, _source: &Path) -> Result<Extraction> {
            Ok(Extraction::from_text(self.0))
        }
    }

    fn converter(text: &'static str) -> Converter {
        Converter::new(Config::default()).with_extractor(Arc::new(Lines(text)))
    }

    const SCENARIO: &str = "I. INTRODUCTION\nThis is body text.\n1.1 Background\nMore text.\n";

    #[test]
    fn scenario_converts_to_compliant_html() {
        let result = converter(SCENARIO).convert(Path::new("paper.txt")).unwrap();
        assert!(result.html.contains("class=\"skip-link\""));
        assert_eq!(result.html.matches("<h1").count(), 1);
        assert_eq!(result.html.matches("<h2").count(), 1);
        assert_eq!(result.report.counts.critical, 0);
        assert_eq!(result.blocks.len(), 4);
        assert_eq!(result.pages_processed, 1);
        assert_eq!(result.total_words, 10);
        assert_eq!(result.review_regions, 0);
    }

    #[test]
    fn cancelled_before_start() {
        let converter = converter(SCENARIO);
        converter.cancellation_token().cancel();
        let err = converter.convert(Path::new("paper.txt")).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn empty_extraction_is_an_error() {
        let err = converter(" \n\n").convert(Path::new("blank.txt")).unwrap_err();
        assert!(matches!(err, Error::EmptyExtraction(_)));
    }

    #[test]
    fn output_files_only_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let files = converter(SCENARIO)
            .convert_to_dir(Path::new("inputs/paper.pdf"), dir.path(), None)
            .unwrap();
        assert_eq!(files.html_path, dir.path().join("paper_accessible.html"));
        let report = std::fs::read_to_string(&files.report_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(json["pages_processed"], 1);
        assert!(json["report"]["issues"].is_array());
        assert!(json.get("html").is_none());

        let failed = tempfile::tempdir().unwrap();
        let out = failed.path().join("out");
        assert!(converter("").convert_to_dir(Path::new("x.pdf"), &out, Some("x")).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn garbled_text_survives_a_low_review_threshold() {
        let garbled = "A long line of ordinary body text that runs across the full column width.\n\
                       Results\nof the\nTable\nB. Model\n\
                       accuracy improved considerably over the baseline in every single configuration we tried\n\
                       Fig\n2 The\n\nSetup\nwe observed a substantial drop\nC\n";
        let mut config = Config::default();
        config.generator.review_threshold = 0.05;
        config.check().unwrap();

        let result = Converter::new(config)
            .convert_extraction(Extraction::from_text(garbled))
            .unwrap();
        assert!(result.html.contains("class=\"needs-review\""));
        assert!(result.html.contains("we observed a substantial drop"));
        assert_eq!(result.review_regions, 1);
    }

    #[test]
    fn catalogue_fills_image_alt_text() {
        let mut config = Config::default();
        config.enhancement.alt_text.insert(
            "fig1.png",
            AltText {
                alt: "Map of the study area".to_string(),
                long_description: None,
                caption: Some("Figure 1: Study area".to_string()),
            },
        );
        let mut extraction = Extraction::from_text(SCENARIO);
        let source = ImageSource::Data {
            mime: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        extraction.images.push(ImageAsset::new("fig1.png", 1, source.clone()));
        extraction.images.push(ImageAsset::new("fig2.png", 1, source));

        let result = Converter::new(config).convert_extraction(extraction).unwrap();
        assert_eq!(result.images_embedded, 2);
        assert_eq!(result.images_with_alt_text, 1);
        assert!(result.html.contains("alt=\"Map of the study area\""));
        assert!(result.html.contains("Figure 1: Study area"));
        assert!(result.report.issues.iter().all(|i| i.severity != Severity::Critical));
    }
}
