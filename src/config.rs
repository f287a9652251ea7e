//! Configuration for every pipeline stage.
//!
//! Each section deserializes with defaults, so an empty TOML file (or no file
//! at all) yields a configuration that enables every WCAG-relevant
//! transformation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::alt_text::AltTextCatalog;
use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub generator: GeneratorConfig,
    pub enhancement: EnhancementOptions,
    pub validation: ValidatorConfig,
    pub extraction: ExtractionConfig,
}

impl Config {
    /// Load a configuration file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Reject values no stage can work with.
    pub fn check(&self) -> Result<()> {
        let c = &self.classifier;
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(Error::Config(format!(
                "classifier.confidence_threshold must be within 0..=1, got {}",
                c.confidence_threshold
            )));
        }
        if c.noise_window < 2 {
            return Err(Error::Config(
                "classifier.noise_window must be at least 2".to_string(),
            ));
        }
        if self.extraction.timeout_secs == 0 {
            return Err(Error::Config(
                "extraction.timeout_secs must be positive".to_string(),
            ));
        }
        if self.extraction.command.is_empty() {
            return Err(Error::Config("extraction.command is empty".to_string()));
        }
        Ok(())
    }
}

/// WCAG version gating the 2.2-only checks and transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WcagVersion {
    V2_1,
    #[default]
    V2_2,
}

impl WcagVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WcagVersion::V2_1 => "2.1",
            WcagVersion::V2_2 => "2.2",
        }
    }

    /// Focus-not-obscured, focus-appearance and target-size apply.
    pub fn is_2_2(&self) -> bool {
        *self >= WcagVersion::V2_2
    }
}

impl fmt::Display for WcagVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WcagVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "2.1" | "21" => Ok(WcagVersion::V2_1),
            "2.2" | "22" => Ok(WcagVersion::V2_2),
            other => Err(format!("unsupported WCAG version: {other} (expected 2.1 or 2.2)")),
        }
    }
}

impl Serialize for WcagVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WcagVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Block classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Blocks below this confidence are flagged for review.
    pub confidence_threshold: f32,
    /// Longer lines matching a heading pattern are treated as merged headings.
    pub max_heading_len: usize,
    /// Number of non-blank lines in the garbled-region window.
    pub noise_window: usize,
    /// Heading-pattern density above which a window looks interleaved.
    pub max_heading_density: f32,
    /// Line-length coefficient of variation above which a window looks interleaved.
    pub max_length_cv: f32,
    /// Additional words the OCR repair may reassemble.
    pub extra_ocr_words: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            max_heading_len: 80,
            noise_window: 8,
            max_heading_density: 0.4,
            max_length_cv: 0.9,
            extra_ocr_words: Vec::new(),
        }
    }
}

/// Semantic HTML generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub language: String,
    /// Document title; detected from the blocks when unset.
    pub title: Option<String>,
    /// Threshold below which Unclassified blocks are emitted as review regions.
    pub review_threshold: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            title: None,
            review_threshold: 0.5,
        }
    }
}

/// Accessibility enhancer options. Every transformation is on by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementOptions {
    pub add_skip_link: bool,
    pub aria_landmarks: bool,
    pub table_of_contents: bool,
    pub semantic_lists: bool,
    pub detect_tables: bool,
    pub figure_descriptions: bool,
    pub lazy_images: bool,
    pub cross_reference_links: bool,
    pub inject_css: bool,
    pub dark_mode: bool,
    pub reduced_motion: bool,
    pub print_styles: bool,
    pub cleanup: bool,
    pub wcag_version: WcagVersion,
    /// Minimum interactive target size in CSS pixels (WCAG 2.2 only).
    pub target_size_minimum: u32,
    /// Focus outline thickness in CSS pixels.
    pub focus_outline_width: u32,
    /// Value for `<html lang>` when the document has none.
    pub language: String,
    /// Value for `<title>` when the document has none.
    pub document_title: Option<String>,
    /// Alt text supplied by an external collaborator, keyed by image id.
    #[serde(skip)]
    pub alt_text: AltTextCatalog,
}

impl Default for EnhancementOptions {
    fn default() -> Self {
        Self {
            add_skip_link: true,
            aria_landmarks: true,
            table_of_contents: true,
            semantic_lists: true,
            detect_tables: true,
            figure_descriptions: true,
            lazy_images: true,
            cross_reference_links: true,
            inject_css: true,
            dark_mode: true,
            reduced_motion: true,
            print_styles: true,
            cleanup: true,
            wcag_version: WcagVersion::default(),
            target_size_minimum: 24,
            focus_outline_width: 3,
            language: "en".to_string(),
            document_title: None,
            alt_text: AltTextCatalog::default(),
        }
    }
}

/// Compliance validator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Promote ambiguous contrast findings from Medium to High.
    pub strict: bool,
    pub wcag_version: WcagVersion,
}

/// Text-extraction collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub timeout_secs: u64,
    /// External command; `{input}` is replaced with the source path.
    pub command: Vec<String>,
    /// Command tried when the primary yields too little text (OCR).
    pub fallback_command: Option<Vec<String>>,
    /// Minimum non-whitespace characters before the fallback is tried.
    pub min_text_len: usize,
    /// Directory of images extracted alongside the text, embedded into the
    /// document on the page they came from.
    pub image_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            command: ["pdftotext", "{input}", "-"]
                .map(String::from)
                .to_vec(),
            fallback_command: None,
            min_text_len: 100,
            image_dir: None,
        }
    }
}
