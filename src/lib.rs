//! # wcagify
//!
//! Turns text extracted from born-digital or scanned documents into semantic,
//! WCAG 2.1/2.2 AA oriented HTML, and validates HTML against an audited
//! subset of the success criteria.
//!
//! ## Pipeline
//!
//! ```text
//! extract -> classify -> assemble -> generate -> enhance -> validate
//! ```
//!
//! - [`extract`]: text and page boundaries from a file or an external tool
//! - [`classify`]: lines to typed [`StructuralBlock`]s
//! - [`assemble`]: blocks to a [`Section`] tree
//! - [`generate`]: the tree to an HTML skeleton
//! - [`enhance`]: six idempotent accessibility phases
//! - [`validate`]: a [`ValidationReport`] with WCAG-mapped severities
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use wcagify::{Config, Converter};
//!
//! let converter = Converter::new(Config::default());
//! let result = converter.convert(Path::new("paper.txt"))?;
//! println!("{}", result.report.to_text());
//! # Ok::<(), wcagify::Error>(())
//! ```
//!
//! The stages are usable on their own. Enhancing and validating existing
//! HTML needs no extractor:
//!
//! ```
//! use wcagify::{EnhancementOptions, ValidatorConfig, enhance_html, validate};
//!
//! let html = enhance_html("<h1>Report</h1><p>Body</p>", &EnhancementOptions::default());
//! let report = validate(&html, &ValidatorConfig::default());
//! assert!(report.wcag_aa_compliant);
//! ```

pub mod alt_text;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod dom;
pub mod enhance;
pub mod error;
pub mod extract;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod slug;
pub mod util;
pub mod validate;

pub(crate) mod patterns;

pub use alt_text::{AltText, AltTextCatalog};
pub use config::{
    ClassifierConfig, Config, EnhancementOptions, ExtractionConfig, GeneratorConfig,
    ValidatorConfig, WcagVersion,
};
pub use dom::HtmlDocument;
pub use enhance::{enhance, enhance_html};
pub use error::{Error, Result};
pub use model::{BlockKind, LineStream, Section, StructuralBlock};
pub use pipeline::{CancellationToken, ConversionResult, Converter};
pub use validate::{Severity, ValidationIssue, ValidationReport, validate};
