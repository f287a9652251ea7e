//! Error types for wcagify operations.
//!
//! Only failures of the text-extraction collaborator, configuration problems
//! and cancellation are errors. Ambiguous structure, skipped enhancements and
//! validation findings are reported as data, never as `Err`.

use thiserror::Error;

/// Errors that can abort a conversion.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Text extraction timed out after {seconds}s")]
    ExtractionTimeout { seconds: u64 },

    #[error("No text extracted from {0}")]
    EmptyExtraction(String),

    #[error("Conversion cancelled")]
    Cancelled,
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
