//! Images and tables reported by the text-extraction collaborator.

use std::path::PathBuf;

use serde::Serialize;

/// Where an extracted image's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// A file written next to the output document.
    Path(PathBuf),
    /// Inline bytes, embedded as a data URI.
    Data {
        mime: String,
        #[serde(skip)]
        bytes: Vec<u8>,
    },
}

/// An image extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    /// Key used to look up external alt text.
    pub id: String,
    /// 1-based page number.
    pub page: usize,
    pub source: ImageSource,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageAsset {
    pub fn new(id: impl Into<String>, page: usize, source: ImageSource) -> Self {
        Self {
            id: id.into(),
            page,
            source,
            alt: None,
            caption: None,
            width: None,
            height: None,
        }
    }
}

/// A table extracted from a page with its cell grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableAsset {
    /// 1-based page number.
    pub page: usize,
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
