//! Externally supplied image descriptions.
//!
//! Alt text is produced outside this crate (by a reviewer or a description
//! service) and handed over as JSON keyed by image identifier. Two layouts
//! are accepted:
//!
//! ```json
//! {"fig1.png": {"alt": "Bar chart", "long_description": "..."}}
//! ```
//!
//! ```json
//! [{"filename": "fig1.png", "alt_text": "Bar chart", "caption": "Figure 1: ..."}]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Description of one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltText {
    #[serde(alias = "alt_text")]
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Deserialize)]
struct ListEntry {
    #[serde(alias = "id")]
    filename: String,
    #[serde(flatten)]
    text: AltText,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Map(BTreeMap<String, AltText>),
    List(Vec<ListEntry>),
}

/// Alt text keyed by image identifier (file name, `data-image-id` or `id`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltTextCatalog {
    entries: BTreeMap<String, AltText>,
}

impl AltTextCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries = match serde_json::from_str::<CatalogFile>(json)? {
            CatalogFile::Map(map) => map,
            CatalogFile::List(list) => list.into_iter().map(|e| (e.filename, e.text)).collect(),
        };
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn insert(&mut self, id: impl Into<String>, text: AltText) {
        self.entries.insert(id.into(), text);
    }

    /// Look up an image by identifier. Path-like keys also match on their
    /// final component, so `images/fig1.png` finds an entry for `fig1.png`.
    pub fn get(&self, id: &str) -> Option<&AltText> {
        self.entries.get(id).or_else(|| {
            let base = id.rsplit('/').next()?;
            self.entries.get(base)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_layout() {
        let catalog = AltTextCatalog::from_json(
            r#"{"fig1.png": {"alt": "Bar chart of results", "long_description": "Bars rise."}}"#,
        )
        .unwrap();
        let entry = catalog.get("fig1.png").unwrap();
        assert_eq!(entry.alt, "Bar chart of results");
        assert_eq!(entry.long_description.as_deref(), Some("Bars rise."));
    }

    #[test]
    fn list_layout() {
        let catalog = AltTextCatalog::from_json(
            r#"[{"filename": "page3_img1.png", "alt_text": "Map", "caption": "Figure 2: Site"}]"#,
        )
        .unwrap();
        let entry = catalog.get("page3_img1.png").unwrap();
        assert_eq!(entry.alt, "Map");
        assert_eq!(entry.caption.as_deref(), Some("Figure 2: Site"));
    }

    #[test]
    fn path_lookup_falls_back_to_file_name() {
        let mut catalog = AltTextCatalog::new();
        catalog.insert("fig1.png", AltText {
            alt: "Chart".into(),
            ..Default::default()
        });
        assert!(catalog.get("images/fig1.png").is_some());
        assert!(catalog.get("images/fig2.png").is_none());
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(AltTextCatalog::from_json("{not json").is_err());
    }
}
