//! Slug generation for element ids.

use std::collections::HashSet;

/// Generate a GitHub-style slug from text.
///
/// Converts text to lowercase, replaces spaces and special characters with hyphens,
/// and removes consecutive/leading/trailing hyphens.
///
/// # Examples
///
/// ```
/// use wcagify::slug::slugify;
///
/// assert_eq!(slugify("Related Work"), "related-work");
/// assert_eq!(slugify("I. INTRODUCTION"), "i-introduction");
/// assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
/// ```
pub fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Hands out unique ids, suffixing `-2`, `-3`, ... on collision.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from ids already present in a document.
    pub fn with_reserved<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            used: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Unique slug for `text`; `fallback` is used when the slug is empty.
    pub fn unique(&mut self, text: &str, fallback: &str) -> String {
        let base = match slugify(text) {
            s if s.is_empty() => fallback.to_string(),
            // ids starting with a digit are awkward in CSS selectors
            s if s.starts_with(|c: char| c.is_ascii_digit()) => format!("{fallback}-{s}"),
            s => s,
        };
        self.claim(base)
    }

    /// Claim `base` or the first free suffixed variant of it.
    pub fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| self.used.insert(candidate.clone()))
            .unwrap_or(base)
    }

    pub fn reserve(&mut self, id: impl Into<String>) {
        self.used.insert(id.into());
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}
