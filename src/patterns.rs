//! Cached regex patterns.
//!
//! Uses LazyLock to compile patterns once on first use. All patterns are
//! literals, so compilation cannot fail at runtime.

use regex::Regex;
use std::sync::LazyLock;

// === Classifier patterns ===

/// "IV. RESULTS" style section headings.
pub static ROMAN_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>[IVXLC]{1,6})\.\s+(?P<title>\S.*)$").unwrap()
});

/// "2. Methods", "2.1 Sampling", "2.1.3. Weights" style headings.
pub static NUMERIC_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>\d{1,2}(?:\.\d{1,2}){0,3})(?P<dot>\.?)\s+(?P<title>\S.*)$").unwrap()
});

/// "B. Related Work" style subsection headings.
pub static LETTERED_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>[A-H])\.\s+(?P<title>[A-Z][A-Za-z].*)$").unwrap()
});

/// "[12] A. Author, Title..." citation entries.
pub static BRACKET_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<num>\d{1,4})\]\s*(?P<body>\S.*)$").unwrap()
});

/// "12. A. Author, Title..." citation entries inside a references section.
pub static NUMBERED_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>\d{1,4})\.\s+(?P<body>\S.*)$").unwrap()
});

/// Leading "[12]" or "12." marker of a citation paragraph.
pub static CITATION_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\[\d{1,4}\]|\d{1,4}\.)\s*").unwrap());

/// Bulleted or enumerated list items.
pub static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<marker>[-•*▪◦‣–]|\(?\d{1,2}\)|\(?[a-z]\))\s+(?P<body>\S.*)$").unwrap()
});

/// Running page numbers: "12", "Page 12", "12 of 40".
pub static PAGE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:page\s+)?\d{1,4}(?:\s+of\s+\d{1,4})?$").unwrap()
});

/// Lines that look like headings but are bylines, affiliations or artifacts.
pub static NON_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^[A-Z][a-z]+\s+[A-Z][a-z]+$              # First Last
        | ^[A-Z][a-z]+\s+[A-Z][a-z]+\s+[A-Z][a-z]+$  # First Middle Last
        | (?i:university|institute|department|college)
        | @
        | ^(?i:fig\.|figure\s+\d|table\s+\d)
        | ^\d+$
        | ^[A-Z]\s+[A-Z]$
        ",
    )
    .unwrap()
});

/// A stray capital split from the rest of an uppercase word: "R EFERENCES".
pub static SPLIT_CAPITAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]) ([A-Z]{2,})\b").unwrap());

/// Column gap inside a plain-text table row.
pub static COLUMN_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{3,}").unwrap());

/// Runs of whitespace.
pub static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// === Caption and cross-reference patterns ===

/// Caption paragraphs opening with "Figure 3" or "Fig. 3".
pub static FIGURE_CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Figure|Fig\.?)\s+(?P<num>\d+)\b").unwrap()
});

/// Caption paragraphs opening with "Table 2".
pub static TABLE_CAPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Table\s+(?P<num>\d+)\b").unwrap());

/// A line that opens a caption, as in "Table 2: Scores" or "Figure 3. Map".
pub static CAPTION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Table|Figure|Fig\.?)\s+\d+\s*[.:]").unwrap()
});

/// In-text references to figures and tables.
pub static CROSS_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<kind>Figure|Fig\.|Table)\s+(?P<num>\d+)\b").unwrap()
});

// === Validator patterns ===

/// Alt text that describes nothing.
pub static GENERIC_ALT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:image|picture|photo|graphic|icon|img|figure|untitled|spacer|\S+\.(?:png|jpe?g|gif|svg|webp))$")
        .unwrap()
});

/// Link text that says nothing about the destination.
pub static GENERIC_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:click here|here|read more|more|link|this|learn more|this link)$").unwrap()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_patterns() {
        assert!(ROMAN_HEADING_RE.is_match("III. METHODS"));
        assert!(!ROMAN_HEADING_RE.is_match("Intro. text"));
        let caps = NUMERIC_HEADING_RE.captures("2.1.3 Weights").unwrap();
        assert_eq!(&caps["num"], "2.1.3");
        assert_eq!(&caps["title"], "Weights");
        assert!(LETTERED_HEADING_RE.is_match("B. Related Work"));
    }

    #[test]
    fn non_heading_exclusions() {
        assert!(NON_HEADING_RE.is_match("Jane Smith"));
        assert!(NON_HEADING_RE.is_match("AALTO UNIVERSITY"));
        assert!(NON_HEADING_RE.is_match("Table 2 shows"));
        assert!(!NON_HEADING_RE.is_match("TECHNICAL ACTIVITIES"));
    }

    #[test]
    fn cross_ref_pattern() {
        let caps: Vec<_> = CROSS_REF_RE
            .captures_iter("see Figure 2 and Table 10, cf. Fig. 3")
            .map(|c| format!("{} {}", &c["kind"], &c["num"]))
            .collect();
        assert_eq!(caps, vec!["Figure 2", "Table 10", "Fig. 3"]);
    }

    #[test]
    fn generic_text() {
        assert!(GENERIC_ALT_RE.is_match("image"));
        assert!(GENERIC_ALT_RE.is_match("chart.png"));
        assert!(!GENERIC_ALT_RE.is_match("Bar chart of yearly rainfall"));
        assert!(GENERIC_LINK_RE.is_match("Click here"));
        assert!(!GENERIC_LINK_RE.is_match("Annual report"));
    }
}
