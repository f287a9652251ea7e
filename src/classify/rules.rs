//! Ordered classifier rules.
//!
//! Each rule is a pure function from a line and its context to an optional
//! match carrying the block kind and a confidence. [`RULES`] lists them in
//! priority order; the first rule that matches decides the line. The last
//! rule matches everything, so every line receives a kind.

use crate::config::ClassifierConfig;
use crate::model::BlockKind;
use crate::patterns::{
    BRACKET_CITATION_RE, COLUMN_GAP_RE, LETTERED_HEADING_RE, LIST_ITEM_RE, NON_HEADING_RE,
    NUMBERED_CITATION_RE, NUMERIC_HEADING_RE, PAGE_NUMBER_RE, ROMAN_HEADING_RE, WHITESPACE_RE,
};

/// How far (in non-blank lines) run-based rules look for a matching neighbour.
const NEIGHBOUR_REACH: usize = 3;

/// Section titles after which numbered lines are citations.
const REFERENCE_TITLES: &[&str] = &["references", "bibliography", "works cited", "literature cited"];

/// Titles recognised as headings on their own.
const KEYWORD_TITLES: &[&str] = &[
    "abstract",
    "acknowledgement",
    "acknowledgements",
    "acknowledgment",
    "acknowledgments",
    "appendix",
    "background",
    "bibliography",
    "conclusion",
    "conclusions",
    "contributions",
    "discussion",
    "evaluation",
    "experiments",
    "future work",
    "index terms",
    "introduction",
    "keywords",
    "limitations",
    "methodology",
    "methods",
    "overview",
    "references",
    "related work",
    "results",
    "summary",
];

/// Lowercase words allowed inside a title.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to", "via",
    "vs", "with",
];

/// A line and what the classifier knows around it.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    /// Repaired, trimmed lines of the whole stream.
    pub lines: &'a [String],
    pub index: usize,
    /// The current section is a reference list.
    pub in_references: bool,
    /// The line opens or closes a page.
    pub page_edge: bool,
    pub config: &'a ClassifierConfig,
}

impl<'a> LineContext<'a> {
    pub fn text(&self) -> &'a str {
        self.lines[self.index].as_str()
    }

    /// Up to `n` non-blank lines before this one, nearest first.
    pub fn before(&self, n: usize) -> impl Iterator<Item = &'a str> {
        self.lines[..self.index]
            .iter()
            .rev()
            .map(String::as_str)
            .filter(|l| !l.is_empty())
            .take(n)
    }

    /// Up to `n` non-blank lines after this one, nearest first.
    pub fn after(&self, n: usize) -> impl Iterator<Item = &'a str> {
        self.lines[self.index + 1..]
            .iter()
            .map(String::as_str)
            .filter(|l| !l.is_empty())
            .take(n)
    }

    fn nearest_neighbours(&self) -> impl Iterator<Item = &'a str> {
        self.before(1).chain(self.after(1))
    }
}

/// Outcome of a matching rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub kind: BlockKind,
    pub level: Option<u8>,
    pub text: String,
    pub numbering: Option<String>,
    pub confidence: f32,
    /// Body text split off a merged heading line.
    pub remainder: Option<String>,
}

impl RuleMatch {
    fn block(kind: BlockKind, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            kind,
            level: None,
            text: text.into(),
            numbering: None,
            confidence,
            remainder: None,
        }
    }

    fn heading(level: u8, title: impl Into<String>, confidence: f32) -> Self {
        Self {
            level: Some(level),
            ..Self::block(BlockKind::Heading, title, confidence)
        }
    }

    fn numbered(mut self, numbering: &str) -> Self {
        self.numbering = Some(numbering.to_string());
        self
    }
}

/// A named classification rule.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&LineContext<'_>) -> Option<RuleMatch>,
}

/// Rules in priority order.
pub const RULES: &[Rule] = &[
    Rule { name: "reference_entry", apply: reference_entry },
    Rule { name: "table_row", apply: table_row },
    Rule { name: "roman_heading", apply: roman_heading },
    Rule { name: "numeric_heading", apply: numeric_heading },
    Rule { name: "caps_heading", apply: caps_heading },
    Rule { name: "keyword_heading", apply: keyword_heading },
    Rule { name: "lettered_heading", apply: lettered_heading },
    Rule { name: "list_item", apply: list_item },
    Rule { name: "page_number", apply: page_number },
    Rule { name: "paragraph", apply: paragraph },
    Rule { name: "noise", apply: noise },
];

/// Apply the rules in order and return the first match with its rule name.
pub fn first_match(ctx: &LineContext<'_>) -> (&'static str, RuleMatch) {
    RULES
        .iter()
        .find_map(|rule| (rule.apply)(ctx).map(|m| (rule.name, m)))
        .unwrap_or_else(|| ("noise", RuleMatch::block(BlockKind::Unclassified, ctx.text(), 0.0)))
}

/// Quick heading-shape test used by garbled-region detection.
pub fn looks_like_heading_fragment(line: &str) -> bool {
    if line.chars().count() > 40 || line.ends_with('.') {
        return false;
    }
    ROMAN_HEADING_RE.is_match(line)
        || NUMERIC_HEADING_RE.is_match(line)
        || LETTERED_HEADING_RE.is_match(line)
        || is_all_caps(line, 1)
        || line.split_whitespace().count() <= 2 && line.starts_with(|c: char| c.is_uppercase())
}

/// True for titles that open a reference list.
pub fn is_reference_title(title: &str) -> bool {
    let t = title.trim().trim_end_matches([':', '.']).to_lowercase();
    REFERENCE_TITLES.contains(&t.as_str())
}

// ============================================================================
// Run-based rules
// ============================================================================

fn reference_entry(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let text = ctx.text();

    if let Some(caps) = BRACKET_CITATION_RE.captures(text) {
        let in_run = ctx.in_references
            || ctx
                .before(NEIGHBOUR_REACH)
                .chain(ctx.after(NEIGHBOUR_REACH))
                .any(|l| BRACKET_CITATION_RE.is_match(l));
        if in_run {
            let confidence = if ctx.in_references { 0.9 } else { 0.8 };
            return Some(
                RuleMatch::block(BlockKind::ReferenceEntry, &caps["body"], confidence)
                    .numbered(&caps["num"]),
            );
        }
    }

    if ctx.in_references
        && let Some(caps) = NUMBERED_CITATION_RE.captures(text)
    {
        return Some(
            RuleMatch::block(BlockKind::ReferenceEntry, &caps["body"], 0.8).numbered(&caps["num"]),
        );
    }

    None
}

/// Column delimiter of a plain-text table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Pipe,
    Gap,
}

/// Split a table-shaped line into cells; `None` unless it has two or more.
pub fn split_cells(line: &str) -> Option<(Delimiter, Vec<String>)> {
    let line = line.trim();
    let (delimiter, cells): (Delimiter, Vec<&str>) = if line.contains('\t') {
        (Delimiter::Tab, line.split('\t').collect())
    } else if line.matches('|').count() >= 2 {
        let inner = line.trim_start_matches('|').trim_end_matches('|');
        (Delimiter::Pipe, inner.split('|').collect())
    } else if COLUMN_GAP_RE.is_match(line) {
        (Delimiter::Gap, COLUMN_GAP_RE.split(line).collect())
    } else {
        return None;
    };

    let cells: Vec<String> = cells.iter().map(|c| c.trim().to_string()).collect();
    if cells.len() < 2 || cells.iter().all(|c| c.is_empty()) {
        return None;
    }
    Some((delimiter, cells))
}

fn table_row(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let (delimiter, cells) = split_cells(ctx.text())?;
    let consistent = ctx.nearest_neighbours().any(|l| {
        split_cells(l).is_some_and(|(d, c)| d == delimiter && c.len() == cells.len())
    });
    consistent.then(|| RuleMatch::block(BlockKind::TableRow, ctx.text(), 0.8))
}

// ============================================================================
// Heading rules
// ============================================================================

fn roman_heading(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let caps = ROMAN_HEADING_RE.captures(ctx.text())?;
    let title = &caps["title"];
    // "C." and "L." open lettered subsections far more often than sections 100 and 50.
    if matches!(&caps["num"], "C" | "L") {
        return None;
    }
    if !title.starts_with(|c: char| c.is_uppercase()) || NON_HEADING_RE.is_match(ctx.text()) {
        return None;
    }
    heading_or_split(ctx, 1, title, 0.95).map(|m| m.numbered(&caps["num"]))
}

fn numeric_heading(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let caps = NUMERIC_HEADING_RE.captures(ctx.text())?;
    let num = &caps["num"];
    let title = &caps["title"];
    let components = num.split('.').count();
    let dotted = !caps["dot"].is_empty() || components > 1;

    if !title.starts_with(|c: char| c.is_uppercase()) || NON_HEADING_RE.is_match(ctx.text()) {
        return None;
    }
    if num.split('.').next().and_then(|n| n.parse::<u32>().ok()) == Some(0) {
        return None;
    }

    let level = components.min(4) as u8;
    if !dotted {
        // "1 Introduction" without a dot: only short, title-like lines.
        let short = title.split_whitespace().count() <= 6 && !ends_sentence(title);
        let small = num.parse::<u32>().is_ok_and(|n| n <= 20);
        return (short && small && ctx.text().len() <= ctx.config.max_heading_len)
            .then(|| RuleMatch::heading(level, title, 0.7).numbered(num));
    }
    if components == 1 && ends_sentence(title) && ctx.text().len() <= ctx.config.max_heading_len {
        // "1. Install the package." reads as an enumerated item.
        return None;
    }

    let confidence = if components > 1 { 0.9 } else { 0.85 };
    heading_or_split(ctx, level, title, confidence).map(|m| m.numbered(num))
}

fn caps_heading(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let text = ctx.text();
    if NON_HEADING_RE.is_match(text) {
        return None;
    }
    if text.len() <= ctx.config.max_heading_len {
        if !is_all_caps(text, 4) {
            return None;
        }
        let words = text.split_whitespace().count();
        let confidence = if words >= 2 { 0.75 } else { 0.7 };
        return Some(RuleMatch::heading(1, text, confidence));
    }

    let first = text.split_whitespace().next()?;
    if !is_all_caps(first, 2) {
        return None;
    }
    let (title, rest) = split_merged(text)?;
    is_all_caps(&title, 4).then(|| {
        let mut m = RuleMatch::heading(1, title, 0.7);
        m.remainder = Some(rest);
        m
    })
}

fn keyword_heading(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let text = ctx.text();
    let bare = text.trim_end_matches([':', '.']).trim();
    if KEYWORD_TITLES.contains(&bare.to_lowercase().as_str()) {
        return Some(RuleMatch::heading(1, bare, 0.8));
    }

    // "Abstract—We present ..." and "Keywords: a, b, c"
    let (head, rest) = text.split_once(['—', ':'])?;
    let head = head.trim();
    let rest = rest.trim();
    let lead = head.to_lowercase();
    if rest.is_empty() || !matches!(lead.as_str(), "abstract" | "keywords" | "index terms") {
        return None;
    }
    let mut m = RuleMatch::heading(1, head, 0.8);
    m.remainder = Some(rest.to_string());
    Some(m)
}

fn lettered_heading(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    if ctx.in_references {
        return None;
    }
    let caps = LETTERED_HEADING_RE.captures(ctx.text())?;
    let title = &caps["title"];
    let words = title.split_whitespace().count();
    if title.contains(',') || NON_HEADING_RE.is_match(ctx.text()) {
        return None;
    }
    if words == 1 && !KEYWORD_TITLES.contains(&title.to_lowercase().as_str()) {
        return None;
    }
    if ctx.text().len() <= ctx.config.max_heading_len && (words > 8 || ends_sentence(title)) {
        return None;
    }
    heading_or_split(ctx, 2, title, 0.6).map(|m| m.numbered(&caps["num"]))
}

/// Heading for short lines; for long lines, split the title from its body.
fn heading_or_split(
    ctx: &LineContext<'_>,
    level: u8,
    title: &str,
    confidence: f32,
) -> Option<RuleMatch> {
    if ctx.text().len() <= ctx.config.max_heading_len {
        return Some(RuleMatch::heading(level, title.trim(), confidence));
    }
    let (head, rest) = split_merged(title)?;
    if head.len() > ctx.config.max_heading_len {
        return None;
    }
    let mut m = RuleMatch::heading(level, head, confidence - 0.1);
    m.remainder = Some(rest);
    Some(m)
}

/// Split "Related Work In recent years, ..." into title and body.
///
/// The title is the leading run of capitalised (or minor) words, minus the
/// last capitalised word before the first lowercase content word, which
/// opens the body sentence.
pub fn split_merged(text: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let body_word = tokens.iter().position(|t| is_content_lowercase(t))?;
    let sentence_start = tokens[..body_word]
        .iter()
        .rposition(|t| t.starts_with(|c: char| c.is_uppercase()))?;

    let mut title_end = sentence_start;
    while title_end > 0 && MINOR_WORDS.contains(&tokens[title_end - 1]) {
        title_end -= 1;
    }
    if title_end == 0 || tokens.len() - title_end < 2 {
        return None;
    }
    Some((tokens[..title_end].join(" "), tokens[title_end..].join(" ")))
}

fn is_content_lowercase(token: &str) -> bool {
    token.starts_with(|c: char| c.is_lowercase()) && !MINOR_WORDS.contains(&token)
}

/// Every letter is uppercase and there are at least `min_letters` of them.
fn is_all_caps(text: &str, min_letters: usize) -> bool {
    let mut letters = 0;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        if !c.is_uppercase() {
            return false;
        }
        letters += 1;
    }
    letters >= min_letters
}

fn ends_sentence(text: &str) -> bool {
    text.trim_end().ends_with(['.', ';', ',', '?', '!'])
}

// ============================================================================
// Body rules
// ============================================================================

fn list_item(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let text = ctx.text();
    if let Some(caps) = LIST_ITEM_RE.captures(text) {
        return Some(
            RuleMatch::block(BlockKind::ListItem, &caps["body"], 0.85).numbered(&caps["marker"]),
        );
    }
    let caps = NUMBERED_CITATION_RE.captures(text)?;
    let num = &caps["num"];
    (num.len() <= 2).then(|| {
        let marker = format!("{num}.");
        RuleMatch::block(BlockKind::ListItem, &caps["body"], 0.7).numbered(&marker)
    })
}

fn page_number(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    (ctx.page_edge && PAGE_NUMBER_RE.is_match(ctx.text()))
        .then(|| RuleMatch::block(BlockKind::Unclassified, ctx.text(), 1.0))
}

fn paragraph(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    let text = ctx.text();
    text.chars().any(char::is_alphanumeric).then(|| {
        let collapsed = WHITESPACE_RE.replace_all(text, " ");
        RuleMatch::block(BlockKind::Paragraph, collapsed, 0.9)
    })
}

fn noise(ctx: &LineContext<'_>) -> Option<RuleMatch> {
    Some(RuleMatch::block(BlockKind::Unclassified, ctx.text(), 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_in(lines: &[&str], index: usize, in_references: bool) -> (&'static str, RuleMatch) {
        let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        let config = ClassifierConfig::default();
        let ctx = LineContext {
            lines: &lines,
            index,
            in_references,
            page_edge: false,
            config: &config,
        };
        first_match(&ctx)
    }

    fn classify_one(line: &str) -> (&'static str, RuleMatch) {
        classify_in(&[line], 0, false)
    }

    #[test]
    fn roman_heading_level_one() {
        let (rule, m) = classify_one("I. INTRODUCTION");
        assert_eq!(rule, "roman_heading");
        assert_eq!(m.kind, BlockKind::Heading);
        assert_eq!(m.level, Some(1));
        assert_eq!(m.text, "INTRODUCTION");
        assert_eq!(m.numbering.as_deref(), Some("I"));
    }

    #[test]
    fn numeric_heading_depth_sets_level() {
        let (_, m) = classify_one("1.1 Background");
        assert_eq!((m.level, m.text.as_str()), (Some(2), "Background"));
        let (_, m) = classify_one("2. Methods");
        assert_eq!(m.level, Some(1));
        let (_, m) = classify_one("3.2.1 Weights");
        assert_eq!(m.level, Some(3));
        let (_, m) = classify_one("1 Introduction");
        assert_eq!((m.kind, m.level), (BlockKind::Heading, Some(1)));
    }

    #[test]
    fn numbered_sentence_is_list_item() {
        let (rule, m) = classify_one("1. Install the package.");
        assert_eq!(rule, "list_item");
        assert_eq!(m.numbering.as_deref(), Some("1."));
    }

    #[test]
    fn roman_wins_over_caps() {
        // Matches both the Roman and the all-caps pattern.
        let (rule, _) = classify_one("IV. RESULTS");
        assert_eq!(rule, "roman_heading");
    }

    #[test]
    fn caps_heading() {
        let (rule, m) = classify_one("TECHNICAL ACTIVITIES");
        assert_eq!(rule, "caps_heading");
        assert_eq!(m.level, Some(1));
    }

    #[test]
    fn bylines_are_not_headings() {
        assert_eq!(classify_one("Jane Smith").0, "paragraph");
        assert_eq!(classify_one("AALTO UNIVERSITY").0, "paragraph");
    }

    #[test]
    fn keyword_heading_with_body() {
        let (rule, m) = classify_one("Abstract—We study accessible conversion.");
        assert_eq!(rule, "keyword_heading");
        assert_eq!(m.text, "Abstract");
        assert_eq!(m.remainder.as_deref(), Some("We study accessible conversion."));
        let (_, m) = classify_one("Conclusions");
        assert_eq!(m.kind, BlockKind::Heading);
    }

    #[test]
    fn merged_heading_is_split() {
        let line = "I. INTRODUCTION Large language models have transformed how documents are processed and read.";
        let (rule, m) = classify_one(line);
        assert_eq!(rule, "roman_heading");
        assert_eq!(m.text, "INTRODUCTION");
        assert!(m.remainder.as_deref().unwrap().starts_with("Large language models"));
    }

    #[test]
    fn long_line_without_split_point_is_paragraph() {
        let line = "1. The Quick Brown Fox Jumps Over The Lazy Dog Again And Again Until The Line Is Long";
        let (rule, _) = classify_one(line);
        assert_ne!(rule, "numeric_heading");
    }

    #[test]
    fn split_merged_title_case() {
        let (title, rest) = split_merged("Related Work In recent years, many tools appeared").unwrap();
        assert_eq!(title, "Related Work");
        assert_eq!(rest, "In recent years, many tools appeared");
        assert!(split_merged("all lowercase words here").is_none());
    }

    #[test]
    fn bracketed_citations_need_a_run() {
        let lines = ["[1] A. Smith, Paper one.", "[2] B. Jones, Paper two."];
        let (rule, m) = classify_in(&lines, 0, false);
        assert_eq!(rule, "reference_entry");
        assert_eq!(m.numbering.as_deref(), Some("1"));
        assert_eq!(m.text, "A. Smith, Paper one.");

        let (rule, _) = classify_one("[1] A lonely bracket.");
        assert_eq!(rule, "paragraph");
    }

    #[test]
    fn numbered_citations_inside_references() {
        let lines = ["1. A. Smith, Paper one."];
        let (rule, m) = classify_in(&lines, 0, true);
        assert_eq!(rule, "reference_entry");
        assert_eq!(m.text, "A. Smith, Paper one.");
    }

    #[test]
    fn table_rows_need_consistent_neighbours() {
        let lines = ["Name   Score   Rank", "Alice   91   1", "Bob   85"];
        assert_eq!(classify_in(&lines, 0, false).0, "table_row");
        assert_eq!(classify_in(&lines, 1, false).0, "table_row");
        assert_ne!(classify_in(&lines, 2, false).0, "table_row");
    }

    #[test]
    fn split_cells_variants() {
        let (d, cells) = split_cells("| a | b | c |").unwrap();
        assert_eq!(d, Delimiter::Pipe);
        assert_eq!(cells, vec!["a", "b", "c"]);
        let (d, cells) = split_cells("x\ty").unwrap();
        assert_eq!((d, cells.len()), (Delimiter::Tab, 2));
        assert!(split_cells("no delimiters here").is_none());
    }

    #[test]
    fn list_markers() {
        let (rule, m) = classify_one("- first item");
        assert_eq!(rule, "list_item");
        assert_eq!(m.text, "first item");
        assert_eq!(m.numbering.as_deref(), Some("-"));
        let (_, m) = classify_one("(a) lettered item");
        assert_eq!(m.numbering.as_deref(), Some("(a)"));
    }

    #[test]
    fn symbols_only_is_noise() {
        let (rule, m) = classify_one("~~~ ***");
        assert_eq!(rule, "noise");
        assert_eq!(m.kind, BlockKind::Unclassified);
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn lettered_subsection() {
        let (rule, m) = classify_one("B. Related Work");
        assert_eq!(rule, "lettered_heading");
        assert_eq!(m.level, Some(2));
        assert_ne!(classify_one("A. Smith").0, "lettered_heading");
    }

    #[test]
    fn lettered_c_is_not_roman() {
        let (rule, m) = classify_one("C. Threats to Validity");
        assert_eq!(rule, "lettered_heading");
        assert_eq!(m.level, Some(2));
    }

    #[test]
    fn reference_titles() {
        assert!(is_reference_title("REFERENCES"));
        assert!(is_reference_title("Bibliography:"));
        assert!(!is_reference_title("Results"));
    }
}
