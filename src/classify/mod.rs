//! Block classifier.
//!
//! Turns a [`LineStream`] into an ordered sequence of [`StructuralBlock`]s:
//!
//! 1. OCR repair of broken uppercase headings ([`ocr`])
//! 2. Garbled-region detection ([`noise`]); flagged spans are kept verbatim
//! 3. The ordered rule list ([`rules`]); the first matching rule decides
//! 4. Continuation: wrapped paragraph, citation and list lines are joined
//!
//! Classification never fails. Every line with text ends up in exactly one
//! block, in the worst case an `Unclassified` block with confidence 0.

pub mod noise;
pub mod ocr;
pub mod rules;

use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::model::{BlockKind, LineRange, LineStream, StructuralBlock};
use crate::patterns::CAPTION_LINE_RE;

use self::ocr::Dictionary;
use self::rules::{LineContext, RuleMatch};

/// Number of leading blocks searched for a document title.
const TITLE_SEARCH_DEPTH: usize = 8;

/// Block prefixes that never make a document title.
const TITLE_SKIP_PREFIXES: &[&str] = &[
    "abstract",
    "keywords",
    "introduction",
    "arxiv:",
    "fig.",
    "figure",
    "table",
];

/// Classify a line stream into structural blocks.
pub fn classify(stream: &LineStream, config: &ClassifierConfig) -> Vec<StructuralBlock> {
    let dictionary = Dictionary::new(&config.extra_ocr_words);
    let lines: Vec<String> = stream
        .lines
        .iter()
        .map(|l| dictionary.repair(l.trim()).into_owned())
        .collect();

    let spans = noise::detect_garbled(&lines, config, rules::looks_like_heading_fragment);
    let edges = page_edges(stream, &lines);

    let mut builder = BlockBuilder::default();
    let mut in_references = false;
    let mut spans = spans.into_iter().peekable();
    let mut index = 0;

    while index < lines.len() {
        if let Some(span) = spans.next_if(|s| s.start == index) {
            warn!(
                start = span.start,
                end = span.end,
                noise = span.noise,
                "Garbled region kept verbatim for review"
            );
            let text = stream.lines[span.start..=span.end].join("\n");
            builder.push(StructuralBlock::new(
                BlockKind::Unclassified,
                text,
                LineRange {
                    start: span.start,
                    end: span.end,
                },
                span.confidence(config.confidence_threshold),
            )
            .for_review());
            builder.close();
            index = span.end + 1;
            continue;
        }

        if lines[index].is_empty() {
            builder.close();
            index += 1;
            continue;
        }

        let ctx = LineContext {
            lines: &lines,
            index,
            in_references,
            page_edge: edges[index],
            config,
        };
        let (rule, m) = rules::first_match(&ctx);
        debug!(line = index, rule, confidence = m.confidence, "Classified line");

        if m.kind == BlockKind::Heading {
            in_references = rules::is_reference_title(&m.text);
        }
        builder.accept(m, index);
        index += 1;
    }

    builder.blocks
}

/// Accumulates blocks and tracks the block wrapped lines may extend.
#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<StructuralBlock>,
    open: Option<usize>,
}

impl BlockBuilder {
    fn push(&mut self, block: StructuralBlock) {
        self.blocks.push(block);
    }

    fn close(&mut self) {
        self.open = None;
    }

    fn accept(&mut self, m: RuleMatch, line: usize) {
        let range = LineRange::single(line);
        match m.kind {
            BlockKind::Heading => {
                let mut heading =
                    StructuralBlock::heading(m.level.unwrap_or(1), m.text, range, m.confidence);
                heading.numbering = m.numbering;
                self.push(heading);
                self.close();
                if let Some(rest) = m.remainder {
                    // Body text merged onto the heading line opens the section.
                    self.push(StructuralBlock::new(BlockKind::Paragraph, rest, range, m.confidence));
                    self.open = Some(self.blocks.len() - 1);
                }
            }
            BlockKind::Paragraph => {
                if self.try_extend(&m.text, line) {
                    return;
                }
                self.push(StructuralBlock::new(BlockKind::Paragraph, m.text, range, m.confidence));
                self.open = Some(self.blocks.len() - 1);
            }
            BlockKind::ListItem | BlockKind::ReferenceEntry => {
                let mut block = StructuralBlock::new(m.kind, m.text, range, m.confidence);
                block.numbering = m.numbering;
                self.push(block);
                self.open = Some(self.blocks.len() - 1);
            }
            BlockKind::TableRow | BlockKind::Unclassified => {
                self.push(StructuralBlock::new(m.kind, m.text, range, m.confidence));
                self.close();
            }
        }
    }

    /// Append a wrapped line to the open block when its kind allows it.
    fn try_extend(&mut self, text: &str, line: usize) -> bool {
        let Some(block) = self.open.and_then(|i| self.blocks.get_mut(i)) else {
            return false;
        };
        if CAPTION_LINE_RE.is_match(text) {
            return false;
        }
        let starts_lower = text.starts_with(|c: char| c.is_lowercase());
        let extends = match block.kind {
            BlockKind::Paragraph | BlockKind::ReferenceEntry => true,
            BlockKind::ListItem => starts_lower,
            _ => false,
        };
        if !extends {
            return false;
        }

        if starts_lower && ends_with_word_hyphen(&block.text) {
            block.text.pop();
        } else {
            block.text.push(' ');
        }
        block.text.push_str(text);
        block.source_line_range.end = line;
        true
    }
}

fn ends_with_word_hyphen(text: &str) -> bool {
    let mut chars = text.chars().rev();
    matches!(
        (chars.next(), chars.next()),
        (Some('-'), Some(c)) if c.is_alphabetic()
    )
}

/// First and last non-blank line of every page, and of the whole document.
fn page_edges(stream: &LineStream, lines: &[String]) -> Vec<bool> {
    let mut edges = vec![false; lines.len()];
    let mut bounds = vec![0];
    bounds.extend(stream.page_starts.iter().copied().filter(|&s| s <= lines.len()));
    bounds.push(lines.len());

    for pair in bounds.windows(2) {
        let page = pair[0]..pair[1];
        if let Some(first) = page.clone().find(|&i| !lines[i].is_empty()) {
            edges[first] = true;
        }
        if let Some(last) = page.rev().find(|&i| !lines[i].is_empty()) {
            edges[last] = true;
        }
    }
    edges
}

/// Pick a document title from the classified blocks.
///
/// Takes the first plausible title among the leading blocks, then the first
/// heading, then `fallback`.
pub fn detect_title(blocks: &[StructuralBlock], fallback: &str) -> String {
    let plausible = |b: &&StructuralBlock| {
        let text = b.text.trim();
        let len = text.chars().count();
        let lower = text.to_lowercase();
        b.kind != BlockKind::Unclassified
            && (15..=200).contains(&len)
            && !text.contains('@')
            && !text.starts_with(|c: char| c.is_ascii_digit())
            && !TITLE_SKIP_PREFIXES.iter().any(|p| lower.starts_with(p))
    };

    blocks
        .iter()
        .take(TITLE_SEARCH_DEPTH)
        .find(plausible)
        .or_else(|| blocks.iter().find(|b| b.is_heading()))
        .map(|b| b.text.trim().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
