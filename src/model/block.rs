//! Typed structural blocks produced by the classifier.

use serde::Serialize;

/// Structural role of a block of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    Paragraph,
    ListItem,
    TableRow,
    ReferenceEntry,
    Unclassified,
}

/// Inclusive range of source line indices covered by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

}

/// A classified unit of document text.
///
/// `level` is present exactly when `kind` is [`BlockKind::Heading`]; the
/// constructors below are the only way to build a block so the pairing holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralBlock {
    pub kind: BlockKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u8>,
    /// Section number, list marker or citation number stripped from `text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numbering: Option<String>,
    pub source_line_range: LineRange,
    pub confidence: f32,
    /// Kept verbatim for manual review whatever the threshold.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub review: bool,
}

impl StructuralBlock {
    /// Create a heading. Levels outside 1-4 are clamped.
    pub fn heading(level: u8, text: impl Into<String>, range: LineRange, confidence: f32) -> Self {
        Self {
            kind: BlockKind::Heading,
            text: text.into(),
            level: Some(level.clamp(1, 4)),
            numbering: None,
            source_line_range: range,
            confidence: confidence.clamp(0.0, 1.0),
            review: false,
        }
    }

    /// Create a non-heading block.
    ///
    /// Passing [`BlockKind::Heading`] here produces a level-1 heading.
    pub fn new(kind: BlockKind, text: impl Into<String>, range: LineRange, confidence: f32) -> Self {
        Self {
            kind,
            text: text.into(),
            level: (kind == BlockKind::Heading).then_some(1),
            numbering: None,
            source_line_range: range,
            confidence: confidence.clamp(0.0, 1.0),
            review: false,
        }
    }

    pub fn with_numbering(mut self, numbering: impl Into<String>) -> Self {
        self.numbering = Some(numbering.into());
        self
    }

    /// Heading level (1-4), `None` for every other kind.
    pub fn level(&self) -> Option<u8> {
        self.level
    }

    pub fn is_heading(&self) -> bool {
        self.kind == BlockKind::Heading
    }

    /// Mark the block for review regardless of its confidence.
    pub fn for_review(mut self) -> Self {
        self.review = true;
        self
    }

    /// True when the block is flagged for manual review.
    pub fn needs_review(&self, threshold: f32) -> bool {
        self.review || self.confidence < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_only_on_headings() {
        let h = StructuralBlock::heading(2, "Background", LineRange::single(0), 0.9);
        assert_eq!(h.level(), Some(2));

        let p = StructuralBlock::new(BlockKind::Paragraph, "text", LineRange::single(1), 0.9);
        assert_eq!(p.level(), None);

        let h = StructuralBlock::new(BlockKind::Heading, "Title", LineRange::single(2), 0.9);
        assert_eq!(h.level(), Some(1));
    }

    #[test]
    fn heading_level_clamped() {
        let h = StructuralBlock::heading(9, "Deep", LineRange::single(0), 0.9);
        assert_eq!(h.level(), Some(4));
        let h = StructuralBlock::heading(0, "Shallow", LineRange::single(0), 0.9);
        assert_eq!(h.level(), Some(1));
    }

    #[test]
    fn review_flag_uses_threshold() {
        let b = StructuralBlock::new(BlockKind::Unclassified, "x", LineRange::single(0), 0.2);
        assert!(b.needs_review(0.5));
        assert!(!b.needs_review(0.1));
    }

    #[test]
    fn flagged_blocks_always_need_review() {
        let b = StructuralBlock::new(BlockKind::Unclassified, "x", LineRange::single(0), 0.2).for_review();
        assert!(b.needs_review(0.1));
        assert!(b.needs_review(0.0));
    }
}
