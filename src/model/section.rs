//! Hierarchical section tree built from the block stream.

use serde::Serialize;

use super::block::StructuralBlock;

/// A section opened by a heading, or the virtual document root (level 0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<StructuralBlock>,
    pub level: u8,
    pub children: Vec<SectionChild>,
}

/// Ordered content of a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionChild {
    Section(Section),
    Block(StructuralBlock),
}

impl Section {
    /// The virtual document root.
    pub fn root() -> Self {
        Self {
            heading: None,
            level: 0,
            children: Vec::new(),
        }
    }

    /// Open a section for a heading block.
    pub fn open(heading: StructuralBlock) -> Self {
        Self {
            level: heading.level().unwrap_or(1),
            heading: Some(heading),
            children: Vec::new(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.heading.as_ref().map(|h| h.text.as_str())
    }

    /// Direct subsections in order.
    pub fn subsections(&self) -> impl Iterator<Item = &Section> {
        self.children.iter().filter_map(|c| match c {
            SectionChild::Section(s) => Some(s),
            SectionChild::Block(_) => None,
        })
    }

    /// Direct non-heading blocks in order.
    pub fn blocks(&self) -> impl Iterator<Item = &StructuralBlock> {
        self.children.iter().filter_map(|c| match c {
            SectionChild::Block(b) => Some(b),
            SectionChild::Section(_) => None,
        })
    }
}
