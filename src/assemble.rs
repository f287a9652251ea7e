//! Section assembly.
//!
//! Groups the flat block stream into a hierarchical section tree using heading
//! levels. A stack holds the open sections; a heading of level `L` closes
//! every open section of level `L` or deeper and opens a new one, and every
//! other block appends to the innermost open section.
//!
//! Skipped levels (a level-1 heading followed directly by a level-3 heading)
//! are recorded as seen. No synthetic intermediate sections are inserted.

use crate::model::{Section, SectionChild, StructuralBlock};

/// Build the section tree rooted at a virtual level-0 section.
pub fn assemble(blocks: &[StructuralBlock]) -> Section {
    assemble_owned(blocks.iter().cloned())
}

/// Like [`assemble`], consuming the blocks.
pub fn assemble_owned(blocks: impl IntoIterator<Item = StructuralBlock>) -> Section {
    let mut stack = vec![Section::root()];

    for block in blocks {
        match block.level() {
            Some(level) => {
                close_to(&mut stack, level);
                stack.push(Section::open(block));
            }
            None => {
                if let Some(current) = stack.last_mut() {
                    current.children.push(SectionChild::Block(block));
                }
            }
        }
    }

    close_to(&mut stack, 1);
    stack.pop().unwrap_or_else(Section::root)
}

/// Close open sections until the innermost one is shallower than `level`.
fn close_to(stack: &mut Vec<Section>, level: u8) {
    while stack.len() > 1 && stack.last().is_some_and(|s| s.level >= level) {
        let Some(done) = stack.pop() else {
            break;
        };
        if let Some(parent) = stack.last_mut() {
            parent.children.push(SectionChild::Section(done));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
