//! Core data model shared by the pipeline stages.
//!
//! This module contains:
//! - The raw line stream handed over by text extraction
//! - Structural blocks produced by the classifier
//! - The section tree produced by the assembler
//! - Images and tables reported alongside the text

mod assets;
mod block;
mod lines;
mod section;

pub use assets::{ImageAsset, ImageSource, TableAsset};
pub use block::{BlockKind, LineRange, StructuralBlock};
pub use lines::LineStream;
pub use section::{Section, SectionChild};
