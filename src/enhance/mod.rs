//! Accessibility enhancement.
//!
//! Six phases run in a fixed order over one parsed document. Each phase is a
//! plain function from document to document, reads only the immutable
//! [`EnhancementOptions`] it is handed, and checks before it inserts, so
//! running the sequence over its own output changes nothing.
//!
//! ## Phase order
//!
//! 1. **Structure** - language, title, main landmark, skip link, landmark
//!    roles, page footer and table of contents
//! 2. **Semantics** - citation runs to reference lists, delimited paragraph
//!    runs to tables
//! 3. **Figures** - figure wrappers, captions and long descriptions
//! 4. **Cross-references** - "Figure N" / "Table N" mentions to in-page links
//! 5. **CSS** - the accessibility stylesheet, replaced in place on rerun
//! 6. **Cleanup** - outline suppression, empty wrappers, text merging

mod cleanup;
mod crossref;
mod css;
mod figures;
mod semantics;
mod structure;

use tracing::debug;

use crate::config::EnhancementOptions;
use crate::dom::HtmlDocument;

pub use css::{STYLE_MARKER, stylesheet};

/// One enhancement phase.
pub type Phase = fn(HtmlDocument, &EnhancementOptions) -> HtmlDocument;

/// The phases in the order they run.
pub const PHASES: &[(&str, Phase)] = &[
    ("structure", structure::structure),
    ("semantics", semantics::semantics),
    ("figures", figures::figures),
    ("cross-references", crossref::cross_references),
    ("css", css::inject_css),
    ("cleanup", cleanup::cleanup),
];

/// Run every phase over a parsed document.
pub fn enhance(doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    PHASES.iter().fold(doc, |doc, &(name, phase)| {
        debug!(phase = name, "Running enhancement phase");
        phase(doc, opts)
    })
}

/// Parse, enhance and serialize an HTML document.
pub fn enhance_html(html: &str, opts: &EnhancementOptions) -> String {
    let mut doc = enhance(HtmlDocument::parse(html), opts);
    let root = doc.document();
    doc.normalize_text(root);
    doc.to_html()
}
