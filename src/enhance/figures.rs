//! Phase 3: images and figures.

use tracing::{debug, info};

use crate::alt_text::{AltText, AltTextCatalog};
use crate::config::EnhancementOptions;
use crate::dom::{HtmlDocument, NodeId};
use crate::patterns::{FIGURE_CAPTION_RE, GENERIC_ALT_RE};
use crate::slug::SlugRegistry;

/// Parents in which a bare image may be wrapped in a figure in place.
const FLOW_CONTAINERS: &[&str] = &[
    "body", "main", "section", "article", "div", "aside", "li", "td", "th", "blockquote", "dd",
    "header", "footer",
];

pub fn figures(mut doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    let mut slugs = SlugRegistry::with_reserved(doc.ids());
    let images: Vec<NodeId> = doc.elements_by_tag("img").collect();

    for img in images {
        if opts.lazy_images {
            doc.set_attr_if_missing(img, "loading", "lazy");
        }
        let entry = catalogue_entry(&doc, img, &opts.alt_text);
        apply_alt(&mut doc, img, entry.as_ref());

        if !opts.figure_descriptions {
            continue;
        }
        let existing = doc.ancestors(img).find(|&a| doc.is_tag(a, "figure"));
        match existing {
            Some(figure) => label_figure(&mut doc, figure, &mut slugs),
            None => wrap_figure(&mut doc, img, entry.as_ref(), &mut slugs),
        }
    }
    doc
}

fn catalogue_entry(doc: &HtmlDocument, img: NodeId, catalog: &AltTextCatalog) -> Option<AltText> {
    let key = doc
        .attr(img, "data-image-id")
        .or_else(|| doc.attr(img, "src"))?;
    catalog.get(key).cloned()
}

/// Replace missing or placeholder alt text from the catalogue.
fn apply_alt(doc: &mut HtmlDocument, img: NodeId, entry: Option<&AltText>) {
    let Some(entry) = entry.filter(|e| !e.alt.trim().is_empty()) else {
        return;
    };
    if matches!(doc.attr(img, "role").map(str::trim), Some("presentation" | "none")) {
        return;
    }
    let replace = match doc.attr(img, "alt").map(str::trim) {
        None | Some("") => true,
        Some(alt) => GENERIC_ALT_RE.is_match(alt),
    };
    if replace {
        doc.set_attr(img, "alt", entry.alt.trim());
        debug!(src = doc.attr(img, "src").unwrap_or(""), "Applied catalogue alt text");
    }
}

/// Give a figure that already exists an id and a caption association.
fn label_figure(doc: &mut HtmlDocument, figure: NodeId, slugs: &mut SlugRegistry) {
    let caption = doc.child_elements(figure).find(|&c| doc.is_tag(c, "figcaption"));
    let figure_id = match doc.attr(figure, "id").filter(|id| !id.trim().is_empty()) {
        Some(id) => id.to_string(),
        None => {
            let number = caption.and_then(|c| caption_number(&doc.normalized_text(c)));
            let id = slugs.claim(format!("figure-{}", number.unwrap_or_else(|| next_number(doc))));
            doc.set_attr(figure, "id", &id);
            id
        }
    };
    let Some(caption) = caption else {
        return;
    };
    let caption_id = match doc.attr(caption, "id").filter(|id| !id.trim().is_empty()) {
        Some(id) => id.to_string(),
        None => {
            let id = slugs.claim(format!("{figure_id}-caption"));
            doc.set_attr(caption, "id", &id);
            id
        }
    };
    doc.set_attr_if_missing(figure, "aria-labelledby", &caption_id);
}

fn caption_number(text: &str) -> Option<u32> {
    FIGURE_CAPTION_RE.captures(text)?["num"].parse().ok()
}

fn next_number(doc: &HtmlDocument) -> u32 {
    doc.elements_by_tag("figure").count() as u32 + 1
}

/// The node a new figure takes the place of: a paragraph holding nothing but
/// the image, or the image itself inside a flow container.
fn figure_slot(doc: &HtmlDocument, img: NodeId) -> Option<NodeId> {
    let parent = doc.parent(img)?;
    if doc.is_tag(parent, "p") {
        let alone = doc
            .children(parent)
            .all(|c| c == img || doc.text(c).is_some_and(|t| t.trim().is_empty()));
        return alone.then_some(parent);
    }
    doc.tag(parent)
        .is_some_and(|t| FLOW_CONTAINERS.contains(&t))
        .then_some(img)
}

/// A "Figure N" paragraph directly after `slot`.
fn caption_after(doc: &HtmlDocument, slot: NodeId) -> Option<(NodeId, Option<u32>)> {
    let mut cursor = doc.next_sibling(slot);
    while let Some(node) = cursor {
        if doc.text(node).is_some_and(|t| t.trim().is_empty()) {
            cursor = doc.next_sibling(node);
            continue;
        }
        if !doc.is_tag(node, "p") {
            return None;
        }
        let text = doc.normalized_text(node);
        return FIGURE_CAPTION_RE
            .is_match(&text)
            .then(|| (node, caption_number(&text)));
    }
    None
}

fn wrap_figure(
    doc: &mut HtmlDocument,
    img: NodeId,
    entry: Option<&AltText>,
    slugs: &mut SlugRegistry,
) {
    let Some(slot) = figure_slot(doc, img) else {
        return;
    };
    let alt = doc.attr(img, "alt").map(str::trim).unwrap_or("").to_string();
    let caption = caption_after(doc, slot);
    if alt.is_empty() && entry.is_none() && caption.is_none() {
        return;
    }

    let number = caption
        .and_then(|(_, n)| n)
        .unwrap_or_else(|| next_number(doc));
    let id = slugs.claim(format!("figure-{number}"));
    let figure = doc.create_element("figure", &[("id", id.as_str())]);
    doc.insert_before(slot, figure);
    doc.append(figure, img);
    if slot != img {
        doc.detach(slot);
    }

    let long = entry
        .and_then(|e| e.long_description.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if let Some(long) = long {
        let desc_id = slugs.claim(format!("{id}-desc"));
        let details = doc.create_element("details", &[("id", desc_id.as_str())]);
        let summary = doc.create_text_element("summary", &[], "Figure description");
        let text = doc.create_text_element("p", &[], long);
        doc.append(details, summary);
        doc.append(details, text);
        doc.append(figure, details);
        doc.set_attr(img, "aria-describedby", &desc_id);
    }

    let caption_text = entry
        .and_then(|e| e.caption.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(alt.as_str())
        .to_string();
    if caption.is_some() || !caption_text.is_empty() {
        let caption_id = slugs.claim(format!("{id}-caption"));
        let figcaption = doc.create_element("figcaption", &[("id", caption_id.as_str())]);
        match caption {
            Some((paragraph, _)) => {
                doc.reparent_children(paragraph, figcaption);
                doc.detach(paragraph);
            }
            None => doc.append_text(figcaption, &caption_text),
        }
        doc.append(figure, figcaption);
        doc.set_attr(figure, "aria-labelledby", &caption_id);
    }
    info!(id = %id, "Wrapped image in a figure");
}
