//! Phase 2: reference lists and plain-text tables.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::classify::rules::{Delimiter, is_reference_title, split_cells};
use crate::config::EnhancementOptions;
use crate::dom::{HtmlDocument, NodeId};
use crate::patterns::{
    BRACKET_CITATION_RE, CITATION_MARKER_RE, NUMBERED_CITATION_RE, TABLE_CAPTION_RE,
};
use crate::slug::SlugRegistry;
use crate::validate::checks::heading_level;

/// Containers whose paragraphs are never regrouped.
const FIXED_CONTAINERS: &[&str] = &["li", "td", "th", "figure", "nav", "details", "pre"];

pub fn semantics(mut doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    let mut slugs = SlugRegistry::with_reserved(doc.ids());
    if opts.semantic_lists {
        reference_lists(&mut doc, &mut slugs);
    }
    if opts.detect_tables {
        text_tables(&mut doc, &mut slugs);
    }
    doc
}

/// Consecutive sibling paragraphs for which `key` yields a value. Runs are
/// broken by any other element or by non-blank text.
fn paragraph_runs<K>(
    doc: &HtmlDocument,
    key: impl Fn(NodeId) -> Option<K>,
) -> Vec<Vec<(NodeId, K)>> {
    let mut runs = Vec::new();
    let parents: Vec<NodeId> = doc
        .elements()
        .filter(|&e| !doc.tag(e).is_some_and(|t| FIXED_CONTAINERS.contains(&t)))
        .collect();

    for parent in parents {
        let mut run: Vec<(NodeId, K)> = Vec::new();
        for child in doc.children(parent) {
            if doc.text(child).is_some_and(|t| t.trim().is_empty()) {
                continue;
            }
            match doc.is_tag(child, "p").then(|| key(child)).flatten() {
                Some(k) => run.push((child, k)),
                None => {
                    if run.len() >= 2 {
                        runs.push(std::mem::take(&mut run));
                    }
                    run.clear();
                }
            }
        }
        if run.len() >= 2 {
            runs.push(run);
        }
    }
    runs
}

/// Paragraphs that follow a references heading.
fn reference_paragraphs(doc: &HtmlDocument) -> HashSet<NodeId> {
    let mut inside = false;
    let mut found = HashSet::new();
    for el in doc.elements() {
        if heading_level(doc, el).is_some() {
            inside = is_reference_title(&doc.normalized_text(el));
        } else if inside && doc.is_tag(el, "p") {
            found.insert(el);
        }
    }
    found
}

fn reference_lists(doc: &mut HtmlDocument, slugs: &mut SlugRegistry) {
    let in_references = reference_paragraphs(doc);
    let runs = paragraph_runs(doc, |p| {
        let text = doc.normalized_text(p);
        let caps = BRACKET_CITATION_RE.captures(&text).or_else(|| {
            in_references
                .contains(&p)
                .then(|| NUMBERED_CITATION_RE.captures(&text))
                .flatten()
        })?;
        caps["num"].parse::<u32>().ok()
    });

    for run in runs {
        let Some(&(first, _)) = run.first() else {
            continue;
        };
        let list = doc.create_element("ol", &[("class", "references-list")]);
        doc.insert_before(first, list);
        for (paragraph, number) in &run {
            strip_marker(doc, *paragraph);
            let id = slugs.claim(format!("ref-{number}"));
            let value = number.to_string();
            let item = doc.create_element("li", &[("id", id.as_str()), ("value", value.as_str())]);
            doc.reparent_children(*paragraph, item);
            doc.append(list, item);
            doc.detach(*paragraph);
        }
        info!(entries = run.len(), "Converted citation run to a reference list");
    }
}

/// Drop the "[12]" or "12." marker from the paragraph's leading text.
fn strip_marker(doc: &mut HtmlDocument, paragraph: NodeId) {
    let Some(first) = doc.first_child(paragraph) else {
        return;
    };
    let Some(text) = doc.text(first) else {
        return;
    };
    if let Some(marker) = CITATION_MARKER_RE.find(text) {
        let rest = text[marker.end()..].to_string();
        doc.set_text(first, &rest);
    }
}

/// Cells of a paragraph that is a single line of plain delimited text.
fn row_cells(doc: &HtmlDocument, paragraph: NodeId) -> Option<(Delimiter, Vec<String>)> {
    if !doc.children(paragraph).all(|c| doc.text(c).is_some()) {
        return None;
    }
    let text = doc.text_content(paragraph);
    let line = text.trim();
    if line.contains('\n') {
        return None;
    }
    split_cells(line)
}

fn text_tables(doc: &mut HtmlDocument, slugs: &mut SlugRegistry) {
    let runs = paragraph_runs(doc, |p| row_cells(doc, p));

    for run in runs {
        let (delimiter, width) = (run[0].1.0, run[0].1.1.len());
        if run.iter().any(|(_, (d, cells))| *d != delimiter || cells.len() != width) {
            debug!(rows = run.len(), "Skipping table-shaped run with inconsistent columns");
            continue;
        }
        let first = run[0].0;
        let caption = caption_before(doc, first);
        let number = caption
            .and_then(|(_, n)| n)
            .unwrap_or_else(|| doc.elements_by_tag("table").count() as u32 + 1);
        let id = slugs.claim(format!("table-{number}"));

        let table = doc.create_element("table", &[("id", id.as_str())]);
        if let Some((paragraph, _)) = caption {
            let caption = doc.create_element("caption", &[]);
            doc.reparent_children(paragraph, caption);
            doc.append(table, caption);
            doc.detach(paragraph);
        }

        let rows: Vec<&Vec<String>> = run.iter().map(|(_, (_, cells))| cells).collect();
        let head = doc.create_element("thead", &[]);
        let header = doc.create_element("tr", &[]);
        for cell in rows[0] {
            let th = doc.create_text_element("th", &[("scope", "col")], cell);
            doc.append(header, th);
        }
        doc.append(head, header);
        doc.append(table, head);

        let body = doc.create_element("tbody", &[]);
        for row in &rows[1..] {
            let tr = doc.create_element("tr", &[]);
            for cell in row.iter() {
                let td = doc.create_text_element("td", &[], cell);
                doc.append(tr, td);
            }
            doc.append(body, tr);
        }
        doc.append(table, body);

        doc.insert_before(first, table);
        for (paragraph, _) in &run {
            doc.detach(*paragraph);
        }
        info!(id = %id, rows = run.len(), "Converted delimited paragraphs to a table");
    }
}

/// A "Table N" paragraph directly before `first`, with its number.
fn caption_before(doc: &HtmlDocument, first: NodeId) -> Option<(NodeId, Option<u32>)> {
    let mut cursor = doc.prev_sibling(first);
    while let Some(node) = cursor {
        if doc.text(node).is_some_and(|t| t.trim().is_empty()) {
            cursor = doc.prev_sibling(node);
            continue;
        }
        if !doc.is_tag(node, "p") {
            return None;
        }
        let text = doc.normalized_text(node);
        let caps = TABLE_CAPTION_RE.captures(&text)?;
        return Some((node, caps["num"].parse().ok()));
    }
    None
}
