//! Phase 4: in-text figure and table references become in-page links.

use std::collections::HashSet;

use tracing::debug;

use crate::config::EnhancementOptions;
use crate::dom::{HtmlDocument, NodeId};
use crate::patterns::CROSS_REF_RE;

/// Text below these elements is never linked.
const EXCLUDED: &[&str] = &[
    "a", "h1", "h2", "h3", "h4", "h5", "h6", "figcaption", "caption", "code", "pre", "script",
    "style", "title", "button", "summary", "textarea", "svg", "math",
];

pub fn cross_references(mut doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    if !opts.cross_reference_links {
        return doc;
    }
    let Some(body) = doc.body() else {
        return doc;
    };
    let ids = doc.ids();
    let nodes: Vec<NodeId> = doc
        .descendants(body)
        .filter(|&n| doc.text(n).is_some_and(|t| CROSS_REF_RE.is_match(t)))
        .filter(|&n| !doc.has_ancestor_tag(n, EXCLUDED))
        .collect();

    let mut linked = 0usize;
    for node in nodes {
        linked += link_text_node(&mut doc, node, &ids);
    }
    if linked > 0 {
        debug!(linked, "Linked figure and table references");
    }
    doc
}

/// Split one text node around each resolvable reference. Returns the number
/// of links created.
fn link_text_node(doc: &mut HtmlDocument, node: NodeId, ids: &HashSet<String>) -> usize {
    let Some(text) = doc.text(node).map(str::to_string) else {
        return 0;
    };

    let mut cursor = 0;
    let mut linked = 0;
    for caps in CROSS_REF_RE.captures_iter(&text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if is_range(&text[whole.end()..]) {
            continue;
        }
        let prefix = if &caps["kind"] == "Table" { "table" } else { "figure" };
        let target = format!("{prefix}-{}", &caps["num"]);
        if !ids.contains(&target) {
            continue;
        }

        if whole.start() > cursor {
            let before = doc.create_text(&text[cursor..whole.start()]);
            doc.insert_before(node, before);
        }
        let href = format!("#{target}");
        let link = doc.create_text_element("a", &[("href", href.as_str())], whole.as_str());
        doc.insert_before(node, link);
        cursor = whole.end();
        linked += 1;
    }

    if linked > 0 {
        if cursor < text.len() {
            doc.set_text(node, &text[cursor..]);
        } else {
            doc.detach(node);
        }
    }
    linked
}

/// "Figures 2-4" style ranges are left as text.
fn is_range(rest: &str) -> bool {
    rest.trim_start()
        .strip_prefix(['-', '–', '—'])
        .is_some_and(|r| r.trim_start().starts_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::tests::run_phase;

    fn enhance(html: &str) -> String {
        run_phase(cross_references, html, &EnhancementOptions::default())
    }

    #[test]
    fn references_link_to_existing_targets() {
        let html = enhance(
            "<p>As Figure 2 and Table 1 show, Fig. 2 agrees.</p><figure id=\"figure-2\"></figure><table id=\"table-1\"></table>",
        );
        assert!(html.contains(
            "<p>As <a href=\"#figure-2\">Figure 2</a> and <a href=\"#table-1\">Table 1</a> show, <a href=\"#figure-2\">Fig. 2</a> agrees.</p>"
        ));
    }

    #[test]
    fn unresolved_and_excluded_text_is_untouched() {
        let html = enhance(
            "<h2>Figure 1 overview</h2><p>See Figure 9.</p><p>Figure 1<code>Figure 1</code></p><figure id=\"figure-1\"><figcaption>Figure 1: x</figcaption></figure>",
        );
        assert!(html.contains("<h2>Figure 1 overview</h2>"));
        assert!(html.contains("<p>See Figure 9.</p>"));
        assert!(html.contains("<p><a href=\"#figure-1\">Figure 1</a><code>Figure 1</code></p>"));
        assert!(html.contains("<figcaption>Figure 1: x</figcaption>"));
    }

    #[test]
    fn ranges_are_skipped() {
        let html = enhance("<p>Tables 1-3 and Table 1 – 2 differ from Table 1.</p><table id=\"table-1\"></table>");
        assert_eq!(html.matches("<a ").count(), 1);
        assert!(html.contains("from <a href=\"#table-1\">Table 1</a>.</p>"));
    }
}
