//! Phase 6: cleanup.

use tracing::debug;

use crate::config::EnhancementOptions;
use crate::dom::{HtmlDocument, NodeId};
use crate::validate::css::{parse_declarations, serialize_declarations};

/// Wrappers that carry no meaning once empty.
const PRUNABLE: &[&str] = &["div", "span", "p", "section"];

pub fn cleanup(mut doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    if opts.cleanup {
        strip_outline_suppression(&mut doc);
        let mut pruned = 0usize;
        let root = doc.document();
        walk_bottom_up(&mut doc, root, &mut |doc, node| {
            if is_prunable(doc, node) {
                doc.detach(node);
                pruned += 1;
            }
        });
        if pruned > 0 {
            debug!(pruned, "Removed empty wrappers");
        }
    }
    let root = doc.document();
    doc.normalize_text(root);
    doc
}

/// Visit every node below `parent` after its children.
fn walk_bottom_up<F>(doc: &mut HtmlDocument, parent: NodeId, visitor: &mut F)
where
    F: FnMut(&mut HtmlDocument, NodeId),
{
    let mut child = doc.first_child(parent);
    while let Some(id) = child {
        // The visitor may detach `id`, which clears its sibling link.
        child = doc.next_sibling(id);
        walk_bottom_up(doc, id, visitor);
        visitor(doc, id);
    }
}

/// Drop inline `outline: none` and friends; the injected stylesheet owns
/// focus indication.
fn strip_outline_suppression(doc: &mut HtmlDocument) {
    let styled: Vec<NodeId> = doc.elements().filter(|&e| doc.has_attr(e, "style")).collect();
    for el in styled {
        let Some(style) = doc.attr(el, "style") else {
            continue;
        };
        let declarations = parse_declarations(style);
        let kept: Vec<_> = declarations
            .iter()
            .filter(|d| !d.removes_outline())
            .cloned()
            .collect();
        if kept.len() == declarations.len() {
            continue;
        }
        if kept.is_empty() {
            doc.remove_attr(el, "style");
        } else {
            let value = serialize_declarations(&kept);
            doc.set_attr(el, "style", &value);
        }
        debug!(element = %doc.path(el), "Removed inline outline suppression");
    }
}

fn is_prunable(doc: &HtmlDocument, node: NodeId) -> bool {
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    if !PRUNABLE.contains(&tag) {
        return false;
    }
    let meaningful = doc.attrs(node).iter().any(|a| {
        let name = a.name.as_str();
        name == "id" || name == "role" || name.starts_with("aria-")
    });
    !meaningful
        && doc
            .children(node)
            .all(|c| doc.text(c).is_some_and(|t| t.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::tests::run_phase;

    fn enhance(html: &str) -> String {
        run_phase(cleanup, html, &EnhancementOptions::default())
    }

    #[test]
    fn inline_outline_suppression_is_removed() {
        let html = enhance(
            "<a href=\"#x\" style=\"outline: none; color: #333\">x</a><button style=\"outline:0\">b</button><span style=\"margin: 0\">m</span>",
        );
        assert!(html.contains("<a href=\"#x\" style=\"color: #333\">x</a>"));
        assert!(html.contains("<button>b</button>"));
        assert!(html.contains("<span style=\"margin: 0\">m</span>"));
    }

    #[test]
    fn empty_wrappers_collapse() {
        let html = enhance("<div><p> </p><span></span></div><p>kept</p><div id=\"anchor\"></div><p>a<span></span>b</p>");
        assert!(html.contains("<body><p>kept</p><div id=\"anchor\"></div><p>ab</p></body>"));
    }

    #[test]
    fn disabled_cleanup_still_merges_text() {
        let opts = EnhancementOptions {
            cleanup: false,
            ..Default::default()
        };
        let html = run_phase(cleanup, "<div></div><p style=\"outline: none\">x</p>", &opts);
        assert!(html.contains("<div></div>"));
        assert!(html.contains("style=\"outline: none\""));
    }
}
