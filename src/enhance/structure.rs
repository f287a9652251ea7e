//! Phase 1: document structure.

use tracing::{debug, info};

use crate::config::EnhancementOptions;
use crate::dom::{HtmlDocument, NodeId};
use crate::generate::MAIN_ID;
use crate::slug::SlugRegistry;
use crate::validate::checks::{heading_level, is_contentinfo, is_main_landmark, is_skip_link};

const UNTITLED: &str = "Untitled document";

/// Ancestors that scope a `header` or `footer` to a section.
const SECTIONING: &[&str] = &["article", "aside", "main", "nav", "section"];

pub fn structure(mut doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    set_language(&mut doc, opts);
    set_title(&mut doc, opts);
    ensure_viewport(&mut doc);

    let Some(body) = doc.body() else {
        return doc;
    };
    let mut slugs = SlugRegistry::with_reserved(doc.ids());

    let main = if opts.aria_landmarks || opts.add_skip_link {
        Some(ensure_main(&mut doc, body, &mut slugs))
    } else {
        doc.elements().find(|&e| is_main_landmark(&doc, e))
    };
    if let (true, Some(main)) = (opts.add_skip_link, main) {
        ensure_skip_link(&mut doc, body, main);
    }
    if opts.aria_landmarks {
        assign_landmark_roles(&mut doc);
        ensure_contentinfo(&mut doc, body, opts);
    }
    if let (true, Some(main)) = (opts.table_of_contents, main) {
        table_of_contents(&mut doc, main, &mut slugs);
    }
    doc
}

fn set_language(doc: &mut HtmlDocument, opts: &EnhancementOptions) {
    let Some(html) = doc.html_element() else {
        return;
    };
    if doc.attr(html, "lang").is_some_and(|l| !l.trim().is_empty()) {
        return;
    }
    doc.set_attr(html, "lang", &opts.language);
    debug!(lang = %opts.language, "Set document language");
}

fn set_title(doc: &mut HtmlDocument, opts: &EnhancementOptions) {
    let existing = doc.first_by_tag("title");
    if existing.is_some_and(|t| !doc.normalized_text(t).is_empty()) {
        return;
    }

    let text = opts
        .document_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            doc.first_by_tag("h1")
                .map(|h| doc.normalized_text(h))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| UNTITLED.to_string());

    match existing {
        Some(title) => {
            let children: Vec<NodeId> = doc.children(title).collect();
            for child in children {
                doc.detach(child);
            }
            let node = doc.create_text(text.as_str());
            doc.append(title, node);
        }
        None => {
            let Some(head) = doc.head() else {
                return;
            };
            let title = doc.create_text_element("title", &[], &text);
            doc.append(head, title);
        }
    }
    debug!(title = %text, "Set document title");
}

fn ensure_viewport(doc: &mut HtmlDocument) {
    let present = doc
        .elements_by_tag("meta")
        .any(|m| doc.attr(m, "name").is_some_and(|n| n.eq_ignore_ascii_case("viewport")));
    if present {
        return;
    }
    let Some(head) = doc.head() else {
        return;
    };
    let meta = doc.create_element(
        "meta",
        &[("name", "viewport"), ("content", "width=device-width, initial-scale=1")],
    );
    doc.append(head, meta);
}

/// Body children that stay outside a synthesized main landmark.
fn stays_outside_main(doc: &HtmlDocument, node: NodeId) -> bool {
    matches!(
        doc.tag(node),
        Some("header" | "footer" | "nav" | "script" | "style" | "template")
    ) || matches!(
        doc.attr(node, "role").map(str::trim),
        Some("banner" | "navigation" | "contentinfo")
    ) || is_skip_link(doc, node)
}

/// Reuse the main landmark or wrap the body content in one, and make sure it
/// has an id to target.
fn ensure_main(doc: &mut HtmlDocument, body: NodeId, slugs: &mut SlugRegistry) -> NodeId {
    let existing = doc.elements().find(|&e| is_main_landmark(doc, e));
    let main = match existing {
        Some(main) => main,
        None => {
            let movable: Vec<NodeId> = doc
                .children(body)
                .filter(|&c| !stays_outside_main(doc, c))
                .collect();
            let main = doc.create_element("main", &[]);
            match movable.first() {
                Some(&first) => doc.insert_before(first, main),
                None => doc.append(body, main),
            }
            for child in movable {
                doc.append(main, child);
            }
            info!("Wrapped body content in a main landmark");
            main
        }
    };

    if !doc.attr(main, "id").is_some_and(|id| !id.trim().is_empty()) {
        let id = slugs.claim(MAIN_ID.to_string());
        doc.set_attr(main, "id", &id);
    }
    main
}

fn ensure_skip_link(doc: &mut HtmlDocument, body: NodeId, main: NodeId) {
    let target = doc.attr(main, "id").unwrap_or(MAIN_ID).to_string();
    let href = format!("#{target}");

    let existing = doc.elements().find(|&e| is_skip_link(doc, e));
    if let Some(link) = existing {
        let current = doc.attr(link, "href").unwrap_or("").trim_start_matches('#');
        if current.is_empty() || doc.find_by_id(current).is_none() {
            doc.set_attr(link, "href", &href);
            info!(target = %target, "Retargeted skip link");
        }
        return;
    }

    let link = doc.create_text_element(
        "a",
        &[("class", "skip-link"), ("href", href.as_str())],
        "Skip to main content",
    );
    doc.prepend(body, link);
    info!("Added skip link");
}

fn assign_landmark_roles(doc: &mut HtmlDocument) {
    let assignments: Vec<(NodeId, &'static str)> = doc
        .elements()
        .filter(|&e| !doc.has_attr(e, "role"))
        .filter_map(|e| match doc.tag(e)? {
            "header" if !doc.has_ancestor_tag(e, SECTIONING) => Some((e, "banner")),
            "footer" if !doc.has_ancestor_tag(e, SECTIONING) => Some((e, "contentinfo")),
            "nav" => Some((e, "navigation")),
            _ => None,
        })
        .collect();
    for (element, role) in assignments {
        doc.set_attr(element, "role", role);
        debug!(role, "Assigned landmark role");
    }
}

fn ensure_contentinfo(doc: &mut HtmlDocument, body: NodeId, opts: &EnhancementOptions) {
    if doc.elements().any(|e| is_contentinfo(doc, e)) {
        return;
    }
    let footer = doc.create_element("footer", &[("role", "contentinfo")]);
    let note = doc.create_text_element(
        "p",
        &[("class", "accessibility-info")],
        &format!(
            "This document was converted for accessibility and targets WCAG {} Level AA.",
            opts.wcag_version
        ),
    );
    doc.append(footer, note);
    doc.append(body, footer);
    info!("Added contentinfo footer");
}

/// Build a contents list from the shallowest heading level that occurs at
/// least twice inside main. Skipped when any navigation landmark exists.
fn table_of_contents(doc: &mut HtmlDocument, main: NodeId, slugs: &mut SlugRegistry) {
    let has_navigation = doc.elements().any(|e| {
        doc.is_tag(e, "nav") || doc.attr(e, "role").map(str::trim) == Some("navigation")
    });
    if has_navigation {
        return;
    }

    let headings: Vec<(NodeId, u8)> = doc
        .descendants(main)
        .filter_map(|d| heading_level(doc, d).map(|l| (d, l)))
        .filter(|&(d, _)| !doc.normalized_text(d).is_empty())
        .collect();
    let Some(level) =
        (1..=6).find(|&l| headings.iter().filter(|&&(_, hl)| hl == l).count() >= 2)
    else {
        return;
    };

    let list = doc.create_element("ol", &[]);
    for &(heading, _) in headings.iter().filter(|&&(_, l)| l == level) {
        let text = doc.normalized_text(heading);
        let id = match doc.attr(heading, "id").filter(|id| !id.trim().is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let id = slugs.unique(&text, "section");
                doc.set_attr(heading, "id", &id);
                id
            }
        };
        let item = doc.create_element("li", &[]);
        let link = doc.create_text_element("a", &[("href", format!("#{id}").as_str())], &text);
        doc.append(item, link);
        doc.append(list, item);
    }

    let nav = doc.create_element(
        "nav",
        &[("role", "navigation"), ("aria-label", "Table of contents")],
    );
    let title = doc.create_text_element("p", &[("class", "toc-title")], "Contents");
    doc.append(nav, title);
    doc.append(nav, list);
    doc.insert_before(main, nav);
    info!(level, "Added table of contents");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::tests::run_phase;

    fn enhance(html: &str) -> String {
        run_phase(structure, html, &EnhancementOptions::default())
    }

    #[test]
    fn bare_fragment_gets_full_structure() {
        let html = enhance("<h1>Report</h1><p>Body</p>");
        assert!(html.starts_with("<html lang=\"en\"><head><title>Report</title><meta name=\"viewport\""));
        assert!(html.contains(
            "<body><a class=\"skip-link\" href=\"#main-content\">Skip to main content</a><main id=\"main-content\"><h1>Report</h1><p>Body</p></main>"
        ));
        assert!(html.contains("<footer role=\"contentinfo\"><p class=\"accessibility-info\">"));
        assert!(html.contains("WCAG 2.2 Level AA"));
        assert!(!html.contains("<nav"));
    }

    #[test]
    fn existing_structure_is_reused() {
        let html = enhance(
            r##"<html lang="fr"><head><title>Rapport</title></head><body>
<header>Site</header><a href="#gone">Skip navigation</a>
<div role="main" id="content"><p>x</p></div><footer>f</footer></body></html>"##,
        );
        assert!(html.contains("<html lang=\"fr\">"));
        assert!(html.contains("<title>Rapport</title>"));
        assert!(html.contains("<header role=\"banner\">"));
        assert!(html.contains("<a href=\"#content\">Skip navigation</a>"));
        assert!(html.contains("<footer role=\"contentinfo\">f</footer>"));
        assert!(!html.contains("<main"));
        assert_eq!(html.matches("<footer").count(), 1);
    }

    #[test]
    fn main_wrap_leaves_page_chrome_outside() {
        let html = enhance("<header>h</header><p>a</p><nav>n</nav><p>b</p><footer>f</footer>");
        assert!(html.contains(
            "<header role=\"banner\">h</header><main id=\"main-content\"><p>a</p><p>b</p></main><nav role=\"navigation\">n</nav><footer role=\"contentinfo\">f</footer>"
        ));
    }

    #[test]
    fn title_falls_back() {
        let opts = EnhancementOptions {
            document_title: Some("Annual report".to_string()),
            ..Default::default()
        };
        let html = run_phase(structure, "<title> </title><h1>Heading</h1>", &opts);
        assert!(html.contains("<title>Annual report</title>"));
        assert!(enhance("<p>x</p>").contains("<title>Untitled document</title>"));
    }

    #[test]
    fn contents_from_repeated_level() {
        let html = enhance(
            "<h1>Paper</h1><h2>Method</h2><p>x</p><h2 id=\"res\">Results</h2><h3>Detail</h3>",
        );
        assert!(html.contains(
            "<nav role=\"navigation\" aria-label=\"Table of contents\"><p class=\"toc-title\">Contents</p><ol><li><a href=\"#method\">Method</a></li><li><a href=\"#res\">Results</a></li></ol></nav><main"
        ));
        assert!(html.contains("<h2 id=\"method\">Method</h2>"));
    }

    #[test]
    fn options_disable_insertions() {
        let opts = EnhancementOptions {
            add_skip_link: false,
            aria_landmarks: false,
            table_of_contents: false,
            ..Default::default()
        };
        let html = run_phase(structure, "<h2>A</h2><h2>B</h2>", &opts);
        assert!(!html.contains("<main"));
        assert!(!html.contains("skip-link"));
        assert!(!html.contains("<footer"));
        assert!(!html.contains("<nav"));
    }
}
