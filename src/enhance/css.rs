//! Phase 5: the accessibility stylesheet.
//!
//! The stylesheet lives in a single `<style>` element tagged with
//! `data-wcagify="accessibility"`. Rerunning the phase rewrites that element
//! in place, so options can change between runs without stacking copies.

use std::fmt::Write;

use tracing::debug;

use crate::config::EnhancementOptions;
use crate::dom::{HtmlDocument, NodeId};

/// First line of the generated stylesheet.
pub const STYLE_MARKER: &str = "/* wcagify:accessibility-styles */";

const STYLE_ATTR: &str = "data-wcagify";
const STYLE_ATTR_VALUE: &str = "accessibility";

const BASE: &str = "\
:root {
  --color-text: #1f1f1f;
  --color-text-muted: #595959;
  --color-bg: #ffffff;
  --color-bg-alt: #f7f7f7;
  --color-accent: #0055aa;
  --color-accent-dark: #003d7a;
  --color-border: #cccccc;
  --color-focus: #0066cc;
}
body {
  max-width: 48rem;
  margin: 0 auto;
  padding: 1rem;
  font-family: system-ui, -apple-system, \"Segoe UI\", sans-serif;
  font-size: 1rem;
  line-height: 1.6;
  color: var(--color-text);
  background: var(--color-bg);
}
a { color: var(--color-accent); text-decoration: underline; }
a:hover { color: var(--color-accent-dark); }
.skip-link {
  position: absolute;
  left: 1rem;
  top: -10rem;
  padding: 0.5rem 1rem;
  color: var(--color-bg);
  background: var(--color-accent);
  z-index: 100;
}
.skip-link:focus { top: 1rem; }
img { max-width: 100%; height: auto; }
figure { margin: 1.5rem 0; }
figcaption { color: var(--color-text-muted); font-size: 0.95rem; }
table { border-collapse: collapse; margin: 1.5rem 0; }
caption { text-align: left; font-weight: 600; }
th, td { border: 1px solid var(--color-border); padding: 0.4rem 0.6rem; text-align: left; }
th { color: var(--color-text); background: var(--color-bg-alt); }
.references-list li { margin-bottom: 0.5rem; }
.needs-review {
  border-left: 4px solid var(--color-border);
  padding: 0.5rem 1rem;
  color: var(--color-text);
  background: var(--color-bg-alt);
}
.accessibility-info { color: var(--color-text-muted); font-size: 0.9rem; }
";

const DARK: &str = "\
@media (prefers-color-scheme: dark) {
  :root {
    --color-text: #e8e8e8;
    --color-text-muted: #b0b0b0;
    --color-bg: #121212;
    --color-bg-alt: #1e1e1e;
    --color-accent: #8ab4f8;
    --color-accent-dark: #aecbfa;
    --color-border: #444444;
    --color-focus: #8ab4f8;
  }
}
";

const REDUCED_MOTION: &str = "\
@media (prefers-reduced-motion: reduce) {
  *, *::before, *::after {
    animation-duration: 0.01ms !important;
    animation-iteration-count: 1 !important;
    transition-duration: 0.01ms !important;
    scroll-behavior: auto !important;
  }
}
";

const PRINT: &str = "\
@media print {
  body { max-width: none; color: #000000; background: #ffffff; }
  .skip-link, nav[aria-label=\"Table of contents\"] { display: none; }
  a[href^=\"http\"]::after { content: \" (\" attr(href) \")\"; }
}
";

/// Render the stylesheet for a set of options.
pub fn stylesheet(opts: &EnhancementOptions) -> String {
    let mut css = String::with_capacity(4096);
    let _ = writeln!(css, "{STYLE_MARKER}");
    css.push_str(BASE);

    let width = opts.focus_outline_width.max(3);
    let _ = write!(
        css,
        ":focus:not(:focus-visible) {{ outline: none; }}\n\
         :focus-visible {{ outline: {width}px solid var(--color-focus); outline-offset: 2px; }}\n"
    );

    if opts.wcag_version.is_2_2() {
        let target = opts.target_size_minimum.max(24);
        let _ = write!(
            css,
            ":focus, :target {{ scroll-margin-top: 5rem; scroll-margin-bottom: 5rem; }}\n\
             button, input, select, summary, [role=\"button\"] {{ min-width: {target}px; min-height: {target}px; }}\n"
        );
    }
    if opts.dark_mode {
        css.push_str(DARK);
    }
    if opts.reduced_motion {
        css.push_str(REDUCED_MOTION);
    }
    if opts.print_styles {
        css.push_str(PRINT);
    }
    css
}

fn is_accessibility_style(doc: &HtmlDocument, style: NodeId) -> bool {
    doc.attr(style, STYLE_ATTR) == Some(STYLE_ATTR_VALUE)
        || doc.text_content(style).trim_start().starts_with(STYLE_MARKER)
}

pub fn inject_css(mut doc: HtmlDocument, opts: &EnhancementOptions) -> HtmlDocument {
    if !opts.inject_css {
        return doc;
    }
    let css = stylesheet(opts);
    let existing = doc
        .elements_by_tag("style")
        .find(|&s| is_accessibility_style(&doc, s));

    match existing {
        Some(style) => {
            let children: Vec<NodeId> = doc.children(style).collect();
            for child in children {
                doc.detach(child);
            }
            doc.append_text(style, &css);
            doc.set_attr_if_missing(style, STYLE_ATTR, STYLE_ATTR_VALUE);
            debug!("Replaced accessibility stylesheet");
        }
        None => {
            let Some(head) = doc.head() else {
                return doc;
            };
            let style = doc.create_text_element("style", &[(STYLE_ATTR, STYLE_ATTR_VALUE)], &css);
            doc.append(head, style);
            debug!("Injected accessibility stylesheet");
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WcagVersion;
    use crate::enhance::tests::run_phase;
    use crate::validate::{Stylesheet, contrast};

    #[test]
    fn stylesheet_follows_options() {
        let css = stylesheet(&EnhancementOptions::default());
        assert!(css.starts_with(STYLE_MARKER));
        assert!(css.contains("prefers-color-scheme: dark"));
        assert!(css.contains("prefers-reduced-motion: reduce"));
        assert!(css.contains("@media print"));
        assert!(css.contains("min-width: 24px; min-height: 24px;"));
        assert!(css.contains("outline: 3px solid var(--color-focus)"));

        let opts = EnhancementOptions {
            wcag_version: WcagVersion::V2_1,
            dark_mode: false,
            focus_outline_width: 4,
            ..Default::default()
        };
        let css = stylesheet(&opts);
        assert!(!css.contains("min-height"));
        assert!(!css.contains("prefers-color-scheme"));
        assert!(css.contains("outline: 4px solid"));
    }

    #[test]
    fn palettes_meet_contrast() {
        let sheet = Stylesheet::parse(&stylesheet(&EnhancementOptions::default()));
        let schemes = sheet.schemes();
        assert_eq!(schemes.len(), 4);
        for scheme in &schemes {
            let page = sheet.page_background(scheme);
            let text = scheme.resolve("var(--color-text)").and_then(|v| contrast::parse_color(&v));
            let text = text.expect("text color resolves");
            assert!(contrast::contrast_ratio(text, page) >= 4.5, "{}", scheme.label());
        }
    }

    #[test]
    fn rerun_replaces_in_place() {
        let opts = EnhancementOptions::default();
        let once = run_phase(inject_css, "<p>x</p>", &opts);
        assert_eq!(once.matches("<style").count(), 1);
        assert!(once.contains("<style data-wcagify=\"accessibility\">"));

        let changed = EnhancementOptions {
            print_styles: false,
            ..Default::default()
        };
        let again = run_phase(inject_css, &once, &changed);
        assert_eq!(again.matches("<style").count(), 1);
        assert!(!again.contains("@media print"));
    }

    #[test]
    fn untagged_marker_style_is_adopted() {
        let html = format!("<style>{STYLE_MARKER}\nbody {{}}</style><p>x</p>");
        let out = run_phase(inject_css, &html, &EnhancementOptions::default());
        assert_eq!(out.matches("<style").count(), 1);
        assert!(out.contains("data-wcagify=\"accessibility\""));
    }
}
