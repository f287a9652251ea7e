//! The check catalogue.

use std::collections::HashSet;

use cssparser::{ParseError, Parser, ParserInput, Token};

use super::contrast::{Rgba, contrast_ratio, parse_color};
use super::css::{ColorValue, CssRule, Declaration, Scheme, parse_declarations};
use super::{Check, CheckContext, Conformance, Findings};
use crate::config::WcagVersion;
use crate::dom::{HtmlDocument, NodeId};
use crate::patterns::{GENERIC_ALT_RE, GENERIC_LINK_RE};

/// Every check, in report order.
pub static CATALOGUE: &[&dyn Check] = &[
    &Language,
    &PageTitle,
    &BypassBlocks,
    &Landmarks,
    &Headings,
    &Images,
    &Links,
    &Tables,
    &Forms,
    &Contrast,
    &FocusVisible,
    &FocusNotObscured,
    &FocusAppearance,
    &TargetSize,
    &ReadingOrder,
    &Presentational,
    &Viewport,
];

const MIN_CONTRAST: f64 = 4.5;
const MIN_NON_TEXT_CONTRAST: f64 = 3.0;
const MIN_FOCUS_WIDTH: f32 = 2.0;
const MIN_TARGET: f32 = 24.0;

// =============================================================================
// Shared element predicates
// =============================================================================

fn location(doc: &HtmlDocument, id: NodeId) -> Option<String> {
    Some(doc.path(id))
}

fn role(doc: &HtmlDocument, id: NodeId) -> Option<&str> {
    doc.attr(id, "role").map(str::trim).filter(|r| !r.is_empty())
}

fn is_presentational(doc: &HtmlDocument, id: NodeId) -> bool {
    matches!(role(doc, id), Some("presentation" | "none"))
}

/// Hidden from assistive technology by `aria-hidden` or `hidden`.
fn is_hidden(doc: &HtmlDocument, id: NodeId) -> bool {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .any(|n| doc.attr(n, "aria-hidden") == Some("true") || doc.has_attr(n, "hidden"))
}

/// `h1`..`h6` level of an element.
pub(crate) fn heading_level(doc: &HtmlDocument, id: NodeId) -> Option<u8> {
    doc.tag(id)?
        .strip_prefix('h')?
        .parse::<u8>()
        .ok()
        .filter(|l| (1..=6).contains(l))
}

/// An in-page link whose class or text marks it as a skip link.
pub(crate) fn is_skip_link(doc: &HtmlDocument, id: NodeId) -> bool {
    doc.is_tag(id, "a")
        && doc.attr(id, "href").is_some_and(|h| h.starts_with('#'))
        && (doc.has_class(id, "skip-link")
            || doc.normalized_text(id).to_lowercase().starts_with("skip"))
}

pub(crate) fn is_main_landmark(doc: &HtmlDocument, id: NodeId) -> bool {
    match role(doc, id) {
        Some(r) => r == "main",
        None => doc.is_tag(id, "main"),
    }
}

/// A `footer` scoped to the page, or an explicit `contentinfo` role.
pub(crate) fn is_contentinfo(doc: &HtmlDocument, id: NodeId) -> bool {
    match role(doc, id) {
        Some(r) => r == "contentinfo",
        None => {
            doc.is_tag(id, "footer")
                && !doc.has_ancestor_tag(id, &["article", "aside", "main", "nav", "section"])
        }
    }
}

/// Accessible name from `aria-label`, `aria-labelledby`, content
/// (including image alt text) or `title`, in that order.
pub(crate) fn accessible_name(doc: &HtmlDocument, id: NodeId) -> String {
    if let Some(label) = doc.attr(id, "aria-label").map(str::trim).filter(|l| !l.is_empty()) {
        return label.to_string();
    }
    if let Some(refs) = doc.attr(id, "aria-labelledby") {
        let text = refs
            .split_whitespace()
            .filter_map(|r| doc.find_by_id(r))
            .map(|n| doc.normalized_text(n))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            return text;
        }
    }

    let mut content = String::new();
    for node in doc.descendants(id) {
        if let Some(text) = doc.text(node) {
            content.push_str(text);
        } else if doc.is_tag(node, "img") {
            if let Some(alt) = doc.attr(node, "alt") {
                content.push(' ');
                content.push_str(alt);
                content.push(' ');
            }
        }
    }
    let content = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if !content.is_empty() {
        return content;
    }
    doc.attr(id, "title").map(str::trim).unwrap_or("").to_string()
}

// =============================================================================
// Document checks
// =============================================================================

struct Language;

impl Check for Language {
    fn id(&self) -> &'static str {
        "language"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let html = doc.html_element();
        let lang = html.and_then(|h| doc.attr(h, "lang")).map_or("", str::trim);
        if lang.is_empty() {
            findings.push(
                "3.1.1",
                Conformance::A,
                "Document language is not set on <html lang>",
                html.and_then(|h| location(doc, h)),
            );
        }
    }
}

struct PageTitle;

impl Check for PageTitle {
    fn id(&self) -> &'static str {
        "page-title"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        match doc.first_by_tag("title") {
            None => findings.push("2.4.2", Conformance::A, "Document has no <title>", None),
            Some(title) if doc.normalized_text(title).is_empty() => findings.push(
                "2.4.2",
                Conformance::A,
                "Document <title> is empty",
                location(doc, title),
            ),
            Some(_) => {}
        }
    }
}

struct BypassBlocks;

impl Check for BypassBlocks {
    fn id(&self) -> &'static str {
        "bypass-blocks"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let Some(link) = doc.elements().find(|&e| is_skip_link(doc, e)) else {
            findings.push(
                "2.4.1",
                Conformance::A,
                "No skip link to bypass repeated content",
                None,
            );
            return;
        };
        let target = doc
            .attr(link, "href")
            .map_or("", |h| h.trim_start_matches('#'));
        if target.is_empty() || doc.find_by_id(target).is_none() {
            findings.push(
                "2.4.1",
                Conformance::A,
                format!("Skip link target #{target} does not exist"),
                location(doc, link),
            );
        }
    }
}

struct Landmarks;

impl Check for Landmarks {
    fn id(&self) -> &'static str {
        "landmarks"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let mains: Vec<NodeId> = doc.elements().filter(|&e| is_main_landmark(doc, e)).collect();
        match mains.as_slice() {
            [] => findings.push("1.3.1", Conformance::A, "No main landmark", None),
            [_] => {}
            [_, extra @ ..] => {
                for &main in extra {
                    findings.push(
                        "1.3.1",
                        Conformance::AA,
                        "More than one main landmark",
                        location(doc, main),
                    );
                }
            }
        }
        if !doc.elements().any(|e| is_contentinfo(doc, e)) {
            findings.push(
                "1.3.1",
                Conformance::BestPractice,
                "No contentinfo landmark (page footer)",
                None,
            );
        }
    }
}

struct Headings;

impl Check for Headings {
    fn id(&self) -> &'static str {
        "headings"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let headings: Vec<(NodeId, u8)> = doc
            .elements()
            .filter_map(|e| heading_level(doc, e).map(|l| (e, l)))
            .collect();
        if headings.is_empty() {
            findings.push(
                "2.4.6",
                Conformance::BestPractice,
                "Document has no headings",
                None,
            );
            return;
        }
        if !headings.iter().any(|&(_, l)| l == 1) {
            findings.push("2.4.6", Conformance::AA, "Document has no h1", None);
        }

        let mut prev = 0u8;
        let mut seen_h1 = false;
        for &(heading, level) in &headings {
            let has_content = !doc.normalized_text(heading).is_empty()
                || doc.descendants(heading).any(|d| {
                    doc.is_tag(d, "img") && doc.attr(d, "alt").is_some_and(|a| !a.trim().is_empty())
                });
            if !has_content {
                findings.push(
                    "2.4.6",
                    Conformance::AA,
                    format!("Empty h{level}"),
                    location(doc, heading),
                );
            }
            if prev > 0 && level > prev + 1 {
                findings.push(
                    "1.3.1",
                    Conformance::AA,
                    format!("Heading level skips from h{prev} to h{level}"),
                    location(doc, heading),
                );
            }
            if level == 1 {
                if seen_h1 {
                    findings.push(
                        "1.3.1",
                        Conformance::BestPractice,
                        "Multiple h1 elements",
                        location(doc, heading),
                    );
                }
                seen_h1 = true;
            }
            prev = level;
        }
    }
}

// =============================================================================
// Content checks
// =============================================================================

struct Images;

impl Check for Images {
    fn id(&self) -> &'static str {
        "images"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        for img in doc.elements_by_tag("img") {
            if is_hidden(doc, img) {
                continue;
            }
            let src = doc.attr(img, "src").unwrap_or("");
            match doc.attr(img, "alt").map(str::trim) {
                None => findings.push(
                    "1.1.1",
                    Conformance::A,
                    format!("Image {src} has no alt attribute"),
                    location(doc, img),
                ),
                Some("") if !is_presentational(doc, img) => findings.push(
                    "1.1.1",
                    Conformance::BestPractice,
                    format!("Image {src} has empty alt text but is not marked presentational"),
                    location(doc, img),
                ),
                Some(alt) if GENERIC_ALT_RE.is_match(alt) => findings.push(
                    "1.1.1",
                    Conformance::AA,
                    format!("Alt text \"{alt}\" does not describe the image"),
                    location(doc, img),
                ),
                Some(_) => {}
            }
        }
    }
}

struct Links;

impl Check for Links {
    fn id(&self) -> &'static str {
        "links"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let ids = doc.ids();
        for link in doc.elements_by_tag("a") {
            let Some(href) = doc.attr(link, "href") else {
                continue;
            };
            if is_hidden(doc, link) {
                continue;
            }
            let name = accessible_name(doc, link);
            if name.is_empty() {
                findings.push(
                    "2.4.4",
                    Conformance::A,
                    format!("Link to {href} has no accessible name"),
                    location(doc, link),
                );
            } else if GENERIC_LINK_RE.is_match(&name) {
                findings.push(
                    "2.4.4",
                    Conformance::AA,
                    format!("Link text \"{name}\" does not describe its destination"),
                    location(doc, link),
                );
            }
            if let Some(target) = href.strip_prefix('#') {
                if !target.is_empty() && target != "top" && !ids.contains(target) {
                    findings.push(
                        "2.4.4",
                        Conformance::BestPractice,
                        format!("In-page link points to missing id #{target}"),
                        location(doc, link),
                    );
                }
            }
        }
    }
}

struct Tables;

impl Check for Tables {
    fn id(&self) -> &'static str {
        "tables"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        for table in doc.elements_by_tag("table") {
            if is_presentational(doc, table) {
                continue;
            }
            // Cells of nested tables belong to those tables.
            let owned = |cell: NodeId| doc.ancestors(cell).find(|&a| doc.is_tag(a, "table")) == Some(table);
            let headers: Vec<NodeId> = doc
                .descendants(table)
                .filter(|&d| doc.is_tag(d, "th") && owned(d))
                .collect();

            if headers.is_empty() {
                findings.push(
                    "1.3.1",
                    Conformance::A,
                    "Data table has no header cells",
                    location(doc, table),
                );
            }
            let unscoped = headers.iter().filter(|&&th| !doc.has_attr(th, "scope")).count();
            if unscoped > 0 {
                findings.push(
                    "1.3.1",
                    Conformance::BestPractice,
                    format!("{unscoped} header cell(s) without scope"),
                    location(doc, table),
                );
            }

            let captioned = doc
                .child_elements(table)
                .any(|c| doc.is_tag(c, "caption") && !doc.normalized_text(c).is_empty());
            let labelled = doc.has_attr(table, "aria-labelledby")
                || doc.attr(table, "aria-label").is_some_and(|l| !l.trim().is_empty());
            if !captioned && !labelled {
                findings.push(
                    "1.3.1",
                    Conformance::BestPractice,
                    "Table has no caption or accessible name",
                    location(doc, table),
                );
            }
        }
    }
}

struct Forms;

impl Check for Forms {
    fn id(&self) -> &'static str {
        "forms"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let label_targets: HashSet<&str> = doc
            .elements_by_tag("label")
            .filter_map(|l| doc.attr(l, "for"))
            .collect();

        for el in doc.elements() {
            let Some(tag) = doc.tag(el) else {
                continue;
            };
            let control = match tag {
                "select" | "textarea" => true,
                "input" => !matches!(
                    doc.attr(el, "type").map(|t| t.trim().to_ascii_lowercase()).as_deref(),
                    Some("hidden" | "submit" | "button" | "reset" | "image")
                ),
                _ => false,
            };
            if !control || is_hidden(doc, el) {
                continue;
            }
            let labelled = doc.attr(el, "aria-label").is_some_and(|l| !l.trim().is_empty())
                || doc.has_attr(el, "aria-labelledby")
                || doc.attr(el, "title").is_some_and(|t| !t.trim().is_empty())
                || doc.has_ancestor_tag(el, &["label"])
                || doc.attr(el, "id").is_some_and(|id| label_targets.contains(id));
            if !labelled {
                findings.push(
                    "1.3.1",
                    Conformance::A,
                    format!("Form control <{tag}> has no label"),
                    location(doc, el),
                );
            }
        }
    }
}

// =============================================================================
// Style checks
// =============================================================================

fn inline_rules(doc: &HtmlDocument) -> impl Iterator<Item = (NodeId, CssRule)> + '_ {
    doc.elements().filter_map(move |el| {
        let style = doc.attr(el, "style")?;
        Some((
            el,
            CssRule {
                selectors: Vec::new(),
                declarations: parse_declarations(style),
                media: None,
            },
        ))
    })
}

struct Contrast;

impl Contrast {
    fn evaluate(
        rule: &CssRule,
        scheme: &Scheme<'_>,
        location: String,
        seen: &mut HashSet<(String, String)>,
        findings: &mut Findings,
    ) {
        let (fg, bg) = match (rule.color(scheme), rule.background(scheme)) {
            (ColorValue::Missing, _) | (_, ColorValue::Missing) => return,
            (ColorValue::Color(fg), ColorValue::Color(bg)) if bg.is_opaque() => (fg.over(bg), bg),
            _ => {
                if seen.insert((location.clone(), "unresolved".to_string())) {
                    let background = rule
                        .get("background-color")
                        .or_else(|| rule.get("background"))
                        .unwrap_or("");
                    findings.push(
                        "1.4.3",
                        Conformance::LikelyAA,
                        format!(
                            "Contrast of color `{}` on background `{}` cannot be determined ({})",
                            rule.get("color").unwrap_or(""),
                            background,
                            scheme.label()
                        ),
                        Some(location),
                    );
                }
                return;
            }
        };

        let ratio = contrast_ratio(fg, bg);
        if ratio < MIN_CONTRAST && seen.insert((location.clone(), format!("{}/{}", fg.to_hex(), bg.to_hex()))) {
            findings.push(
                "1.4.3",
                Conformance::AA,
                format!(
                    "Text contrast {ratio:.2}:1 ({} on {}) is below 4.5:1 ({})",
                    fg.to_hex(),
                    bg.to_hex(),
                    scheme.label()
                ),
                Some(location),
            );
        }
    }
}

impl Check for Contrast {
    fn id(&self) -> &'static str {
        "contrast"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let sheet = &cx.sheet;
        let schemes = sheet.schemes();
        let mut seen = HashSet::new();
        for scheme in &schemes {
            for rule in sheet.rules_in(scheme) {
                Self::evaluate(rule, scheme, rule.selector_text(), &mut seen, findings);
            }
        }
        if let Some(base) = schemes.first() {
            for (el, rule) in inline_rules(cx.doc) {
                Self::evaluate(&rule, base, cx.doc.path(el), &mut seen, findings);
            }
        }
    }
}

struct FocusVisible;

impl FocusVisible {
    /// A `:focus-visible` rule that draws a real indicator.
    fn restores_indicator(rule: &CssRule) -> bool {
        let targets_focus_visible = rule
            .selectors
            .iter()
            .any(|s| s.contains(":focus-visible") && !s.contains(":not(:focus-visible)"));
        let draws = rule.declarations.iter().any(|d| {
            matches!(d.property.as_str(), "outline" | "outline-style" | "outline-width")
                && !d.removes_outline()
        }) || rule.get("box-shadow").is_some_and(|v| v.trim() != "none");
        targets_focus_visible && draws
    }
}

impl Check for FocusVisible {
    fn id(&self) -> &'static str {
        "focus-visible"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let sheet = &cx.sheet;
        if sheet.rules.iter().any(Self::restores_indicator) {
            return;
        }
        for rule in &sheet.rules {
            if rule.declarations.iter().any(Declaration::removes_outline) {
                findings.push(
                    "2.4.7",
                    Conformance::AA,
                    format!(
                        "`{}` removes the focus outline and no :focus-visible rule replaces it",
                        rule.selector_text()
                    ),
                    Some(rule.selector_text()),
                );
            }
        }
        for (el, rule) in inline_rules(cx.doc) {
            if rule.declarations.iter().any(Declaration::removes_outline) {
                findings.push(
                    "2.4.7",
                    Conformance::AA,
                    "Inline style removes the focus outline",
                    location(cx.doc, el),
                );
            }
        }
    }
}

struct FocusNotObscured;

impl Check for FocusNotObscured {
    fn id(&self) -> &'static str {
        "focus-not-obscured"
    }

    fn applies_to(&self, version: WcagVersion) -> bool {
        version.is_2_2()
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let sheet = &cx.sheet;
        if sheet.any_declaration(|d| {
            d.property.starts_with("scroll-margin") || d.property.starts_with("scroll-padding")
        }) {
            return;
        }
        for rule in &sheet.rules {
            let Some(position) = rule.get("position").map(|p| p.trim().to_ascii_lowercase()) else {
                continue;
            };
            if position == "fixed" || position == "sticky" {
                findings.push(
                    "2.4.11",
                    Conformance::BestPractice,
                    format!(
                        "`{}` is {position} and no scroll-margin or scroll-padding keeps focused content clear of it",
                        rule.selector_text()
                    ),
                    Some(rule.selector_text()),
                );
            }
        }
    }
}

struct FocusAppearance;

impl Check for FocusAppearance {
    fn id(&self) -> &'static str {
        "focus-appearance"
    }

    fn applies_to(&self, version: WcagVersion) -> bool {
        version.is_2_2()
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let sheet = &cx.sheet;
        let mut seen = HashSet::new();
        for scheme in &sheet.schemes() {
            let page = sheet.page_background(scheme);
            for rule in sheet.rules_in(scheme) {
                if !rule.selectors.iter().any(|s| s.contains(":focus"))
                    || rule.declarations.iter().any(Declaration::removes_outline)
                {
                    continue;
                }
                let selector = rule.selector_text();
                let resolved = |property: &str| rule.get(property).and_then(|v| scheme.resolve(v));
                let shorthand = resolved("outline").map(|v| outline_parts(&v)).unwrap_or_default();
                let width = resolved("outline-width")
                    .and_then(|v| outline_parts(&v).width)
                    .or(shorthand.width);
                let color = resolved("outline-color")
                    .and_then(|v| parse_color(&v))
                    .or(shorthand.color);

                if let Some(width) = width.filter(|&w| w < MIN_FOCUS_WIDTH) {
                    if seen.insert((selector.clone(), format!("width {width}"))) {
                        findings.push(
                            "2.4.13",
                            Conformance::AA,
                            format!("Focus outline on `{selector}` is {width}px; at least 2px is required"),
                            Some(selector.clone()),
                        );
                    }
                }
                if let Some(color) = color {
                    let color = color.over(page);
                    let ratio = contrast_ratio(color, page);
                    if ratio < MIN_NON_TEXT_CONTRAST
                        && seen.insert((selector.clone(), format!("{}/{}", color.to_hex(), page.to_hex())))
                    {
                        findings.push(
                            "2.4.13",
                            Conformance::AA,
                            format!(
                                "Focus outline {} on `{selector}` has {ratio:.2}:1 against the page background {}; 3:1 is required ({})",
                                color.to_hex(),
                                page.to_hex(),
                                scheme.label()
                            ),
                            Some(selector.clone()),
                        );
                    }
                }
            }
        }
    }
}

struct TargetSize;

impl TargetSize {
    /// Whether the last compound of a selector names an interactive element.
    fn targets_interactive(selector: &str) -> bool {
        let compound = selector
            .rsplit(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ["[role=button]", "[role=\"button\"]", "[role='button']"]
            .iter()
            .any(|r| compound.contains(r))
        {
            return true;
        }
        let tag_end = compound
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(compound.len());
        matches!(
            &compound[..tag_end],
            "a" | "button" | "input" | "select" | "textarea" | "summary"
        )
    }
}

impl Check for TargetSize {
    fn id(&self) -> &'static str {
        "target-size"
    }

    fn applies_to(&self, version: WcagVersion) -> bool {
        version.is_2_2()
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let sheet = &cx.sheet;
        let schemes = sheet.schemes();
        let Some(base) = schemes.first() else {
            return;
        };
        for rule in &sheet.rules {
            if !rule.selectors.iter().any(|s| Self::targets_interactive(s)) {
                continue;
            }
            let length = |property: &str| {
                rule.get(property)
                    .and_then(|v| base.resolve(v))
                    .and_then(|v| px_length(&v))
            };
            let size = |axis: &str| {
                let explicit = length(axis);
                let min = length(&format!("min-{axis}"));
                let max = length(&format!("max-{axis}"));
                let size = explicit.map(|s| min.map_or(s, |m| s.max(m)));
                match (size, max) {
                    (Some(s), Some(m)) => Some(s.min(m)),
                    (None, Some(m)) => Some(m),
                    (s, None) => s,
                }
            };
            let smallest = [size("width"), size("height")]
                .into_iter()
                .flatten()
                .filter(|&v| v < MIN_TARGET)
                .reduce(f32::min);
            if let Some(px) = smallest {
                findings.push(
                    "2.5.8",
                    Conformance::AA,
                    format!(
                        "`{}` sizes interactive targets to {px}px, below the 24px minimum",
                        rule.selector_text()
                    ),
                    Some(rule.selector_text()),
                );
            }
        }
    }
}

/// Width and color of an `outline` shorthand.
#[derive(Debug, Default)]
struct Outline {
    width: Option<f32>,
    color: Option<Rgba>,
}

fn outline_parts(value: &str) -> Outline {
    let mut outline = Outline::default();
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    loop {
        let start = parser.position();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Dimension { value, ref unit, .. } => outline.width = length_px(value, unit),
            Token::Number { value, .. } if value == 0.0 => outline.width = Some(0.0),
            Token::Ident(ref name) => match name.to_ascii_lowercase().as_str() {
                "thin" => outline.width = Some(1.0),
                "medium" => outline.width = Some(3.0),
                "thick" => outline.width = Some(5.0),
                other => {
                    if let Some(color) = parse_color(other) {
                        outline.color = Some(color);
                    }
                }
            },
            Token::Hash(_) | Token::IDHash(_) => outline.color = parse_color(parser.slice_from(start)),
            Token::Function(_) => {
                let _ = parser.parse_nested_block(skip_block);
                outline.color = parse_color(parser.slice_from(start));
            }
            _ => {}
        }
    }
    outline
}

fn skip_block<'i>(input: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while input.next().is_ok() {}
    Ok(())
}

/// A single length converted to CSS pixels.
fn px_length(value: &str) -> Option<f32> {
    let mut input = ParserInput::new(value.trim());
    let mut parser = Parser::new(&mut input);
    let px = match parser.next().ok()? {
        Token::Dimension { value, unit, .. } => length_px(*value, unit)?,
        Token::Number { value, .. } if *value == 0.0 => 0.0,
        _ => return None,
    };
    parser.is_exhausted().then_some(px)
}

fn length_px(value: f32, unit: &str) -> Option<f32> {
    match unit.to_ascii_lowercase().as_str() {
        "px" => Some(value),
        "em" | "rem" => Some(value * 16.0),
        "pt" => Some(value * 4.0 / 3.0),
        _ => None,
    }
}

// =============================================================================
// Markup checks
// =============================================================================

struct ReadingOrder;

impl Check for ReadingOrder {
    fn id(&self) -> &'static str {
        "reading-order"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        for region in doc.elements().filter(|&e| doc.has_class(e, "needs-review")) {
            let confidence = doc
                .attr(region, "data-confidence")
                .map(|c| format!(" (confidence {c})"))
                .unwrap_or_default();
            findings.push(
                "1.3.2",
                Conformance::BestPractice,
                format!("Reading order of this region needs manual review{confidence}"),
                location(doc, region),
            );
        }
    }
}

struct Presentational;

impl Check for Presentational {
    fn id(&self) -> &'static str {
        "presentational"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        for el in doc.elements() {
            if let Some(tag @ ("font" | "center" | "marquee" | "blink")) = doc.tag(el) {
                findings.push(
                    "1.3.1",
                    Conformance::Cosmetic,
                    format!("Presentational element <{tag}>"),
                    location(doc, el),
                );
            }
        }
    }
}

struct Viewport;

impl Check for Viewport {
    fn id(&self) -> &'static str {
        "viewport"
    }

    fn run(&self, cx: &CheckContext<'_>, findings: &mut Findings) {
        let doc = cx.doc;
        let has_viewport = doc
            .elements_by_tag("meta")
            .any(|m| doc.attr(m, "name").is_some_and(|n| n.eq_ignore_ascii_case("viewport")));
        if !has_viewport {
            findings.push(
                "1.4.10",
                Conformance::Cosmetic,
                "No viewport meta element",
                None,
            );
        }
    }
}
