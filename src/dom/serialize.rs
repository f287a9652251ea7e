//! Deterministic HTML serialization.
//!
//! Output follows the HTML fragment serialization rules closely enough that
//! parsing it again yields the same tree: void elements have no end tag, raw
//! text elements are written verbatim, and a leading newline inside `pre`,
//! `textarea` and `listing` is doubled because the parser drops one.

use std::fmt::Write;

use html5ever::ns;

use super::arena::{HtmlDocument, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
    "script",
    "style",
    "xmp",
];

const NEWLINE_SENSITIVE: &[&str] = &["listing", "pre", "textarea"];

/// Serialize the whole document.
pub fn serialize(doc: &HtmlDocument) -> String {
    let mut out = String::new();
    for child in doc.children(doc.document()) {
        write_node(doc, child, false, &mut out);
    }
    out
}

/// Serialize one node and its subtree.
pub fn serialize_node(doc: &HtmlDocument, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc.parent(id).is_some_and(|p| is_raw_text_parent(doc, p));
    write_node(doc, id, raw, &mut out);
    out
}

fn is_raw_text_parent(doc: &HtmlDocument, id: NodeId) -> bool {
    matches!(
        doc.get(id).map(|n| &n.data),
        Some(NodeData::Element { name, .. })
            if name.ns == ns!(html) && RAW_TEXT_ELEMENTS.contains(&name.local.as_ref())
    )
}

fn write_node(doc: &HtmlDocument, id: NodeId, raw_text: bool, out: &mut String) {
    let Some(node) = doc.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Document => {
            for child in doc.children(id) {
                write_node(doc, child, false, out);
            }
        }
        NodeData::Doctype { name } => {
            let _ = write!(out, "<!DOCTYPE {}>", name);
        }
        NodeData::Comment(text) => {
            let _ = write!(out, "<!--{}-->", text);
        }
        NodeData::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            let html = name.ns == ns!(html);

            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }
            out.push('>');

            if html && VOID_ELEMENTS.contains(&tag) {
                return;
            }

            if html
                && NEWLINE_SENSITIVE.contains(&tag)
                && let Some(first) = doc.first_child(id)
                && let Some(NodeData::Text(t)) = doc.get(first).map(|n| &n.data)
                && t.starts_with('\n')
            {
                out.push('\n');
            }

            let raw = html && RAW_TEXT_ELEMENTS.contains(&tag);
            for child in doc.children(id) {
                write_node(doc, child, raw, out);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Escape text content.
pub fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Escape a string for use in text or a double-quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(html: &str) -> String {
        serialize(&HtmlDocument::parse(html))
    }

    #[test]
    fn void_and_raw_text() {
        let out = roundtrip("<p>a<br>b<img src=x.png alt=\"\"></p><script>if (a < b) {}</script>");
        assert!(out.contains("<br>b<img src=\"x.png\" alt=\"\">"));
        assert!(out.contains("<script>if (a < b) {}</script>"));
        assert!(!out.contains("</br>"));
    }

    #[test]
    fn escapes_text_and_attributes() {
        let out = roundtrip(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3</p>"#);
        assert!(out.contains(r#"title="a &quot;b&quot; &amp; c""#));
        assert!(out.contains("1 &lt; 2 &amp; 3"));
    }

    #[test]
    fn pre_leading_newline_survives() {
        let html = "<pre>\n\nindented</pre>";
        let once = roundtrip(html);
        assert_eq!(roundtrip(&once), once);
        assert!(once.contains("<pre>\n\nindented</pre>"));
    }

    #[test]
    fn serialization_is_parse_stable() {
        let html = "<!DOCTYPE html><html lang=en><head><title>T</title></head>\
                    <body><!-- note --><table><tr><td>x</td></tr></table>\
                    <svg viewBox=\"0 0 1 1\"><path d=\"M0\"/></svg></body></html>";
        let once = roundtrip(html);
        assert_eq!(roundtrip(&once), once);
        assert!(once.starts_with("<!DOCTYPE html>"));
        assert!(once.contains("<tbody>"));
        assert!(once.contains("viewBox"));
    }

    #[test]
    fn escape_html_quotes() {
        assert_eq!(escape_html(r#"<a href="x">'"#), "&lt;a href=&quot;x&quot;&gt;&#39;");
    }
}
