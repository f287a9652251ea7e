//! Mutable HTML document model.
//!
//! [`HtmlDocument`] is an arena tree built by html5ever through
//! [`tree_sink::ArenaSink`]. The enhancer mutates it in place and the
//! validator only reads it. Serialization ([`serialize`]) is deterministic and
//! parse-stable.

mod arena;
pub mod serialize;
mod tree_sink;

use std::collections::HashSet;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::ns;

pub use arena::{Attribute, ChildrenIter, Descendants, HtmlDocument, Node, NodeData, NodeId};
pub use serialize::{escape_attr, escape_html, escape_text};

use tree_sink::ArenaSink;

impl HtmlDocument {
    /// Parse an HTML string. Malformed markup is repaired the way browsers do.
    pub fn parse(html: &str) -> Self {
        parse_document(ArenaSink::new(), ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes())
            .into_document()
    }

    /// Serialize the document.
    pub fn to_html(&self) -> String {
        serialize::serialize(self)
    }

    // ------------------------------------------------------------------------
    // Element accessors
    // ------------------------------------------------------------------------

    /// Local name of an HTML element. Foreign (SVG/MathML) elements and
    /// non-element nodes yield `None`.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) if name.ns == ns!(html) => {
                Some(name.local.as_ref())
            }
            _ => None,
        }
    }

    /// Local name of any element, foreign ones included.
    pub fn any_tag(&self, id: NodeId) -> Option<&str> {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => Some(name.local.as_ref()),
            _ => None,
        }
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id).map(|n| &n.data), Some(NodeData::Element { .. }))
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute, replacing the value in place when it exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(id)
        {
            match attrs.iter_mut().find(|a| a.name == name) {
                Some(attr) => {
                    if attr.value != value {
                        attr.value = value.to_string();
                    }
                }
                None => attrs.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }
    }

    /// Set an attribute only when it is absent. Returns whether it was set.
    pub fn set_attr_if_missing(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        if self.has_attr(id, name) {
            return false;
        }
        self.set_attr(id, name, value);
        true
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(id)
        {
            let pos = attrs.iter().position(|a| a.name == name)?;
            return Some(attrs.remove(pos).value);
        }
        None
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(Node {
            data: NodeData::Text(t),
            ..
        }) = self.get_mut(id)
        {
            *t = text.to_string();
        }
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        self.descendants(id)
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Text content with whitespace runs collapsed and trimmed.
    pub fn normalized_text(&self, id: NodeId) -> String {
        self.text_content(id)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.document())
            .filter(|&id| self.is_element(id))
    }

    /// HTML elements with the given tag in document order.
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(self.document())
            .filter(move |&id| self.is_tag(id, tag))
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.elements_by_tag(tag).next()
    }

    /// Element children of `id`.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|&c| self.is_element(c))
    }

    pub fn html_element(&self) -> Option<NodeId> {
        self.child_elements(self.document())
            .find(|&c| self.is_tag(c, "html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.html_element()?;
        self.child_elements(html).find(|&c| self.is_tag(c, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.html_element()?;
        self.child_elements(html).find(|&c| self.is_tag(c, "body"))
    }

    pub fn find_by_id(&self, value: &str) -> Option<NodeId> {
        self.elements().find(|&e| self.attr(e, "id") == Some(value))
    }

    /// All id values present in the document.
    pub fn ids(&self) -> HashSet<String> {
        self.elements()
            .filter_map(|e| self.attr(e, "id"))
            .map(str::to_string)
            .collect()
    }

    /// True when an ancestor of `id` is one of `tags`.
    pub fn has_ancestor_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.ancestors(id)
            .any(|a| self.any_tag(a).is_some_and(|t| tags.contains(&t)))
    }

    /// True when the subtree has no text and no element other than `br`.
    pub fn is_blank(&self, id: NodeId) -> bool {
        self.descendants(id).all(|d| match self.text(d) {
            Some(t) => t.trim().is_empty(),
            None => !self.is_element(d) || self.is_tag(d, "br"),
        })
    }

    /// CSS-like path to an element: `html > body > main > img:nth-of-type(2)`.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        for node in std::iter::once(id).chain(self.ancestors(id)) {
            let Some(tag) = self.any_tag(node) else {
                continue;
            };
            let siblings = self
                .parent(node)
                .map(|p| {
                    self.child_elements(p)
                        .filter(|&s| self.any_tag(s) == Some(tag))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            if siblings.len() > 1 {
                let nth = siblings.iter().position(|&s| s == node).map_or(1, |p| p + 1);
                parts.push(format!("{tag}:nth-of-type({nth})"));
            } else {
                parts.push(tag.to_string());
            }
        }
        parts.reverse();
        parts.join(" > ")
    }

    // ------------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------------

    /// Create an element with a single text child.
    pub fn create_text_element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
        let el = self.create_element(tag, attrs);
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append(el, t);
        }
        el
    }

    /// Put `new_node` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new_node: NodeId) {
        self.insert_before(old, new_node);
        self.detach(old);
    }

    /// Wrap `target` in `wrapper`, keeping its position.
    pub fn wrap(&mut self, target: NodeId, wrapper: NodeId) {
        self.insert_before(target, wrapper);
        self.append(wrapper, target);
    }

    /// Merge adjacent text nodes and drop empty ones below `root`.
    ///
    /// The parser never produces either shape, so trees must be normalized
    /// before serializing for the output to parse back to the same tree.
    pub fn normalize_text(&mut self, root: NodeId) {
        let nodes: Vec<NodeId> = std::iter::once(root).chain(self.descendants(root)).collect();
        for parent in nodes {
            let children: Vec<NodeId> = self.children(parent).collect();
            let mut prev_text: Option<NodeId> = None;
            for child in children {
                let Some(text) = self.text(child).map(str::to_string) else {
                    prev_text = None;
                    continue;
                };
                if text.is_empty() {
                    self.detach(child);
                    continue;
                }
                match prev_text {
                    Some(prev) => {
                        let merged = format!("{}{}", self.text(prev).unwrap_or(""), text);
                        self.set_text(prev, &merged);
                        self.detach(child);
                    }
                    None => prev_text = Some(child),
                }
            }
        }
    }
}
