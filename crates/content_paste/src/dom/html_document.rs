// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeMap;
use std::fmt;

use html5ever::{LocalName, Namespace, QualName};

use super::dom_creator::HtmlDocumentCreator;
use super::style::InlineStyle;

/// Index of a node in an [`HtmlDocument`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

pub fn html_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub name: QualName,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            name: html_name(tag),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Lower case local name, e.g. `div`.
    pub fn tag(&self) -> &str {
        self.name.local.as_ref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_owned(),
            None => self.attrs.push((name.to_owned(), value.to_owned())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self
            .attrs
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(index).1)
    }

    pub fn style(&self) -> InlineStyle {
        self.attr("style").map(InlineStyle::parse).unwrap_or_default()
    }

    /// Replace the `style` attribute, removing it when `style` is empty.
    pub fn set_style(&mut self, style: &InlineStyle) {
        if style.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", &style.to_css_text());
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Fragment,
    Element(ElementData),
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// What to do with an element while copying a subtree.
pub enum CopyAction {
    Keep(ElementData),
    Unwrap,
    Drop,
}

/// An arena holding a parsed HTML document and any fragments built from it.
///
/// Nodes are never freed; detached nodes simply become unreachable.
#[derive(Clone)]
pub struct HtmlDocument {
    nodes: Vec<Node>,
    document: NodeId,
    placeholder_name: QualName,
    pub(crate) parse_errors: Vec<String>,
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "source", "track", "wbr",
];

/// Elements that start a new line when computing text content.
const LINE_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "blockquote",
    "div",
    "dl",
    "dt",
    "dd",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tr",
    "ul",
];

impl HtmlDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            document: NodeId(0),
            placeholder_name: html_name(""),
            parse_errors: Vec::new(),
        }
    }

    /// Parse a complete HTML document. Parsing never fails: malformed input
    /// is repaired the way browsers do it and the errors are recorded.
    pub fn parse(html: &str) -> Self {
        HtmlDocumentCreator::parse(html)
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn parse_errors(&self) -> &[String] {
        &self.parse_errors
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Tag name of an element, `None` for other node types.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub(crate) fn name_of(&self, id: NodeId) -> &QualName {
        match &self.nodes[id.0].data {
            NodeData::Element(element) => &element.name,
            _ => &self.placeholder_name,
        }
    }

    pub(crate) fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, element: ElementData) -> NodeId {
        self.push_node(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_owned()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push_node(NodeData::Fragment)
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let siblings = &mut self.nodes[parent.0].children;
        match siblings.iter().position(|c| *c == reference) {
            Some(index) => siblings.insert(index, child),
            None => siblings.push(child),
        }
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        for child in children {
            self.nodes[child.0].parent = Some(to);
            self.nodes[to.0].children.push(child);
        }
    }

    /// Append text to `parent`, joining it with a trailing text child.
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                existing.push_str(text);
                return;
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    pub fn child_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.tag(*c) == Some(tag))
    }

    pub fn html_element(&self) -> Option<NodeId> {
        self.child_element(self.document, "html")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_element(self.html_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_element(self.html_element()?, "body")
    }

    /// Every node below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> =
            self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.tag(*id) == Some(tag))
            .collect()
    }

    /// Attributes of an element as a sorted map.
    pub fn attributes(&self, id: NodeId) -> BTreeMap<String, String> {
        self.element(id)
            .map(|e| e.attrs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Approximation of `innerText`: text with block boundaries and `br`
    /// turned into line breaks, skipping script and style content.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out.trim_matches('\n').to_owned()
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(element) => {
                let tag = element.tag();
                if matches!(tag, "script" | "style" | "head" | "template") {
                    return;
                }
                if tag == "br" {
                    out.push('\n');
                    return;
                }
                let is_line = LINE_ELEMENTS.contains(&tag);
                if is_line && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
                if tag == "td" || tag == "th" {
                    out.push('\t');
                } else if is_line && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            NodeData::Document | NodeData::Fragment => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            NodeData::Comment(_) | NodeData::Doctype(_) => {}
        }
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    /// Serialize `id` and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Text(text) => {
                out.push_str(&html_escape::encode_text(text));
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Element(element) => {
                let tag = element.tag();
                out.push('<');
                out.push_str(tag);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(
                        &html_escape::encode_double_quoted_attribute(value),
                    );
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeData::Document | NodeData::Fragment => {
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
            }
        }
    }

    /// Deep copy `id` from `source` into a fresh document, letting `action`
    /// rewrite, unwrap or drop each element on the way. Returns the fresh
    /// document and the copy of `id`, or `None` when `id` itself is dropped
    /// or unwrapped.
    pub fn copy_subtree(
        source: &HtmlDocument,
        id: NodeId,
        action: &dyn Fn(&ElementData) -> CopyAction,
    ) -> Option<(HtmlDocument, NodeId)> {
        let mut target = HtmlDocument::new();
        let root = match source.data(id) {
            NodeData::Element(element) => match action(element) {
                CopyAction::Keep(element) => target.create_element(element),
                CopyAction::Unwrap | CopyAction::Drop => return None,
            },
            other => target.push_node(other.clone()),
        };
        let document = target.document();
        target.append_child(document, root);
        target.copy_children(source, id, root, action);
        Some((target, root))
    }

    fn copy_children(
        &mut self,
        source: &HtmlDocument,
        from: NodeId,
        to: NodeId,
        action: &dyn Fn(&ElementData) -> CopyAction,
    ) {
        for child in source.children(from) {
            match source.data(*child) {
                NodeData::Element(element) => match action(element) {
                    CopyAction::Keep(element) => {
                        let copy = self.create_element(element);
                        self.append_child(to, copy);
                        self.copy_children(source, *child, copy, action);
                    }
                    CopyAction::Unwrap => {
                        self.copy_children(source, *child, to, action);
                    }
                    CopyAction::Drop => {}
                },
                NodeData::Text(text) => self.append_text(to, text),
                NodeData::Comment(_) | NodeData::Doctype(_) => {}
                NodeData::Document | NodeData::Fragment => {
                    self.copy_children(source, *child, to, action);
                }
            }
        }
    }
}

impl fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.outer_html(self.document))
    }
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn parsed_document_has_head_and_body() {
        let doc = HtmlDocument::parse("<p>a</p>");

        assert_that!(doc.head()).is_some();
        let body = doc.body().unwrap();
        assert_eq!(doc.inner_html(body), "<p>a</p>");
    }

    #[test]
    fn moving_children_keeps_their_order() {
        let doc = HtmlDocument::parse("<b>1</b>2<i>3</i>");
        let mut doc = doc;
        let body = doc.body().unwrap();
        let fragment = doc.create_fragment();

        doc.move_children(body, fragment);

        assert_eq!(doc.inner_html(fragment), "<b>1</b>2<i>3</i>");
        assert!(doc.children(body).is_empty());
    }

    #[test]
    fn text_is_escaped_on_serialization() {
        let doc = HtmlDocument::parse("a &lt;b&gt; &amp;");
        let body = doc.body().unwrap();

        assert_eq!(doc.inner_html(body), "a &lt;b&gt; &amp;");
    }

    #[test]
    fn text_content_breaks_lines_at_blocks() {
        let doc = HtmlDocument::parse(
            "<div>one</div><p>two<br>three</p><script>x()</script>",
        );
        let body = doc.body().unwrap();

        assert_eq!(doc.text_content(body), "one\ntwo\nthree");
    }

    #[test]
    fn copy_subtree_applies_the_action() {
        let doc = HtmlDocument::parse(
            "<div id=r><span>a</span><script>b</script><u>c</u></div>",
        );
        let root = doc.elements_by_tag(doc.document(), "div")[0];

        let (copy, copy_root) = HtmlDocument::copy_subtree(&doc, root, &|e| {
            match e.tag() {
                "script" => CopyAction::Drop,
                "u" => CopyAction::Unwrap,
                _ => CopyAction::Keep(e.clone()),
            }
        })
        .unwrap();

        assert_eq!(
            copy.outer_html(copy_root),
            r#"<div id="r"><span>a</span>c</div>"#
        );
    }

    #[test]
    fn style_accessors_round_trip_through_the_attribute() {
        let mut element =
            ElementData::new("span").with_attr("style", "color: red");
        let mut style = element.style();
        style.remove("color");

        element.set_style(&style);

        assert_eq!(element.attr("style"), None);
    }
}
