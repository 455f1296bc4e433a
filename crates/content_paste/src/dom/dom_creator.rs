// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{parse_document, Attribute, QualName};

use super::html_document::{ElementData, HtmlDocument, NodeData, NodeId};

/// Builds an [`HtmlDocument`] from html5ever tree builder callbacks.
pub(crate) struct HtmlDocumentCreator {
    state: RefCell<HtmlDocument>,
}

impl HtmlDocumentCreator {
    pub fn parse(html: &str) -> HtmlDocument {
        let document = parse_document(
            HtmlDocumentCreator::default(),
            Default::default(),
        )
        .from_utf8()
        .one(html.as_bytes());
        if !document.parse_errors.is_empty() {
            tracing::trace!(
                errors = document.parse_errors.len(),
                "clipboard html repaired while parsing"
            );
        }
        document
    }

    fn insert(&self, parent: NodeId, child: NodeOrText<NodeId>) {
        let dom = &mut self.state.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => dom.append_child(parent, node),
            NodeOrText::AppendText(text) => dom.append_text(parent, &text),
        }
    }
}

impl Default for HtmlDocumentCreator {
    fn default() -> Self {
        Self {
            state: RefCell::new(HtmlDocument::new()),
        }
    }
}

impl TreeSink for HtmlDocumentCreator {
    type Handle = NodeId;
    type Output = HtmlDocument;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        self.state.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(String::from(msg));
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().document()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |dom| dom.name_of(*target))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .into_iter()
            .map(|attr| {
                (attr.name.local.as_ref().to_owned(), attr.value.to_string())
            })
            .collect();
        self.state
            .borrow_mut()
            .create_element(ElementData { name, attrs })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.state
            .borrow_mut()
            .push_node(NodeData::Comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        // Processing instructions only occur in XML; keep them as comments.
        self.create_comment(data)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.insert(*parent, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.state.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.insert(*prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let dom = &mut self.state.borrow_mut();
        let doctype = dom.push_node(NodeData::Doctype(name.to_string()));
        let document = dom.document();
        dom.append_child(document, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents stay inside the template element.
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let dom = &mut self.state.borrow_mut();
        let Some(parent) = dom.parent(*sibling) else {
            return;
        };
        match new_node {
            NodeOrText::AppendNode(node) => {
                dom.insert_before(parent, node, *sibling)
            }
            NodeOrText::AppendText(text) => {
                let previous = dom
                    .children(parent)
                    .iter()
                    .position(|c| c == sibling)
                    .and_then(|i| i.checked_sub(1))
                    .map(|i| dom.children(parent)[i]);
                if let Some(previous) = previous {
                    if let Some(existing) = dom.text(previous) {
                        let joined = format!("{existing}{text}");
                        let node = dom.create_text(&joined);
                        dom.insert_before(parent, node, previous);
                        dom.detach(previous);
                        return;
                    }
                }
                let node = dom.create_text(&text);
                dom.insert_before(parent, node, *sibling);
            }
        }
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let dom = &mut self.state.borrow_mut();
        if let Some(element) = dom.element_mut(*target) {
            for attr in attrs {
                let name = attr.name.local.as_ref();
                if element.attr(name).is_none() {
                    element.attrs.push((name.to_owned(), attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.state.borrow_mut().detach(*target);
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        self.state.borrow_mut().move_children(*node, *new_parent);
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;

    fn body_html(html: &str) -> String {
        let dom = HtmlDocumentCreator::parse(html);
        dom.inner_html(dom.body().unwrap())
    }

    #[test]
    fn parsing_an_empty_string_creates_an_empty_body() {
        assert_eq!(body_html(""), "");
    }

    #[test]
    fn parsing_nested_structures_produces_them() {
        assert_eq!(body_html("A<i>B<b>C</b>D</i>E"), "A<i>B<b>C</b>D</i>E");
    }

    #[test]
    fn parsing_tags_with_attributes_preserves_them() {
        assert_eq!(
            body_html("<span class='foo'>txt</span>"),
            r#"<span class="foo">txt</span>"#
        );
    }

    #[test]
    fn misnested_tags_are_repaired() {
        assert_eq!(body_html("<b>1<i>2</b>3</i>"), "<b>1<i>2</i></b><i>3</i>");
    }

    #[test]
    fn text_before_a_table_is_moved_out_of_it() {
        assert_eq!(
            body_html("<table>x<tr><td>1</td></tr></table>"),
            "x<table><tbody><tr><td>1</td></tr></tbody></table>"
        );
    }

    #[test]
    fn comments_and_head_content_are_kept() {
        let dom = HtmlDocumentCreator::parse(indoc! {r#"
            <html><head><meta name="Generator" content="Word">
            <style>p { color: red; }</style></head>
            <body><!--StartFragment-->x<!--EndFragment--></body></html>
        "#});

        let head = dom.head().unwrap();
        assert_eq!(dom.elements_by_tag(head, "meta").len(), 1);
        assert_eq!(
            dom.inner_html(dom.body().unwrap()).trim(),
            "<!--StartFragment-->x<!--EndFragment-->"
        );
    }

    #[test]
    fn parse_errors_are_collected() {
        let dom = HtmlDocumentCreator::parse("<p></div>");

        assert!(!dom.parse_errors().is_empty());
    }
}
