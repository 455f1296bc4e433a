// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! A small arena DOM for clipboard HTML, built with html5ever.

pub mod css;
mod dom_creator;
pub mod html_document;
pub mod style;

pub use css::{parse_css_rules, CompoundSelector, CssRule};
pub use html_document::{
    html_name, CopyAction, ElementData, HtmlDocument, NodeData, NodeId,
};
pub use style::InlineStyle;

/// Tags rendered as blocks by default.
pub const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "center",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "li",
    "main",
    "menu",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "ul",
    "xmp",
];

/// A detached node tree built from clipboard data, ready for conversion.
#[derive(Clone, Debug)]
pub struct Fragment {
    pub dom: HtmlDocument,
    pub root: NodeId,
}

impl Fragment {
    pub fn new() -> Self {
        let mut dom = HtmlDocument::new();
        let root = dom.create_fragment();
        Self { dom, root }
    }

    pub fn to_html(&self) -> String {
        self.dom.inner_html(self.root)
    }

    /// Top-level nodes of the fragment.
    pub fn children(&self) -> &[NodeId] {
        self.dom.children(self.root)
    }

    pub fn contains_block_elements(&self) -> bool {
        self.dom
            .descendants(self.root)
            .into_iter()
            .filter_map(|id| self.dom.tag(id))
            .any(|tag| BLOCK_TAGS.contains(&tag))
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}
