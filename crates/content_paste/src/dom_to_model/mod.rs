// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Conversion of an [`HtmlDocument`] subtree into a [`ContentDocument`].
//!
//! Conversion is table driven. Element processors are looked up by tag
//! name (plus the special keys `#text`, `entity` and `*`), format parsers
//! by format key. A [`DomToModelOption`] overlays entries on top of the
//! defaults; later options win.

mod default_styles;
mod format_parsers;
mod processors;

use std::collections::HashMap;
use std::rc::Rc;

use crate::content_model::format::INHERITABLE_BLOCK_KEYS;
use crate::content_model::normalize::normalize_blocks;
use crate::content_model::{
    Block, ContentDocument, Format, FormatCategory, FormatKey, Link,
    SegmentKind,
};
use crate::dom::{
    CopyAction, ElementData, HtmlDocument, InlineStyle, NodeData, NodeId,
};

pub use default_styles::default_style;
pub use format_parsers::default_format_parsers;
pub use processors::{
    add_text, block_processor, default_element_processors,
    entity_processor, is_block_display,
};

/// Key of the processor used for text nodes.
pub const TEXT_PROCESSOR: &str = "#text";
/// Key of the processor used for entity wrappers (class `_Entity`).
pub const ENTITY_PROCESSOR: &str = "entity";
/// Key of the processor used for elements without a dedicated one.
pub const GENERAL_PROCESSOR: &str = "*";
/// Class marking an element as an opaque entity.
pub const ENTITY_CLASS: &str = "_Entity";

/// Converts one node into content, appending to the given block list.
pub type ElementProcessor =
    Rc<dyn Fn(&mut Vec<Block>, NodeView<'_>, &mut DomToModelContext)>;

/// Reads one format property of an element into a format.
pub type FormatParser =
    Rc<dyn Fn(&mut Format, &StyledElement<'_>, &DomToModelContext)>;

/// Decides whether an element is kept (as a cleaned copy), unwrapped or
/// dropped.
pub type ElementFilter = Rc<dyn Fn(&ElementData) -> CopyAction>;

/// A node being converted. Processors may substitute a cleaned copy of
/// the element while the children are still read from the source tree.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    pub dom: &'a HtmlDocument,
    pub id: NodeId,
    replacement: Option<&'a ElementData>,
}

impl<'a> NodeView<'a> {
    pub fn new(dom: &'a HtmlDocument, id: NodeId) -> Self {
        Self {
            dom,
            id,
            replacement: None,
        }
    }

    /// The same node, presenting `element` instead of the source element.
    pub fn with_element<'b>(&self, element: &'b ElementData) -> NodeView<'b>
    where
        'a: 'b,
    {
        NodeView {
            dom: self.dom,
            id: self.id,
            replacement: Some(element),
        }
    }

    pub fn element(&self) -> Option<&'a ElementData> {
        self.replacement.or_else(|| self.dom.element(self.id))
    }

    pub fn text(&self) -> Option<&'a str> {
        self.dom.text(self.id)
    }

    pub fn children(&self) -> &'a [NodeId] {
        self.dom.children(self.id)
    }

    pub fn child(&self, id: NodeId) -> NodeView<'a> {
        NodeView::new(self.dom, id)
    }
}

/// An element together with its parsed inline style and the style implied
/// by its tag and presentational attributes.
pub struct StyledElement<'a> {
    pub element: &'a ElementData,
    pub style: InlineStyle,
    pub default_style: InlineStyle,
}

impl<'a> StyledElement<'a> {
    pub fn new(element: &'a ElementData) -> Self {
        Self {
            element,
            style: element.style(),
            default_style: default_style(element),
        }
    }

    pub fn tag(&self) -> &str {
        self.element.tag()
    }

    /// Inline value, falling back to the default style.
    pub fn value(&self, property: &str) -> Option<&str> {
        self.style
            .get(property)
            .or_else(|| self.default_style.get(property))
    }

    pub fn inline_value(&self, property: &str) -> Option<&str> {
        self.style.get(property)
    }
}

/// Position of a caret inside a text node of the source tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomCaret {
    pub node: NodeId,
    /// Offset in characters.
    pub offset: usize,
}

/// Overrides layered on the default conversion tables.
#[derive(Clone, Default)]
pub struct DomToModelOption {
    pub processor_override: HashMap<String, ElementProcessor>,
    /// `None` disables the parser for that key.
    pub format_parser_override: HashMap<FormatKey, Option<FormatParser>>,
    pub additional_format_parsers: HashMap<FormatCategory, Vec<FormatParser>>,
    /// Replaces the element filter when set.
    pub element_filter: Option<ElementFilter>,
}

#[derive(Clone)]
pub(crate) struct FormatStash {
    segment_format: Format,
    block_format: Format,
    link: Option<Link>,
}

pub struct DomToModelContext {
    /// Format applied to segments created at the current position.
    pub segment_format: Format,
    /// Format of paragraphs created at the current position.
    pub block_format: Format,
    pub link: Option<Link>,
    /// Size in px that `rem` lengths resolve against.
    pub root_font_size: f64,
    pub caret: Option<DomCaret>,
    pub element_processors: HashMap<String, ElementProcessor>,
    pub default_element_processors: Rc<HashMap<String, ElementProcessor>>,
    /// Active parser per format key. A missing key is disabled.
    pub format_parsers: HashMap<FormatKey, FormatParser>,
    pub default_format_parsers: Rc<HashMap<FormatKey, FormatParser>>,
    pub additional_format_parsers: HashMap<FormatCategory, Vec<FormatParser>>,
    /// Applied to the elements processors read straight from the tree
    /// instead of dispatching, such as table rows and cells.
    pub element_filter: Option<ElementFilter>,
}

impl DomToModelContext {
    pub fn new(segment_format: Format, root_font_size: f64) -> Self {
        Self::with_options(segment_format, root_font_size, &[])
    }

    /// A context with `options` applied in order over the defaults.
    pub fn with_options(
        segment_format: Format,
        root_font_size: f64,
        options: &[&DomToModelOption],
    ) -> Self {
        let default_element_processors = Rc::new(default_element_processors());
        let default_format_parsers = Rc::new(default_format_parsers());
        let mut element_processors = (*default_element_processors).clone();
        let mut format_parsers = (*default_format_parsers).clone();
        let mut additional_format_parsers: HashMap<
            FormatCategory,
            Vec<FormatParser>,
        > = HashMap::new();
        let mut element_filter = None;

        for option in options {
            for (key, processor) in &option.processor_override {
                element_processors.insert(key.clone(), processor.clone());
            }
            for (key, parser) in &option.format_parser_override {
                match parser {
                    Some(parser) => {
                        format_parsers.insert(*key, parser.clone());
                    }
                    None => {
                        format_parsers.remove(key);
                    }
                }
            }
            for (category, parsers) in &option.additional_format_parsers {
                additional_format_parsers
                    .entry(*category)
                    .or_default()
                    .extend(parsers.iter().cloned());
            }
            if let Some(filter) = &option.element_filter {
                element_filter = Some(filter.clone());
            }
        }

        Self {
            segment_format,
            block_format: Format::new(),
            link: None,
            root_font_size,
            caret: None,
            element_processors,
            default_element_processors,
            format_parsers,
            default_format_parsers,
            additional_format_parsers,
            element_filter,
        }
    }

    /// What to do with an element a processor reads directly. Without a
    /// filter the element is kept unchanged.
    pub fn filter_element(&self, element: &ElementData) -> CopyAction {
        match &self.element_filter {
            Some(filter) => filter(element),
            None => CopyAction::Keep(element.clone()),
        }
    }

    pub(crate) fn stash(&self) -> FormatStash {
        FormatStash {
            segment_format: self.segment_format.clone(),
            block_format: self.block_format.clone(),
            link: self.link.clone(),
        }
    }

    pub(crate) fn restore(&mut self, stash: FormatStash) {
        self.segment_format = stash.segment_format;
        self.block_format = stash.block_format;
        self.link = stash.link;
    }

    /// Block format handed down to nested blocks and implicit paragraphs.
    pub fn inherited_block_format(&self) -> Format {
        self.block_format.only(INHERITABLE_BLOCK_KEYS)
    }

    /// True inside a `white-space: pre*` block.
    pub fn is_pre(&self) -> bool {
        self.block_format
            .get(FormatKey::WhiteSpace)
            .is_some_and(|v| v.starts_with("pre"))
    }

    /// Dispatch a node to its processor.
    pub fn process_node(&mut self, group: &mut Vec<Block>, node: NodeView<'_>) {
        let key = match node.dom.data(node.id) {
            NodeData::Text(_) => TEXT_PROCESSOR,
            NodeData::Element(element) => {
                if element.has_class(ENTITY_CLASS) {
                    ENTITY_PROCESSOR
                } else if self.element_processors.contains_key(element.tag())
                {
                    element.tag()
                } else {
                    GENERAL_PROCESSOR
                }
            }
            NodeData::Document | NodeData::Fragment => {
                self.process_children(group, node);
                return;
            }
            NodeData::Comment(_) | NodeData::Doctype(_) => return,
        };
        let processor = self
            .element_processors
            .get(key)
            .or_else(|| self.element_processors.get(GENERAL_PROCESSOR))
            .cloned();
        if let Some(processor) = processor {
            processor(group, node, self);
        }
    }

    pub fn process_children(
        &mut self,
        group: &mut Vec<Block>,
        node: NodeView<'_>,
    ) {
        for child in node.children() {
            self.process_node(group, node.child(*child));
        }
    }

    /// Run the active parsers for `keys` into `format`.
    pub fn parse_keys(
        &self,
        keys: &[FormatKey],
        styled: &StyledElement<'_>,
        format: &mut Format,
    ) {
        for key in keys {
            if let Some(parser) = self.format_parsers.get(key) {
                parser(format, styled, self);
            }
        }
    }

    /// Run the parsers of a category, then its additional parsers.
    pub fn parse_format(
        &self,
        category: FormatCategory,
        styled: &StyledElement<'_>,
        format: &mut Format,
    ) {
        self.parse_keys(category.keys(), styled, format);
        if let Some(parsers) = self.additional_format_parsers.get(&category) {
            for parser in parsers {
                parser(format, styled, self);
            }
        }
    }

    /// Whether an element renders as a block.
    pub fn is_block(&self, styled: &StyledElement<'_>) -> bool {
        let mut format = Format::new();
        self.parse_format(FormatCategory::Display, styled, &mut format);
        format
            .get(FormatKey::Display)
            .or_else(|| styled.default_style.get("display"))
            .is_some_and(is_block_display)
    }
}

/// Convert the children of `root` into a normalized content document.
pub fn dom_to_content_model(
    dom: &HtmlDocument,
    root: NodeId,
    context: &mut DomToModelContext,
) -> ContentDocument {
    let mut blocks = Vec::new();
    context.process_children(&mut blocks, NodeView::new(dom, root));
    trim_paragraph_edges(&mut blocks);
    normalize_blocks(&mut blocks);
    tracing::trace!(blocks = blocks.len(), "converted html to content");
    ContentDocument::new(blocks)
}

/// Remove collapsible spaces at the start and end of each line.
fn trim_paragraph_edges(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(paragraph) => {
                let pre = paragraph
                    .format
                    .get(FormatKey::WhiteSpace)
                    .is_some_and(|v| v.starts_with("pre"));
                if pre {
                    continue;
                }
                let segments = &mut paragraph.segments;
                for i in 0..segments.len() {
                    let line_start =
                        i == 0 || segments[i - 1].kind == SegmentKind::Br;
                    let line_end = i + 1 == segments.len()
                        || segments[i + 1].kind == SegmentKind::Br;
                    if let SegmentKind::Text(text) = &mut segments[i].kind {
                        if line_start {
                            *text = text.trim_start_matches(' ').to_owned();
                        }
                        if line_end {
                            *text = text.trim_end_matches(' ').to_owned();
                        }
                    }
                }
            }
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
                {
                    trim_paragraph_edges(&mut cell.blocks);
                }
            }
            Block::Entity(_) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;
    use crate::content_model::to_tree::ToTree;

    fn convert(html: &str) -> ContentDocument {
        let dom = HtmlDocument::parse(html);
        let body = dom.body().unwrap();
        dom_to_content_model(
            &dom,
            body,
            &mut DomToModelContext::new(Format::new(), 16.0),
        )
    }

    #[test]
    fn inline_content_goes_into_an_implicit_paragraph() {
        let doc = convert("a <b>b</b>");

        assert_eq!(
            doc.to_tree(),
            indoc! {r#"

                └>p
                  ├>"a "
                  └>"b" {font-weight: bold}
            "#}
        );
        assert!(doc.blocks[0].as_paragraph().unwrap().is_implicit);
    }

    #[test]
    fn blocks_split_paragraphs_and_collapse_whitespace() {
        let doc = convert("<div>  one\n  two </div>three<p style='text-align:center'>four</p>");

        assert_eq!(
            doc.to_tree(),
            indoc! {r#"

                ├>p
                │ └>"one two"
                ├>p
                │ └>"three"
                └>p {text-align: center}
                  └>"four"
            "#}
        );
    }

    #[test]
    fn preformatted_text_keeps_spaces_and_breaks_lines() {
        let doc = convert("<pre>a  b\nc</pre>");

        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        assert_eq!(paragraph.plain_text(), "a  b\nc");
        assert_eq!(paragraph.format.get(FormatKey::WhiteSpace), Some("pre"));
    }

    #[test]
    fn nested_formats_accumulate() {
        let doc = convert(
            "<span style='color:red'><i>x</i></span><u><s>y</s></u>",
        );

        assert_eq!(
            doc.to_tree(),
            indoc! {r#"

                └>p
                  ├>"x" {font-style: italic; color: red}
                  └>"y" {text-decoration: underline line-through}
            "#}
        );
    }

    #[test]
    fn links_and_images_become_segments() {
        let doc = convert(r#"<a href="https://matrix.org" title="t">m</a><img src="a.png" alt="A">"#);
        let paragraph = doc.blocks[0].as_paragraph().unwrap();

        assert_that!(paragraph.segments[0].link.as_ref().map(|l| l.href.as_str()))
            .is_equal_to(Some("https://matrix.org"));
        assert!(matches!(
            &paragraph.segments[1].kind,
            SegmentKind::Image(image) if image.src == "a.png"
        ));
    }

    #[test]
    fn tables_keep_their_grid() {
        let doc = convert(indoc! {r#"
            <table>
              <tr><th colspan="2">h</th></tr>
              <tr><td>a</td><td>b</td></tr>
            </table>
        "#});

        assert_eq!(
            doc.to_tree(),
            indoc! {r#"

                └>table
                  ├>tr
                  │ ├>th
                  │ │ └>p
                  │ │   └>"h" {font-weight: bold}
                  │ └>th (span-left)
                  └>tr
                    ├>td
                    │ └>p
                    │   └>"a"
                    └>td
                      └>p
                        └>"b"
            "#}
        );
    }

    #[test]
    fn entities_keep_their_html() {
        let doc = convert(
            r#"<div class="_Entity _EType_poll _EId_p1"><b>q</b></div>"#,
        );

        let Block::Entity(entity) = &doc.blocks[0] else {
            panic!("expected a block entity, got {doc:?}");
        };
        assert_eq!(entity.entity_type.as_deref(), Some("poll"));
        assert_eq!(entity.id.as_deref(), Some("p1"));
        assert_eq!(
            entity.html,
            r#"<div class="_Entity _EType_poll _EId_p1"><b>q</b></div>"#
        );
    }

    #[test]
    fn caret_inserts_a_selection_marker() {
        let dom = HtmlDocument::parse("<p>abcd</p>");
        let body = dom.body().unwrap();
        let p = dom.children(body)[0];
        let text = dom.children(p)[0];
        let mut context = DomToModelContext::new(Format::new(), 16.0);
        context.caret = Some(DomCaret {
            node: text,
            offset: 2,
        });

        let doc = dom_to_content_model(&dom, body, &mut context);

        assert_eq!(
            doc.to_tree(),
            indoc! {r#"

                └>p
                  ├>"ab"
                  ├>|
                  └>"cd"
            "#}
        );
    }

    #[test]
    fn disabled_format_parser_is_skipped() {
        let dom = HtmlDocument::parse("<span style='color:red'>x</span>");
        let body = dom.body().unwrap();
        let option = DomToModelOption {
            format_parser_override: HashMap::from([(FormatKey::Color, None)]),
            ..Default::default()
        };
        let mut context =
            DomToModelContext::with_options(Format::new(), 16.0, &[&option]);

        let doc = dom_to_content_model(&dom, body, &mut context);

        assert_eq!(doc.plain_text(), "x");
        assert!(doc.blocks[0].as_paragraph().unwrap().segments[0]
            .format
            .is_empty());
    }
}
