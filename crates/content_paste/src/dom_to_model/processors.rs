// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::HashMap;
use std::rc::Rc;

use super::{
    DomToModelContext, ElementProcessor, NodeView, StyledElement,
    ENTITY_PROCESSOR, GENERAL_PROCESSOR, TEXT_PROCESSOR,
};
use crate::content_model::format::INHERITABLE_BLOCK_KEYS;
use crate::content_model::{
    add_segment, Block, Entity, Format, FormatCategory, FormatKey, Image,
    Link, Paragraph, Segment, SegmentKind, Table, TableCell, TableRow,
};
use crate::dom::{CopyAction, ElementData, NodeId};

/// Tags whose content is never document content.
const SKIPPED_TAGS: &[&str] = &[
    "head", "title", "meta", "link", "base", "script", "noscript", "style",
    "template", "iframe", "object", "embed", "svg", "math",
];

/// Tags converted by [`block_processor`], which decides block or inline
/// from their display style.
const FORMAT_CONTAINER_TAGS: &[&str] = &[
    "address", "article", "aside", "b", "big", "blockquote", "center", "cite",
    "code", "dd", "del", "dfn", "div", "dl", "dt", "em", "figcaption",
    "figure", "font", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "i", "ins", "kbd", "li", "main", "mark", "nav", "ol", "p", "pre", "s",
    "samp", "section", "small", "span", "strike", "strong", "sub", "sup",
    "tt", "u", "ul", "var",
];

pub fn default_element_processors() -> HashMap<String, ElementProcessor> {
    let mut processors: HashMap<String, ElementProcessor> = HashMap::new();
    let block: ElementProcessor = Rc::new(block_processor);
    for tag in FORMAT_CONTAINER_TAGS {
        processors.insert((*tag).to_owned(), block.clone());
    }
    let skip: ElementProcessor = Rc::new(
        |_: &mut Vec<Block>, _: NodeView<'_>, _: &mut DomToModelContext| {},
    );
    for tag in SKIPPED_TAGS {
        processors.insert((*tag).to_owned(), skip.clone());
    }
    processors.insert(TEXT_PROCESSOR.to_owned(), Rc::new(text_processor));
    processors.insert("br".to_owned(), Rc::new(br_processor));
    processors.insert("a".to_owned(), Rc::new(link_processor));
    processors.insert("img".to_owned(), Rc::new(image_processor));
    processors.insert("table".to_owned(), Rc::new(table_processor));
    processors.insert(ENTITY_PROCESSOR.to_owned(), Rc::new(entity_processor));
    processors.insert(GENERAL_PROCESSOR.to_owned(), block);
    processors
}

/// Whether a CSS `display` value lays the element out as a block.
pub fn is_block_display(display: &str) -> bool {
    let display = display.trim();
    !(display.is_empty()
        || display.starts_with("inline")
        || display == "contents"
        || display == "none")
}

fn text_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    let caret = context
        .caret
        .filter(|caret| caret.node == node.id)
        .map(|caret| caret.offset);
    if let Some(text) = node.text() {
        add_text(group, text, context, caret);
    }
}

/// Append text at the current position, collapsing whitespace outside
/// preformatted blocks. With `caret`, a selection marker is placed at that
/// character offset.
pub fn add_text(
    group: &mut Vec<Block>,
    text: &str,
    context: &DomToModelContext,
    caret: Option<usize>,
) {
    match caret {
        Some(offset) => {
            let split = text
                .char_indices()
                .nth(offset)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            push_text(group, &text[..split], context);
            add_segment(
                group,
                Segment::selection_marker(context.segment_format.clone()),
                &context.inherited_block_format(),
            );
            push_text(group, &text[split..], context);
        }
        None => push_text(group, text, context),
    }
}

fn push_text(group: &mut Vec<Block>, text: &str, context: &DomToModelContext) {
    if context.is_pre() {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                push_segment(group, SegmentKind::Br, context);
            }
            if !line.is_empty() {
                push_segment(group, SegmentKind::Text(line.to_owned()), context);
            }
        }
        return;
    }

    let mut collapsed = collapse_whitespace(text);
    if collapsed.starts_with(' ') && previous_text_ends_with_space(group) {
        collapsed.remove(0);
    }
    if !collapsed.is_empty() {
        push_segment(group, SegmentKind::Text(collapsed), context);
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn previous_text_ends_with_space(group: &[Block]) -> bool {
    let Some(Block::Paragraph(paragraph)) = group.last() else {
        return false;
    };
    paragraph
        .segments
        .iter()
        .rev()
        .find(|s| !s.is_selection_marker())
        .and_then(Segment::as_text)
        .is_some_and(|text| text.ends_with(' '))
}

fn push_segment(
    group: &mut Vec<Block>,
    kind: SegmentKind,
    context: &DomToModelContext,
) {
    let mut segment = Segment::new(kind, context.segment_format.clone());
    segment.link = context.link.clone();
    add_segment(group, segment, &context.inherited_block_format());
}

fn br_processor(
    group: &mut Vec<Block>,
    _node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    push_segment(group, SegmentKind::Br, context);
}

/// Converts elements that are either a block (a new paragraph) or an inline
/// format container, depending on their display style.
pub fn block_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    let Some(element) = node.element() else {
        return;
    };
    let styled = StyledElement::new(element);
    if styled.inline_value("display") == Some("none") {
        return;
    }
    let stash = context.stash();

    if context.is_block(&styled) {
        let mut block_format = context.inherited_block_format();
        context.parse_format(FormatCategory::Block, &styled, &mut block_format);
        context.parse_format(
            FormatCategory::Container,
            &styled,
            &mut block_format,
        );
        let mut segment_format = context.segment_format.clone();
        context.parse_format(
            FormatCategory::SegmentOnBlock,
            &styled,
            &mut segment_format,
        );
        context.block_format = block_format.clone();
        context.segment_format = segment_format;

        group.push(Block::Paragraph(Paragraph::new(block_format)));
        context.process_children(group, node);
        context.restore(stash);
        // Inline content after the block must not join its last paragraph.
        group.push(Block::Paragraph(Paragraph::implicit(
            context.inherited_block_format(),
        )));
    } else {
        let mut segment_format = context.segment_format.clone();
        context.parse_format(
            FormatCategory::Segment,
            &styled,
            &mut segment_format,
        );
        context.segment_format = segment_format;
        context.process_children(group, node);
        context.restore(stash);
    }
}

fn link_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    let Some(element) = node.element() else {
        return;
    };
    let stash = context.stash();
    if let Some(href) = element.attr("href").filter(|h| !h.trim().is_empty()) {
        context.link = Some(Link {
            href: href.trim().to_owned(),
            target: element.attr("target").map(str::to_owned),
            title: element.attr("title").map(str::to_owned),
        });
    }
    let styled = StyledElement::new(element);
    let mut segment_format = context.segment_format.clone();
    context.parse_format(FormatCategory::Segment, &styled, &mut segment_format);
    context.segment_format = segment_format;
    context.process_children(group, node);
    context.restore(stash);
}

fn image_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    let Some(element) = node.element() else {
        return;
    };
    let Some(src) = element.attr("src").filter(|s| !s.trim().is_empty())
    else {
        return;
    };
    let styled = StyledElement::new(element);
    let mut format = context.segment_format.clone();
    context.parse_format(FormatCategory::Image, &styled, &mut format);
    let image = Image {
        src: src.trim().to_owned(),
        alt: element.attr("alt").map(str::to_owned),
        title: element.attr("title").map(str::to_owned),
    };
    let mut segment = Segment::image(image, format);
    segment.link = context.link.clone();
    add_segment(group, segment, &context.inherited_block_format());
}

fn span_attr(element: &ElementData, name: &str) -> usize {
    element
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(1, 1000))
        .unwrap_or(1)
}

fn table_rows(node: NodeView<'_>) -> Vec<NodeId> {
    let dom = node.dom;
    let mut rows = Vec::new();
    for child in node.children() {
        match dom.tag(*child) {
            Some("tr") => rows.push(*child),
            Some("thead" | "tbody" | "tfoot") => rows.extend(
                dom.children(*child)
                    .iter()
                    .filter(|c| dom.tag(**c) == Some("tr")),
            ),
            _ => {}
        }
    }
    rows
}

/// The filtered copy of an element the table reads directly, `None` when
/// it is dropped.
fn filtered(context: &DomToModelContext, element: &ElementData) -> Option<ElementData> {
    match context.filter_element(element) {
        CopyAction::Keep(clean) => Some(clean),
        CopyAction::Unwrap => Some(ElementData::new(element.tag())),
        CopyAction::Drop => None,
    }
}

/// Lay cells out on a grid so that `colspan` and `rowspan` produce spanned
/// placeholder cells, the way the table renders.
///
/// Rows and cells are read here rather than dispatched, so they go through
/// the context's element filter first. A dropped row or cell is skipped and
/// an unwrapped one loses its attributes. A processor registered for `td` or
/// `th` converts the cell content.
fn table_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    let Some(element) = node.element() else {
        return;
    };
    let styled = StyledElement::new(element);
    let mut table_format = Format::new();
    context.parse_format(FormatCategory::Table, &styled, &mut table_format);

    let rows: Vec<(NodeId, ElementData)> = table_rows(node)
        .into_iter()
        .filter_map(|tr| {
            let row_element = node.dom.element(tr)?;
            filtered(context, row_element).map(|clean| (tr, clean))
        })
        .collect();
    let mut grid: Vec<Vec<Option<TableCell>>> = vec![Vec::new(); rows.len()];
    let mut row_formats = Vec::with_capacity(rows.len());
    let stash = context.stash();

    for (r, (tr, row_element)) in rows.iter().enumerate() {
        let mut row_format = Format::new();
        context.parse_keys(
            &[FormatKey::BackgroundColor, FormatKey::Height],
            &StyledElement::new(row_element),
            &mut row_format,
        );
        row_formats.push(row_format);

        let mut column = 0;
        for cell_id in node.dom.children(*tr) {
            let Some(source) = node.dom.element(*cell_id) else {
                continue;
            };
            let is_header = match source.tag() {
                "td" => false,
                "th" => true,
                _ => continue,
            };
            let Some(cell_element) = filtered(context, source) else {
                continue;
            };
            while grid[r].get(column).is_some_and(Option::is_some) {
                column += 1;
            }
            let colspan = span_attr(&cell_element, "colspan");
            let rowspan = span_attr(&cell_element, "rowspan").min(rows.len() - r);

            let cell_styled = StyledElement::new(&cell_element);
            let mut cell_format = Format::new();
            context.parse_format(
                FormatCategory::TableCell,
                &cell_styled,
                &mut cell_format,
            );
            let mut cell =
                TableCell::new(false, false, is_header, cell_format.clone());

            context.block_format =
                stash.block_format.only(INHERITABLE_BLOCK_KEYS);
            let mut segment_format = stash.segment_format.clone();
            context.parse_format(
                FormatCategory::SegmentOnBlock,
                &cell_styled,
                &mut segment_format,
            );
            context.segment_format = segment_format;
            let cell_node = node.child(*cell_id).with_element(&cell_element);
            match context.element_processors.get(cell_element.tag()).cloned() {
                Some(processor) => processor(&mut cell.blocks, cell_node, context),
                None => context.process_children(&mut cell.blocks, cell_node),
            }
            context.restore(stash.clone());

            for dr in 0..rowspan {
                for dc in 0..colspan {
                    let placed = if dr == 0 && dc == 0 {
                        std::mem::take(&mut cell)
                    } else {
                        TableCell::new(
                            dc > 0,
                            dr > 0,
                            is_header,
                            cell_format.clone(),
                        )
                    };
                    let row = &mut grid[r + dr];
                    if row.len() <= column + dc {
                        row.resize(column + dc + 1, None);
                    }
                    row[column + dc] = Some(placed);
                }
            }
            column += colspan;
        }
    }

    let table = Table {
        rows: grid
            .into_iter()
            .zip(row_formats)
            .map(|(cells, format)| TableRow {
                cells: cells.into_iter().map(Option::unwrap_or_default).collect(),
                format,
            })
            .collect(),
        format: table_format,
    };
    group.push(Block::Table(table));
}

/// Entity wrappers carry their type and id in `_EType_<type>` and
/// `_EId_<id>` classes.
pub fn entity_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    let Some(element) = node.element() else {
        return;
    };
    let styled = StyledElement::new(element);
    let mut format = Format::new();
    context.parse_format(FormatCategory::Entity, &styled, &mut format);

    let class_value = |prefix: &str| {
        element
            .classes()
            .find_map(|c| c.strip_prefix(prefix))
            .map(str::to_owned)
    };
    let is_block = format.get(FormatKey::Display).is_some_and(is_block_display);
    let entity = Entity {
        entity_type: class_value("_EType_"),
        id: class_value("_EId_"),
        html: node.dom.outer_html(node.id),
        is_block,
        format,
    };

    if is_block {
        group.push(Block::Entity(entity));
    } else {
        let segment = Segment::entity(entity, context.segment_format.clone());
        add_segment(group, segment, &context.inherited_block_format());
    }
}
