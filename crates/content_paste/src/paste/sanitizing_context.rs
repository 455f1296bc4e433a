// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::HashMap;
use std::rc::Rc;

use super::sanitizer::{SanitizerTables, SanitizingOption};
use crate::content_model::{Block, Format, FormatCategory, FormatKey};
use crate::dom::{CopyAction, ElementData, HtmlDocument};
use crate::dom_to_model::{
    add_text, default_element_processors, entity_processor, is_block_display,
    DomToModelContext, DomToModelOption, ElementProcessor, FormatParser,
    NodeView, StyledElement, ENTITY_PROCESSOR, GENERAL_PROCESSOR,
    TEXT_PROCESSOR,
};

/// Class marking an entity that renders as a block.
const BLOCK_ENTITY_CLASS: &str = "_EBlock";

/// A conversion context for untrusted clipboard content.
///
/// Every element processor first runs the element through `tables` (with
/// `option`'s additions): disallowed elements are dropped with their
/// subtree, unknown elements are unwrapped, and allowed ones are converted
/// from their cleaned copy. The source tree is never modified.
///
/// The processor and parser overrides in `option` are applied last, so they
/// win over the paste defaults key by key.
pub fn create_dom_to_model_context_for_sanitizing(
    tables: &SanitizerTables,
    option: &SanitizingOption,
    segment_format: Format,
    root_font_size: f64,
) -> DomToModelContext {
    let tables = Rc::new(tables.with_option(option));
    let paste_option = paste_dom_to_model_option(&tables);
    let caller_option = option.dom_to_model_option();

    DomToModelContext::with_options(
        segment_format,
        root_font_size,
        &[&paste_option, &caller_option],
    )
}

fn paste_dom_to_model_option(tables: &Rc<SanitizerTables>) -> DomToModelOption {
    let mut processor_override: HashMap<String, ElementProcessor> =
        HashMap::new();
    for (key, processor) in default_element_processors() {
        if key == TEXT_PROCESSOR || key == ENTITY_PROCESSOR {
            continue;
        }
        let inner = (key != GENERAL_PROCESSOR).then_some(processor);
        processor_override.insert(key, sanitizing_processor(tables.clone(), inner));
    }
    processor_override.insert(
        TEXT_PROCESSOR.to_owned(),
        Rc::new(paste_text_processor),
    );
    processor_override.insert(
        ENTITY_PROCESSOR.to_owned(),
        sanitizing_entity_processor(tables.clone()),
    );

    let display_parser: FormatParser = Rc::new(paste_display_parser);
    let white_space_parser: FormatParser = Rc::new(paste_white_space_parser);
    let container_size_parser: FormatParser = Rc::new(container_size_parser);
    let block_entity_parser: FormatParser = Rc::new(block_entity_parser);
    let filter_tables = tables.clone();

    DomToModelOption {
        processor_override,
        format_parser_override: HashMap::from([
            (FormatKey::Display, Some(display_parser)),
            (FormatKey::WhiteSpace, Some(white_space_parser)),
        ]),
        additional_format_parsers: HashMap::from([
            (FormatCategory::Container, vec![container_size_parser]),
            (FormatCategory::Entity, vec![block_entity_parser]),
        ]),
        element_filter: Some(Rc::new(move |element: &ElementData| {
            filter_tables.classify(element)
        })),
    }
}

/// Text from the clipboard never carries a caret.
fn paste_text_processor(
    group: &mut Vec<Block>,
    node: NodeView<'_>,
    context: &mut DomToModelContext,
) {
    if let Some(text) = node.text() {
        add_text(group, text, context, None);
    }
}

/// Sanitize the element, then hand the cleaned copy to `inner`. Without an
/// `inner` processor the default one registered for the tag is used, and
/// then the general one.
fn sanitizing_processor(
    tables: Rc<SanitizerTables>,
    inner: Option<ElementProcessor>,
) -> ElementProcessor {
    Rc::new(
        move |group: &mut Vec<Block>,
              node: NodeView<'_>,
              context: &mut DomToModelContext| {
            let Some(element) = node.element() else {
                return;
            };
            match tables.classify(element) {
                CopyAction::Drop => {
                    tracing::trace!(tag = element.tag(), "dropped pasted subtree");
                }
                CopyAction::Unwrap => {
                    tracing::trace!(tag = element.tag(), "unwrapped pasted element");
                    context.process_children(group, node);
                }
                CopyAction::Keep(clean) => {
                    let processor = inner.clone().or_else(|| {
                        context
                            .default_element_processors
                            .get(clean.tag())
                            .or_else(|| {
                                context
                                    .default_element_processors
                                    .get(GENERAL_PROCESSOR)
                            })
                            .cloned()
                    });
                    if let Some(processor) = processor {
                        processor(group, node.with_element(&clean), context);
                    }
                }
            }
        },
    )
}

/// Entities keep their HTML, so the default entity handling runs on a
/// sanitized deep copy of the subtree.
fn sanitizing_entity_processor(tables: Rc<SanitizerTables>) -> ElementProcessor {
    Rc::new(
        move |group: &mut Vec<Block>,
              node: NodeView<'_>,
              context: &mut DomToModelContext| {
            let classify = |element: &ElementData| tables.classify(element);
            match HtmlDocument::copy_subtree(node.dom, node.id, &classify) {
                Some((copy, root)) => {
                    entity_processor(group, NodeView::new(&copy, root), context)
                }
                None => tracing::trace!("dropped pasted entity"),
            }
        },
    )
}

/// Only an explicit inline `display` counts, and never `flex`, so layout
/// styles of the source document do not turn inline content into blocks.
fn paste_display_parser(
    format: &mut Format,
    styled: &StyledElement<'_>,
    _context: &DomToModelContext,
) {
    if let Some(display) = styled.inline_value("display") {
        if display != "flex" {
            format.set(FormatKey::Display, display);
        }
    }
}

/// An element styled `white-space: pre` inline keeps the white space it
/// inherited.
fn paste_white_space_parser(
    format: &mut Format,
    styled: &StyledElement<'_>,
    context: &DomToModelContext,
) {
    if styled.inline_value("white-space") == Some("pre") {
        return;
    }
    if let Some(parser) = context.default_format_parsers.get(&FormatKey::WhiteSpace) {
        parser(format, styled, context);
    }
}

/// Pasted paragraphs take the width of the destination. Other containers
/// keep their pixel width but may not overflow it.
fn container_size_parser(
    format: &mut Format,
    styled: &StyledElement<'_>,
    _context: &DomToModelContext,
) {
    if matches!(styled.tag(), "div" | "p") {
        format.remove(FormatKey::Width);
        format.remove(FormatKey::Height);
    } else if format
        .get(FormatKey::Width)
        .is_some_and(|width| width.trim().ends_with("px"))
    {
        format.set(FormatKey::MaxWidth, "100%");
    }
}

fn block_entity_parser(
    format: &mut Format,
    styled: &StyledElement<'_>,
    _context: &DomToModelContext,
) {
    if styled.element.has_class(BLOCK_ENTITY_CLASS)
        || styled.value("display").is_some_and(is_block_display)
    {
        format.set(FormatKey::Display, "block");
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;
    use crate::content_model::to_tree::ToTree;
    use crate::paste::ValueSanitizer;
    use crate::content_model::{ContentDocument, SegmentKind};
    use crate::dom_to_model::{dom_to_content_model, DomCaret};

    fn convert_with(html: &str, option: &SanitizingOption) -> ContentDocument {
        let dom = HtmlDocument::parse(html);
        let body = dom.body().unwrap();
        let mut context = create_dom_to_model_context_for_sanitizing(
            &SanitizerTables::default(),
            option,
            Format::new(),
            16.0,
        );
        dom_to_content_model(&dom, body, &mut context)
    }

    fn convert(html: &str) -> ContentDocument {
        convert_with(html, &SanitizingOption::default())
    }

    #[test]
    fn disallowed_elements_lose_their_content() {
        let doc = convert(
            "a<form><b>in form</b></form><button>x</button>b<iframe src='x'></iframe>",
        );

        assert_eq!(doc.plain_text(), "ab");
    }

    #[test]
    fn unknown_elements_are_unwrapped() {
        let doc = convert("<o:p><b>kept</b></o:p><custom-tag style='color:red'>too</custom-tag>");

        assert_eq!(
            doc.to_tree(),
            indoc! {r#"

                └>p
                  ├>"kept" {font-weight: bold}
                  └>"too"
            "#}
        );
    }

    #[test]
    fn script_links_are_not_pasted() {
        let doc = convert(r#"<a href="javascript:alert(1)" onclick="x()">click</a>"#);

        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        assert_eq!(paragraph.plain_text(), "click");
        assert!(paragraph.segments[0].link.is_none());
    }

    #[test]
    fn paragraphs_lose_their_size() {
        let doc = convert(r#"<p style="width: 300px; height: 20px">a</p><div style="width: 200px">b</div>"#);

        assert!(doc.blocks.iter().all(|b| b.format().get(FormatKey::Width).is_none()));
    }

    #[test]
    fn layout_only_display_does_not_make_blocks() {
        let doc = convert(r#"<span style="display: flex">a</span><span>b</span>"#);

        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.plain_text(), "ab");
    }

    #[test]
    fn dom_caret_is_ignored_for_pasted_text() {
        let dom = HtmlDocument::parse("<p>abcd</p>");
        let body = dom.body().unwrap();
        let text = dom.children(dom.children(body)[0])[0];
        let mut context = create_dom_to_model_context_for_sanitizing(
            &SanitizerTables::default(),
            &SanitizingOption::default(),
            Format::new(),
            16.0,
        );
        context.caret = Some(DomCaret { node: text, offset: 1 });

        let doc = dom_to_content_model(&dom, body, &mut context);

        assert_eq!(doc.selection_marker_count(), 0);
    }

    #[test]
    fn entities_keep_only_sanitized_html() {
        let doc = convert(indoc! {r#"
            <div class="_Entity _EType_card _EBlock"><b onclick="x()">t</b><script>bad()</script></div>
        "#});

        let Block::Entity(entity) = &doc.blocks[0] else {
            panic!("expected a block entity, got {doc:?}");
        };
        assert_eq!(
            entity.html,
            r#"<div class="_Entity _EType_card _EBlock"><b>t</b></div>"#
        );
    }

    #[test]
    fn caller_processor_override_wins() {
        let option = SanitizingOption {
            processor_override: HashMap::from([(
                "b".to_owned(),
                Rc::new(
                    |group: &mut Vec<Block>,
                     _: NodeView<'_>,
                     context: &mut DomToModelContext| {
                        add_text(group, "B", context, None);
                    },
                ) as ElementProcessor,
            )]),
            ..Default::default()
        };

        let doc = convert_with("a<b>b</b>", &option);

        assert_eq!(doc.plain_text(), "aB");
    }

    #[test]
    fn caller_cell_processor_converts_cell_content() {
        let option = SanitizingOption {
            processor_override: HashMap::from([(
                "td".to_owned(),
                Rc::new(
                    |group: &mut Vec<Block>,
                     node: NodeView<'_>,
                     context: &mut DomToModelContext| {
                        let id = node.element().and_then(|e| e.attr("id"));
                        add_text(group, id.unwrap_or("none"), context, None);
                    },
                ) as ElementProcessor,
            )]),
            attribute_sanitizers: HashMap::from([(
                "id".to_owned(),
                ValueSanitizer::transform(|value, _| Some(value.to_uppercase())),
            )]),
            ..Default::default()
        };

        let doc = convert_with(
            r#"<table><tr><td id="a">x</td><th>y</th></tr></table>"#,
            &option,
        );

        assert_eq!(doc.plain_text(), "A\ny");
    }

    #[test]
    fn disallowed_cells_are_dropped_from_the_table() {
        let option = SanitizingOption {
            additional_disallowed_tags: vec!["th".to_owned()],
            ..Default::default()
        };

        let doc = convert_with("<table><tr><th>h</th><td>x</td></tr></table>", &option);

        let table = doc.blocks[0].as_table().unwrap();
        assert_eq!(table.rows[0].cells.len(), 1);
        assert_eq!(doc.plain_text(), "x");
    }

    #[test]
    fn additional_allowed_tags_are_converted() {
        let option = SanitizingOption {
            additional_allowed_tags: vec!["x-note".to_owned()],
            ..Default::default()
        };

        let doc = convert_with("<x-note style='color: blue'>n</x-note>", &option);

        let segment = &doc.blocks[0].as_paragraph().unwrap().segments[0];
        assert_eq!(segment.kind, SegmentKind::Text("n".to_owned()));
        assert_eq!(segment.format.get(FormatKey::Color), Some("blue"));
    }
}
