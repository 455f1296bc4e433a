// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Merging one content document into another at the selection.
//!
//! The target's selection is collapsed to a single selection marker first.
//! Source blocks are then inserted before that marker, so the marker ends up
//! right after the merged content.

mod merge_table;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::content_model::format::FormatKey;
use crate::content_model::normalize::normalize_blocks;
use crate::content_model::path::{
    blocks_at, blocks_at_mut, find_segment, find_selection_marker,
};
use crate::content_model::{
    Block, CellPosition, ContentDocument, Format, Paragraph, Segment,
    SegmentKind,
};
use crate::error::PasteError;

use merge_table::merge_table;

/// Where merged content goes: the selection marker of a paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertPoint {
    /// Cells leading to the block list holding the paragraph. Empty for the
    /// top-level list.
    pub path: Vec<CellPosition>,
    pub paragraph_index: usize,
    pub marker_format: Format,
}

/// How the format of merged segments relates to the format at the insert
/// point.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum MergeFormat {
    /// Keep the source format as is.
    #[default]
    None,
    /// Use the format at the insert point, keeping only bold, italic and
    /// underline from the source.
    KeepSourceEmphasisFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeModelOption {
    pub merge_format: MergeFormat,
    /// Merge a single pasted table cell by cell into the table holding the
    /// insert point.
    pub merge_table: bool,
}

/// Merge `source` into `target` at its selection, replacing any selected
/// content. Returns where the selection marker ended up.
pub fn merge_model(
    target: &mut ContentDocument,
    mut source: ContentDocument,
    option: &MergeModelOption,
) -> Result<Option<InsertPoint>, PasteError> {
    let mut insert = delete_selection(target)?;

    if option.merge_format != MergeFormat::None {
        apply_default_format(
            &mut source.blocks,
            &insert.marker_format,
            option.merge_format,
        );
    }

    for (index, block) in source.blocks.into_iter().enumerate() {
        match block {
            Block::Paragraph(paragraph) => {
                merge_paragraph(target, &mut insert, paragraph, index == 0)?
            }
            Block::Table(table)
                if option.merge_table && !insert.path.is_empty() =>
            {
                merge_table(&mut target.blocks, &mut insert, table)?
            }
            block => insert_block(target, &mut insert, block)?,
        }
    }

    normalize_blocks(&mut target.blocks);

    let insert_point =
        find_selection_marker(&target.blocks).and_then(|(path, p, s)| {
            let blocks = blocks_at(&target.blocks, &path)?;
            let marker = blocks.get(p)?.as_paragraph()?.segments.get(s)?;
            Some(InsertPoint {
                marker_format: marker.format.clone(),
                path,
                paragraph_index: p,
            })
        });
    tracing::debug!(
        blocks = target.blocks.len(),
        in_table = insert_point.as_ref().is_some_and(|i| !i.path.is_empty()),
        "merged content"
    );
    Ok(insert_point)
}

/// Collapse the selection of `target` to a single selection marker and
/// return its position.
///
/// The marker replaces the first selected segment (or the existing marker).
/// Every other selected segment and marker is removed. When the selection
/// ends in a later paragraph of the same block list, what remains of that
/// paragraph joins the paragraph holding the marker. Without any selection
/// a marker is appended to the end of the document.
pub fn delete_selection(
    target: &mut ContentDocument,
) -> Result<InsertPoint, PasteError> {
    let is_selection = |s: &Segment| s.is_selection_marker() || s.is_selected;
    let Some((path, p, s)) = find_segment(&target.blocks, &is_selection) else {
        return Ok(append_marker(&mut target.blocks));
    };

    let blocks =
        blocks_at(&target.blocks, &path).ok_or(PasteError::InvalidInsertPath)?;
    let marker_format = blocks
        .get(p)
        .and_then(Block::as_paragraph)
        .and_then(|paragraph| paragraph.segments.get(s))
        .map(|segment| segment.format.clone())
        .ok_or(PasteError::NotAParagraph(p))?;
    let tail = (p + 1..blocks.len()).rev().find(|&j| {
        blocks[j]
            .as_paragraph()
            .is_some_and(|para| para.segments.iter().any(|s| s.is_selected))
    });

    remove_selection(&mut target.blocks);

    let blocks = blocks_at_mut(&mut target.blocks, &path)
        .ok_or(PasteError::InvalidInsertPath)?;
    let rest = match tail {
        Some(j) => blocks
            .get_mut(j)
            .and_then(Block::as_paragraph_mut)
            .map(|para| std::mem::take(&mut para.segments))
            .unwrap_or_default(),
        None => Vec::new(),
    };
    let paragraph = paragraph_at(blocks, p)?;
    paragraph
        .segments
        .insert(s, Segment::selection_marker(marker_format.clone()));
    paragraph.segments.extend(rest);

    Ok(InsertPoint {
        path,
        paragraph_index: p,
        marker_format,
    })
}

fn remove_selection(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(paragraph) => paragraph
                .segments
                .retain(|s| !s.is_selected && !s.is_selection_marker()),
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
                {
                    remove_selection(&mut cell.blocks);
                }
            }
            Block::Entity(_) => {}
        }
    }
}

fn append_marker(blocks: &mut Vec<Block>) -> InsertPoint {
    let marker = Segment::selection_marker(Format::new());
    match blocks.last_mut() {
        Some(Block::Paragraph(paragraph)) => paragraph.segments.push(marker),
        _ => blocks.push(Block::Paragraph(Paragraph::from_segments(vec![
            marker,
        ]))),
    }
    InsertPoint {
        path: Vec::new(),
        paragraph_index: blocks.len() - 1,
        marker_format: Format::new(),
    }
}

/// Rewrite segment formats of `blocks` according to `merge_format`, given
/// the format at the insert point.
pub fn apply_default_format(
    blocks: &mut [Block],
    marker_format: &Format,
    merge_format: MergeFormat,
) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(paragraph) => {
                if merge_format == MergeFormat::KeepSourceEmphasisFormat {
                    paragraph.format.remove(FormatKey::BackgroundColor);
                }
                for segment in paragraph.segments.iter_mut() {
                    segment.format = match merge_format {
                        MergeFormat::None => continue,
                        MergeFormat::KeepSourceEmphasisFormat => marker_format
                            .merged(&segment.format.semantic_format()),
                    };
                }
            }
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
                {
                    apply_default_format(
                        &mut cell.blocks,
                        marker_format,
                        merge_format,
                    );
                }
            }
            Block::Entity(_) => {}
        }
    }
}

fn paragraph_at(
    blocks: &mut [Block],
    index: usize,
) -> Result<&mut Paragraph, PasteError> {
    blocks
        .get_mut(index)
        .and_then(Block::as_paragraph_mut)
        .ok_or(PasteError::NotAParagraph(index))
}

/// The first source paragraph joins the paragraph at the insert point.
/// Later ones start a new paragraph at the marker.
fn merge_paragraph(
    target: &mut ContentDocument,
    insert: &mut InsertPoint,
    source: Paragraph,
    into_current: bool,
) -> Result<(), PasteError> {
    let blocks = blocks_at_mut(&mut target.blocks, &insert.path)
        .ok_or(PasteError::InvalidInsertPath)?;
    if !into_current {
        split_paragraph(blocks, insert, &source.format)?;
    }

    let paragraph = paragraph_at(blocks, insert.paragraph_index)?;
    let marker = paragraph
        .selection_marker_index()
        .ok_or(PasteError::MissingSelectionMarker)?;
    if into_current && is_empty_line(paragraph) {
        paragraph.format = paragraph.format.merged(&source.format);
    }
    paragraph.segments.splice(marker..marker, source.segments);
    Ok(())
}

/// Insert a block before the marker, splitting its paragraph.
fn insert_block(
    target: &mut ContentDocument,
    insert: &mut InsertPoint,
    block: Block,
) -> Result<(), PasteError> {
    let blocks = blocks_at_mut(&mut target.blocks, &insert.path)
        .ok_or(PasteError::InvalidInsertPath)?;
    split_paragraph(blocks, insert, &Format::new())?;
    blocks.insert(insert.paragraph_index, block);
    insert.paragraph_index += 1;
    Ok(())
}

/// Move the marker and everything after it into a new paragraph right
/// after the current one, and point `insert` at it. The new paragraph has
/// the current paragraph's format with `format` layered over it.
fn split_paragraph(
    blocks: &mut Vec<Block>,
    insert: &mut InsertPoint,
    format: &Format,
) -> Result<(), PasteError> {
    let index = insert.paragraph_index;
    let paragraph = paragraph_at(blocks, index)?;
    let marker = paragraph
        .selection_marker_index()
        .ok_or(PasteError::MissingSelectionMarker)?;

    let mut new_paragraph = Paragraph::new(paragraph.format.merged(format));
    new_paragraph.segments = paragraph.segments.split_off(marker);
    // An emptied paragraph is dropped by the final normalization.
    blocks.insert(index + 1, Block::Paragraph(new_paragraph));
    insert.paragraph_index = index + 1;
    Ok(())
}

/// Only the marker and line breaks.
fn is_empty_line(paragraph: &Paragraph) -> bool {
    paragraph
        .segments
        .iter()
        .all(|s| matches!(s.kind, SegmentKind::SelectionMarker | SegmentKind::Br))
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;
    use crate::content_model::to_tree::ToTree;
    use crate::content_model::{Entity, Table, TableCell, TableRow};

    fn text(s: &str) -> Segment {
        Segment::text(s, Format::new())
    }

    fn marker() -> Segment {
        Segment::selection_marker(Format::new())
    }

    fn paragraph(segments: Vec<Segment>) -> Block {
        Block::Paragraph(Paragraph::from_segments(segments))
    }

    fn doc(blocks: Vec<Block>) -> ContentDocument {
        ContentDocument::new(blocks)
    }

    fn bold() -> Format {
        Format::new().with(FormatKey::FontWeight, "bold")
    }

    #[test]
    fn single_paragraph_merges_at_the_caret() {
        let mut target = doc(vec![paragraph(vec![text("ab"), marker(), text("cd")])]);
        let source = doc(vec![paragraph(vec![text("XY")])]);

        let insert = merge_model(&mut target, source, &MergeModelOption::default())
            .unwrap()
            .unwrap();

        assert_eq!(
            target.to_tree(),
            indoc! {r#"

                └>p
                  ├>"abXY"
                  ├>|
                  └>"cd"
            "#}
        );
        assert_eq!(insert.paragraph_index, 0);
        assert!(insert.path.is_empty());
    }

    #[test]
    fn later_paragraphs_split_the_target() {
        let mut target = doc(vec![paragraph(vec![text("ab"), marker(), text("cd")])]);
        let source = doc(vec![
            paragraph(vec![text("1")]),
            paragraph(vec![text("2")]),
            paragraph(vec![text("3")]),
        ]);

        let insert = merge_model(&mut target, source, &MergeModelOption::default())
            .unwrap()
            .unwrap();

        assert_eq!(target.plain_text(), "ab1\n2\n3cd");
        assert_eq!(insert.paragraph_index, 2);
    }

    #[test]
    fn selected_range_is_replaced() {
        let mut target = doc(vec![
            paragraph(vec![text("a"), Segment::text("b", bold()).selected()]),
            paragraph(vec![text("c").selected()]),
            paragraph(vec![text("d").selected(), text("e")]),
        ]);
        let source = doc(vec![paragraph(vec![text("X")])]);

        let insert = merge_model(&mut target, source, &MergeModelOption::default())
            .unwrap()
            .unwrap();

        assert_eq!(
            target.to_tree(),
            indoc! {r#"

                └>p
                  ├>"aX"
                  ├>| {font-weight: bold}
                  └>"e"
            "#}
        );
        assert_eq!(insert.marker_format, bold());
    }

    #[test]
    fn without_selection_content_is_appended() {
        let mut target = doc(vec![paragraph(vec![text("a")])]);
        let source = doc(vec![paragraph(vec![text("b")])]);

        merge_model(&mut target, source, &MergeModelOption::default()).unwrap();

        assert_eq!(target.plain_text(), "ab");
        assert_eq!(target.selection_marker_count(), 1);
    }

    #[test]
    fn keep_source_emphasis_uses_the_target_format() {
        let red = Format::new().with(FormatKey::Color, "red");
        let mut target = doc(vec![paragraph(vec![Segment::selection_marker(
            red.clone(),
        )])]);
        let source_format = Format::new()
            .with(FormatKey::FontWeight, "bold")
            .with(FormatKey::FontSize, "30px");
        let mut source_paragraph =
            Paragraph::from_segments(vec![Segment::text("x", source_format)]);
        source_paragraph.format.set(FormatKey::BackgroundColor, "yellow");
        let source = doc(vec![Block::Paragraph(source_paragraph)]);

        merge_model(
            &mut target,
            source,
            &MergeModelOption {
                merge_format: MergeFormat::KeepSourceEmphasisFormat,
                merge_table: false,
            },
        )
        .unwrap();

        let paragraph = target.blocks[0].as_paragraph().unwrap();
        assert_that!(paragraph.format.get(FormatKey::BackgroundColor)).is_none();
        assert_eq!(paragraph.segments[0].format, red.with(FormatKey::FontWeight, "bold"));
    }

    #[test]
    fn block_entities_are_inserted_between_split_paragraphs() {
        let mut target = doc(vec![paragraph(vec![text("a"), marker(), text("b")])]);
        let source = doc(vec![Block::Entity(Entity {
            html: "<div></div>".to_owned(),
            is_block: true,
            ..Default::default()
        })]);

        merge_model(&mut target, source, &MergeModelOption::default()).unwrap();

        assert_eq!(
            target.to_tree(),
            indoc! {r#"

                ├>p
                │ └>"a"
                ├>entity
                └>p
                  ├>|
                  └>"b"
            "#}
        );
    }

    fn table(texts: &[&[&str]]) -> Table {
        Table {
            rows: texts
                .iter()
                .map(|row| TableRow {
                    cells: row
                        .iter()
                        .map(|t| {
                            let mut cell = TableCell::default();
                            cell.add_segment(text(t));
                            cell
                        })
                        .collect(),
                    format: Format::new(),
                })
                .collect(),
            format: Format::new(),
        }
    }

    #[test]
    fn table_outside_a_table_is_inserted_as_a_block() {
        let mut target = doc(vec![paragraph(vec![marker()])]);
        let source = doc(vec![Block::Table(table(&[&["x"]]))]);

        merge_model(
            &mut target,
            source,
            &MergeModelOption {
                merge_table: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(target.blocks[0].is_table());
        assert_eq!(target.blocks[1].as_paragraph().unwrap().segments, vec![marker()]);
    }

    #[test]
    fn broken_insert_point_is_reported() {
        let mut blocks = vec![paragraph(vec![text("no marker")])];
        let mut insert = InsertPoint {
            path: Vec::new(),
            paragraph_index: 0,
            marker_format: Format::new(),
        };

        assert_eq!(
            split_paragraph(&mut blocks, &mut insert, &Format::new()),
            Err(PasteError::MissingSelectionMarker)
        );
        insert.paragraph_index = 3;
        assert_eq!(
            split_paragraph(&mut blocks, &mut insert, &Format::new()),
            Err(PasteError::NotAParagraph(3))
        );
    }
}
