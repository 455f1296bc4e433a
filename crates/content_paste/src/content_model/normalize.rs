// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{Block, Format, Paragraph, Segment, SegmentKind, Table, TableCell};

/// Bring a block list into canonical shape:
/// - empty text segments are removed
/// - adjacent text segments with identical format and link are joined
/// - a trailing line break after other content is removed
/// - paragraphs without segments are removed
/// - table rows are padded to the same width
pub fn normalize_blocks(blocks: &mut Vec<Block>) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(paragraph) => normalize_paragraph(paragraph),
            Block::Table(table) => normalize_table(table),
            Block::Entity(_) => {}
        }
    }
    blocks.retain(|block| match block {
        Block::Paragraph(paragraph) => !paragraph.segments.is_empty(),
        _ => true,
    });
}

pub fn normalize_paragraph(paragraph: &mut Paragraph) {
    let mut segments: Vec<Segment> =
        Vec::with_capacity(paragraph.segments.len());
    for segment in paragraph.segments.drain(..) {
        if let SegmentKind::Text(text) = &segment.kind {
            if text.is_empty() {
                continue;
            }
            if let Some(last) = segments.last_mut() {
                if can_join(last, &segment) {
                    if let SegmentKind::Text(last_text) = &mut last.kind {
                        last_text.push_str(text);
                    }
                    continue;
                }
            }
        }
        segments.push(segment);
    }

    let len = segments.len();
    if len > 1
        && segments[len - 1].kind == SegmentKind::Br
        && segments[len - 2].kind != SegmentKind::Br
        && !segments[len - 1].is_selected
    {
        segments.pop();
    }

    paragraph.segments = segments;
}

fn can_join(left: &Segment, right: &Segment) -> bool {
    matches!(left.kind, SegmentKind::Text(_))
        && left.format == right.format
        && left.link == right.link
        && left.is_selected == right.is_selected
}

/// Pad rows to the widest row and give every empty cell a line break, so
/// the table stays rectangular and every cell can hold the caret.
pub fn normalize_table(table: &mut Table) {
    let columns = table.column_count();
    for row in table.rows.iter_mut() {
        while row.cells.len() < columns {
            let template = row.cells.last().map(|c| c.format.clone());
            row.cells.push(TableCell {
                format: template.unwrap_or_default(),
                ..TableCell::default()
            });
        }
        for cell in row.cells.iter_mut() {
            normalize_blocks(&mut cell.blocks);
            if cell.blocks.is_empty() && !cell.span_left && !cell.span_above
            {
                cell.add_segment(Segment::br(Format::new()));
            }
        }
    }
}
