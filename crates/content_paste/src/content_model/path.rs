// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{Block, Segment};

/// One step into a table: the table's index in its block list, then the
/// row and column of the cell whose blocks are entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellPosition {
    pub block_index: usize,
    pub row: usize,
    pub column: usize,
}

impl CellPosition {
    pub fn new(block_index: usize, row: usize, column: usize) -> Self {
        Self {
            block_index,
            row,
            column,
        }
    }
}

/// Follow `path` from the top-level block list down through table cells.
pub fn blocks_at<'a>(
    blocks: &'a Vec<Block>,
    path: &[CellPosition],
) -> Option<&'a Vec<Block>> {
    path.iter().try_fold(blocks, |blocks, step| {
        let table = blocks.get(step.block_index)?.as_table()?;
        let cell = table.rows.get(step.row)?.cells.get(step.column)?;
        Some(&cell.blocks)
    })
}

pub fn blocks_at_mut<'a>(
    blocks: &'a mut Vec<Block>,
    path: &[CellPosition],
) -> Option<&'a mut Vec<Block>> {
    path.iter().try_fold(blocks, |blocks, step| {
        let table = blocks.get_mut(step.block_index)?.as_table_mut()?;
        let cell = table.rows.get_mut(step.row)?.cells.get_mut(step.column)?;
        Some(&mut cell.blocks)
    })
}

/// Location of the first selection marker: the path to its block list, the
/// index of its paragraph and its index within the paragraph.
pub fn find_selection_marker(
    blocks: &[Block],
) -> Option<(Vec<CellPosition>, usize, usize)> {
    find_segment(blocks, &Segment::is_selection_marker)
}

/// Location of the first segment matching `predicate`, in document order.
pub fn find_segment(
    blocks: &[Block],
    predicate: &dyn Fn(&Segment) -> bool,
) -> Option<(Vec<CellPosition>, usize, usize)> {
    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Paragraph(paragraph) => {
                if let Some(segment) =
                    paragraph.segments.iter().position(predicate)
                {
                    return Some((Vec::new(), index, segment));
                }
            }
            Block::Table(table) => {
                for (r, row) in table.rows.iter().enumerate() {
                    for (c, cell) in row.cells.iter().enumerate() {
                        if let Some((mut path, p, s)) =
                            find_segment(&cell.blocks, predicate)
                        {
                            path.insert(0, CellPosition::new(index, r, c));
                            return Some((path, p, s));
                        }
                    }
                }
            }
            Block::Entity(_) => {}
        }
    }
    None
}
