// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::InsertPoint;
use crate::content_model::path::blocks_at_mut;
use crate::content_model::{
    Block, CellPosition, Format, Segment, Table, TableCell, TableRow,
};
use crate::error::PasteError;

/// Paste `source` cell by cell into the table holding the insert point,
/// with its first cell replacing the cell of the insert point. Columns and
/// rows missing on the right and at the bottom are added, copying the
/// header flag and format of their neighbour to the left or above. The
/// marker moves to the end of the first pasted cell.
pub(super) fn merge_table(
    target: &mut Vec<Block>,
    insert: &mut InsertPoint,
    source: Table,
) -> Result<(), PasteError> {
    let Some((cell_position, table_path)) = insert.path.split_last() else {
        return Err(PasteError::InvalidInsertPath);
    };
    let CellPosition {
        block_index,
        row: row_index,
        column: column_index,
    } = *cell_position;
    let blocks =
        blocks_at_mut(target, table_path).ok_or(PasteError::InvalidInsertPath)?;
    let table = blocks
        .get_mut(block_index)
        .and_then(Block::as_table_mut)
        .ok_or(PasteError::NotATable(block_index))?;
    if table.rows.get(row_index).is_none() {
        return Err(PasteError::InvalidInsertPath);
    }

    let mut marker_paragraph = 0;
    for (i, row) in source.rows.into_iter().enumerate() {
        for (j, mut cell) in row.cells.into_iter().enumerate() {
            let r = row_index + i;
            let c = column_index + j;

            if i == 0 && c >= table.rows[0].cells.len() {
                for target_row in table.rows.iter_mut() {
                    let left = c.checked_sub(1).and_then(|l| target_row.cells.get(l));
                    let new_cell = cell_like(left);
                    place(&mut target_row.cells, c, new_cell);
                }
            }
            if j == 0 && r >= table.rows.len() {
                let above = &table.rows[table.rows.len() - 1];
                let cells = (0..table.rows[row_index].cells.len())
                    .map(|k| cell_like(above.cells.get(k)))
                    .collect();
                table.rows.push(TableRow {
                    cells,
                    format: Format::new(),
                });
            }

            if i == 0 && j == 0 {
                marker_paragraph = cell.add_segment(Segment::selection_marker(
                    insert.marker_format.clone(),
                ));
            }
            place(&mut table.rows[r].cells, c, cell);
        }
    }

    insert.paragraph_index = marker_paragraph;
    tracing::trace!(row_index, column_index, "merged pasted table");
    Ok(())
}

fn cell_like(neighbour: Option<&TableCell>) -> TableCell {
    TableCell::new(
        false,
        false,
        neighbour.is_some_and(|cell| cell.is_header),
        neighbour.map(|cell| cell.format.clone()).unwrap_or_default(),
    )
}

/// Put `cell` at `index`, padding the row with empty cells if it is short.
fn place(cells: &mut Vec<TableCell>, index: usize, cell: TableCell) {
    if cells.len() <= index {
        cells.resize_with(index + 1, TableCell::default);
    }
    cells[index] = cell;
}
