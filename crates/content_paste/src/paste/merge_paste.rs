// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::before_paste::BeforePasteEvent;
use super::sanitizing_context::create_dom_to_model_context_for_sanitizing;
use super::PasteType;
use crate::content_model::path::blocks_at;
use crate::content_model::{Block, ContentDocument, Format};
use crate::dom_to_model::dom_to_content_model;
use crate::editor::{
    ChangeSource, EditorHost, FormatContentModelContext,
    FormatContentModelOptions,
};
use crate::error::PasteError;
use crate::model_merge::{
    merge_model, InsertPoint, MergeFormat, MergeModelOption,
};

/// Convert the event's fragment and merge it into the editor content, as
/// one logical edit.
///
/// A repeated paste of the same clipboard data (not `is_first_paste`) first
/// restores the content saved before the first one, so it replaces the
/// earlier result instead of adding to it.
pub fn merge_paste_content(
    editor: &mut dyn EditorHost,
    event: BeforePasteEvent<'_>,
    is_first_paste: bool,
) -> Result<(), PasteError> {
    let tables = editor.sanitizer_tables();
    let root_font_size = editor.root_font_size();
    let BeforePasteEvent {
        clipboard_data,
        fragment,
        paste_type,
        dom_to_model_option,
        customized_merge,
        ..
    } = event;

    let mut merge = |model: &mut ContentDocument,
                     context: &mut FormatContentModelContext|
     -> Result<bool, PasteError> {
        if !is_first_paste {
            if let Some(snapshot) = &clipboard_data.model_before_paste {
                tracing::debug!("restoring content from before the first paste");
                model.blocks = snapshot.blocks.clone();
            }
        }

        let segment_format = model.selected_segment_format().unwrap_or_default();
        let mut dom_context = create_dom_to_model_context_for_sanitizing(
            &tables,
            &dom_to_model_option,
            segment_format,
            root_font_size,
        );
        let mut pasted =
            dom_to_content_model(&fragment.dom, fragment.root, &mut dom_context);

        if matches!(
            pasted.blocks.as_slice(),
            [Block::Table(_), Block::Paragraph(p)] if p.is_single_line_break()
        ) {
            pasted.blocks.pop();
        }
        let merge_table = matches!(pasted.blocks.as_slice(), [Block::Table(_)]);
        let merge_format = if paste_type == PasteType::MergeFormat {
            MergeFormat::KeepSourceEmphasisFormat
        } else {
            MergeFormat::None
        };
        tracing::debug!(
            blocks = pasted.blocks.len(),
            merge_table,
            %merge_format,
            customized = customized_merge.is_some(),
            "merging pasted content"
        );

        let insert_point = match &customized_merge {
            Some(customized_merge) => {
                let insert_point = customized_merge(model, pasted)?;
                if let Some(insert_point) = &insert_point {
                    check_insert_point(model, insert_point)?;
                }
                insert_point
            }
            None => merge_model(
                model,
                pasted,
                &MergeModelOption {
                    merge_format,
                    merge_table,
                },
            )?,
        };

        if let Some(insert_point) = insert_point {
            context.new_pending_format = Some(
                Format::empty_segment_format()
                    .merged(&model.format)
                    .merged(&insert_point.marker_format),
            );
        }
        Ok(true)
    };

    editor.format_content_model(
        &mut merge,
        FormatContentModelOptions {
            change_source: ChangeSource::Paste,
            api_name: "paste".to_owned(),
            change_data: Some(clipboard_data.clone()),
        },
    )
}

/// An insert point must lead to a paragraph holding the selection marker.
fn check_insert_point(
    model: &ContentDocument,
    insert_point: &InsertPoint,
) -> Result<(), PasteError> {
    let blocks = blocks_at(&model.blocks, &insert_point.path)
        .ok_or(PasteError::InvalidInsertPath)?;
    let index = insert_point.paragraph_index;
    blocks
        .get(index)
        .and_then(Block::as_paragraph)
        .ok_or(PasteError::NotAParagraph(index))?
        .selection_marker_index()
        .map(|_| ())
        .ok_or(PasteError::MissingSelectionMarker)
}
