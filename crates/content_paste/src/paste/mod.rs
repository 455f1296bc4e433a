// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Turning clipboard data into content of the editor.
//!
//! A paste runs these stages in order:
//! 1. comment markers are stripped from the style blocks of the raw HTML
//! 2. the paste type is resolved and the HTML around the fragment collected
//! 3. a node fragment is built from the image, the HTML or the plain text
//! 4. plugins may rewrite the fragment and the conversion options
//! 5. the fragment is sanitized, converted and merged at the caret

mod before_paste;
mod clean_html_comments;
mod clipboard_data;
mod html_info;
mod inline_css;
mod merge_paste;
mod paste_fragment;
mod paste_type;
mod sanitizer;
mod sanitizing_context;

pub use before_paste::{
    generate_before_paste_event, BeforePasteEvent, CustomizedMerge,
    PastePlugin,
};
pub use clean_html_comments::clean_html_comments;
pub use clipboard_data::{ClipboardData, ClipboardImage};
pub use html_info::{retrieve_html_info, HtmlFromClipboard};
pub use inline_css::apply_css_rules;
pub use merge_paste::merge_paste_content;
pub use paste_fragment::{create_paste_fragment, expand_tabs, text_to_fragment};
pub use paste_type::{PasteType, PasteTypeSelector};
pub use sanitizer::{
    sanitize_element, SanitizerTables, SanitizingOption, ValueSanitizer,
};
pub use sanitizing_context::create_dom_to_model_context_for_sanitizing;

use crate::dom::HtmlDocument;
use crate::editor::EditorHost;
use crate::error::PasteError;

/// Paste `clipboard_data` at the selection of `editor`.
///
/// The first paste of some clipboard data saves the content of the editor
/// in `clipboard_data.model_before_paste`. Pasting the same data again, e.g.
/// with another paste type, starts over from that saved content.
pub fn paste(
    editor: &mut dyn EditorHost,
    clipboard_data: &mut ClipboardData,
    paste_type: impl Into<PasteTypeSelector>,
) -> Result<(), PasteError> {
    let is_first_paste = clipboard_data.model_before_paste.is_none();
    if is_first_paste {
        clipboard_data.model_before_paste = Some(editor.content_model().clone());
    }

    clipboard_data.raw_html =
        clipboard_data.raw_html.as_deref().map(clean_html_comments);
    let document = clipboard_data
        .raw_html
        .as_deref()
        .filter(|html| !html.is_empty())
        .map(HtmlDocument::parse);
    if let Some(document) = &document {
        if !document.parse_errors().is_empty() {
            tracing::trace!(
                errors = ?document.parse_errors(),
                "clipboard html parsed with errors"
            );
        }
    }

    let paste_type = paste_type.into().resolve(document.as_ref(), clipboard_data);
    tracing::debug!(%paste_type, is_first_paste, "pasting");

    let html_info = retrieve_html_info(document.as_ref(), clipboard_data);
    let source = match clipboard_data.html.as_deref() {
        Some(html)
            if !html.is_empty()
                && Some(html) != clipboard_data.raw_html.as_deref() =>
        {
            Some(HtmlDocument::parse(html))
        }
        _ => document,
    };

    let fragment = create_paste_fragment(clipboard_data, paste_type, source);
    let mut event = generate_before_paste_event(
        editor.plugins(),
        clipboard_data,
        fragment,
        html_info,
        paste_type,
        SanitizingOption::default(),
    );
    apply_css_rules(&mut event.fragment, &event.global_css_rules);

    merge_paste_content(editor, event, is_first_paste)
}
