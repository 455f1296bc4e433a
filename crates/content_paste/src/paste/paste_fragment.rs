// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use unicode_segmentation::UnicodeSegmentation;

use super::{ClipboardData, PasteType};
use crate::dom::{ElementData, Fragment, HtmlDocument};

const NBSP: char = '\u{a0}';
const ENSP: char = '\u{2002}';
const TAB_STOP: usize = 6;

/// Build the node fragment to convert for this paste.
///
/// - an image, when pasting as image, or when there is an image and no
///   text and the paste is not plain text
/// - the children of `source`'s body, unless pasting as plain text
/// - otherwise the plain text, one node per line (see [`text_to_fragment`])
///
/// A plain-text paste of clipboard data without text falls back to the
/// text content of `source`, and stores it in `clipboard_data.text`.
pub fn create_paste_fragment(
    clipboard_data: &mut ClipboardData,
    paste_type: PasteType,
    source: Option<HtmlDocument>,
) -> Fragment {
    let source = source.and_then(|dom| dom.body().map(|body| (dom, body)));

    if paste_type == PasteType::AsPlainText && clipboard_data.text.is_empty() {
        if let Some((dom, body)) = &source {
            clipboard_data.text = dom.text_content(*body);
        }
    }

    let image = clipboard_data.image_data_uri().filter(|_| {
        paste_type == PasteType::AsImage
            || (paste_type != PasteType::AsPlainText
                && clipboard_data.text.is_empty())
    });

    if let Some(data_uri) = image {
        tracing::debug!("building image paste fragment");
        let mut fragment = Fragment::new();
        let image = fragment.dom.create_element(
            ElementData::new("img")
                .with_attr("src", data_uri)
                .with_attr("style", "max-width:100%"),
        );
        fragment.dom.append_child(fragment.root, image);
        return fragment;
    }

    match source {
        Some((mut dom, body)) if paste_type != PasteType::AsPlainText => {
            tracing::debug!("building html paste fragment");
            let root = dom.create_fragment();
            dom.move_children(body, root);
            Fragment { dom, root }
        }
        _ => {
            tracing::debug!("building plain text paste fragment");
            text_to_fragment(&clipboard_data.text)
        }
    }
}

/// Rebuild line structure from plain text:
/// - one line: a text node
/// - two lines: text, `<br>`, text
/// - more: the first and last lines as text nodes and every line in between
///   wrapped in its own `<div>` (holding a `<br>` when the line is empty)
pub fn text_to_fragment(text: &str) -> Fragment {
    let mut fragment = Fragment::new();
    let lines: Vec<&str> = text.split('\n').collect();
    let count = lines.len();

    for (index, line) in lines.iter().enumerate() {
        let line = normalize_line(line);
        let dom = &mut fragment.dom;
        let root = fragment.root;

        if count == 2 && index == 0 {
            let text = dom.create_text(&line);
            dom.append_child(root, text);
            let br = dom.create_element(ElementData::new("br"));
            dom.append_child(root, br);
        } else if index > 0 && index + 1 < count {
            let div = dom.create_element(ElementData::new("div"));
            let child = if line.is_empty() {
                dom.create_element(ElementData::new("br"))
            } else {
                dom.create_text(&line)
            };
            dom.append_child(div, child);
            dom.append_child(root, div);
        } else {
            let text = dom.create_text(&line);
            dom.append_child(root, text);
        }
    }
    fragment
}

/// Apply the space rules to one line: `\r` is dropped, a space at either
/// end becomes a non-breaking space, double spaces become space plus
/// non-breaking space, and tabs are expanded.
fn normalize_line(line: &str) -> String {
    let mut line = line.replace('\r', "");
    if line.starts_with(' ') {
        line.replace_range(..1, &NBSP.to_string());
    }
    if line.ends_with(' ') {
        line.replace_range(line.len() - 1.., &NBSP.to_string());
    }
    let line = line.replace("  ", &format!(" {NBSP}"));
    if line.contains('\t') {
        expand_tabs(&line)
    } else {
        line
    }
}

/// Replace each tab at column `c` with `6 - (c mod 6)` en spaces, so text
/// after it starts on the next tab stop. Columns count grapheme clusters.
pub fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for grapheme in line.graphemes(true) {
        if grapheme == "\t" {
            let width = TAB_STOP - column % TAB_STOP;
            out.extend(std::iter::repeat(ENSP).take(width));
            column += width;
        } else {
            out.push_str(grapheme);
            column += 1;
        }
    }
    out
}
