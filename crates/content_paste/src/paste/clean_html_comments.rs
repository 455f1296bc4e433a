// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<style` followed by something that cannot continue a tag name.
static STYLE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<style\W").expect("valid regex"));
static STYLE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</style>").expect("valid regex"));

/// Comment markers removed from style blocks: both spellings of the
/// opening marker, then the closing one.
const COMMENT_MARKERS: [&str; 3] = ["<!--", "&lt;!--", "-->"];

/// Remove comment markers found inside `<style>` blocks.
///
/// Producers disagree on whether a stylesheet wrapped in `<!-- -->` is a
/// comment, so the markers are dropped and the rules between them are kept.
/// Text outside style blocks is untouched.
pub fn clean_html_comments(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = STYLE_OPEN.find(rest) {
        let Some(close) = STYLE_CLOSE.find_at(rest, open.end()) else {
            break;
        };
        result.push_str(&rest[..open.end()]);
        result.push_str(&strip_markers(&rest[open.end()..close.start()]));
        result.push_str(close.as_str());
        rest = &rest[close.end()..];
    }
    result.push_str(rest);
    result
}

fn strip_markers(style: &str) -> String {
    let mut style = style.to_owned();
    // Removing one marker can join the halves of another, e.g. `<!<!----`.
    while let Some(marker) = COMMENT_MARKERS.iter().find(|m| style.contains(**m))
    {
        style = style.replace(marker, "");
    }
    style
}
