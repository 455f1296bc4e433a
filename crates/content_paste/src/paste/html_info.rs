// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeMap;

use super::ClipboardData;
use crate::dom::{parse_css_rules, CssRule, HtmlDocument, NodeData};

pub const START_FRAGMENT: &str = "<!--StartFragment-->";
pub const END_FRAGMENT: &str = "<!--EndFragment-->";

/// What the clipboard HTML holds around the pasted fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HtmlFromClipboard {
    /// Raw HTML before the start-fragment marker.
    pub html_before: String,
    /// Raw HTML after the end-fragment marker.
    pub html_after: String,
    /// Rules of every `<style>` element of the document.
    pub global_css_rules: Vec<CssRule>,
    /// `<meta name=... content=...>` pairs, e.g. `Generator`.
    pub metadata: BTreeMap<String, String>,
    /// Attributes of the `<html>` element.
    pub html_attributes: BTreeMap<String, String>,
}

/// Collect the information around the fragment, and store the fragment
/// itself in `clipboard_data.html` along with the top-level tag list.
pub fn retrieve_html_info(
    document: Option<&HtmlDocument>,
    clipboard_data: &mut ClipboardData,
) -> HtmlFromClipboard {
    let Some(document) = document else {
        return HtmlFromClipboard::default();
    };

    let (html_before, html_after) = retrieve_html_strings(clipboard_data);
    clipboard_data.html_first_level_child_tags = top_level_tags(document);

    let info = HtmlFromClipboard {
        html_before,
        html_after,
        global_css_rules: global_css_rules(document),
        metadata: metadata(document),
        html_attributes: document
            .html_element()
            .map(|html| document.attributes(html))
            .unwrap_or_default(),
    };
    tracing::debug!(
        css_rules = info.global_css_rules.len(),
        metadata = info.metadata.len(),
        has_fragment_markers = !info.html_before.is_empty(),
        "retrieved clipboard html info"
    );
    info
}

/// Split the raw HTML at the fragment markers. Without a well-formed pair of
/// markers the whole raw HTML is the fragment.
fn retrieve_html_strings(clipboard_data: &mut ClipboardData) -> (String, String) {
    let raw_html = clipboard_data.raw_html.clone().unwrap_or_default();
    let start = raw_html.find(START_FRAGMENT);
    let end = raw_html.rfind(END_FRAGMENT);

    match (start, end) {
        (Some(start), Some(end)) if end >= start + START_FRAGMENT.len() => {
            clipboard_data.html =
                Some(raw_html[start + START_FRAGMENT.len()..end].to_owned());
            (
                raw_html[..start].to_owned(),
                raw_html[end + END_FRAGMENT.len()..].to_owned(),
            )
        }
        _ => {
            clipboard_data.html = Some(raw_html);
            (String::new(), String::new())
        }
    }
}

fn global_css_rules(document: &HtmlDocument) -> Vec<CssRule> {
    document
        .elements_by_tag(document.document(), "style")
        .into_iter()
        .flat_map(|style| {
            let text: String = document
                .children(style)
                .iter()
                .filter_map(|c| document.text(*c))
                .collect();
            parse_css_rules(&text)
        })
        .collect()
}

fn metadata(document: &HtmlDocument) -> BTreeMap<String, String> {
    document
        .elements_by_tag(document.document(), "meta")
        .into_iter()
        .filter_map(|meta| {
            let element = document.element(meta)?;
            let name = element.attr("name").or_else(|| element.attr("http-equiv"))?;
            let content = element.attr("content")?;
            Some((name.to_owned(), content.to_owned()))
        })
        .collect()
}

fn top_level_tags(document: &HtmlDocument) -> Vec<String> {
    let Some(body) = document.body() else {
        return Vec::new();
    };
    document
        .children(body)
        .iter()
        .filter_map(|child| match document.data(*child) {
            NodeData::Element(element) => Some(element.tag().to_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;

    const WORD_HTML: &str = indoc! {r#"
        <html xmlns:o="urn:schemas-microsoft-com:office:office" lang="en">
        <head><meta name="ProgId" content="Word.Document">
        <style><!-- .MsoNormal { font-size: 11pt } --></style></head>
        <body><p>skip</p><!--StartFragment--><p class="MsoNormal">x</p><!--EndFragment--></body>
        </html>
    "#};

    #[test]
    fn fragment_markers_split_the_raw_html() {
        let mut clipboard = ClipboardData::from_html(WORD_HTML, "x");
        let document = HtmlDocument::parse(WORD_HTML);

        let info = retrieve_html_info(Some(&document), &mut clipboard);

        assert_eq!(
            clipboard.html.as_deref(),
            Some(r#"<p class="MsoNormal">x</p>"#)
        );
        assert!(info.html_before.ends_with("<p>skip</p>"));
        assert!(info.html_after.starts_with("</body>"));
        assert_eq!(info.metadata.get("ProgId").map(String::as_str), Some("Word.Document"));
        assert_eq!(info.html_attributes.get("lang").map(String::as_str), Some("en"));
        assert_eq!(info.global_css_rules[0].selectors[0].classes, vec!["MsoNormal"]);
        assert_eq!(clipboard.html_first_level_child_tags, vec!["p", "p"]);
    }

    #[test]
    fn without_markers_the_whole_html_is_the_fragment() {
        let html = "<b>x</b>";
        let mut clipboard = ClipboardData::from_html(html, "x");
        let document = HtmlDocument::parse(html);

        let info = retrieve_html_info(Some(&document), &mut clipboard);

        assert_eq!(clipboard.html.as_deref(), Some(html));
        assert_eq!(info.html_before, "");
    }

    #[test]
    fn end_marker_before_start_marker_is_ignored() {
        let html = "<!--EndFragment-->a<!--StartFragment-->";
        let mut clipboard = ClipboardData::from_html(html, "a");
        let document = HtmlDocument::parse(html);

        retrieve_html_info(Some(&document), &mut clipboard);

        assert_eq!(clipboard.html.as_deref(), Some(html));
    }

    #[test]
    fn no_document_leaves_clipboard_untouched() {
        let mut clipboard = ClipboardData::from_text("a");

        let info = retrieve_html_info(None, &mut clipboard);

        assert_eq!(info, HtmlFromClipboard::default());
        assert_eq!(clipboard.html, None);
    }
}
