// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::{ElementData, InlineStyle, BLOCK_TAGS};

/// The style an element has before its inline style applies: what its tag
/// implies in a browser's default stylesheet, plus legacy presentational
/// attributes such as `align` or `bgcolor`.
pub fn default_style(element: &ElementData) -> InlineStyle {
    let mut style = InlineStyle::default();
    let tag = element.tag();

    if BLOCK_TAGS.contains(&tag) {
        style.set("display", "block");
    }
    for (name, value) in tag_style(tag) {
        style.set(name, value);
    }
    if tag == "font" {
        font_attributes(element, &mut style);
    }
    presentational_attributes(element, &mut style);
    style
}

fn tag_style(tag: &str) -> &'static [(&'static str, &'static str)] {
    match tag {
        "b" | "strong" => &[("font-weight", "bold")],
        "i" | "em" | "cite" | "dfn" | "var" | "address" => {
            &[("font-style", "italic")]
        }
        "u" | "ins" => &[("text-decoration", "underline")],
        "s" | "strike" | "del" => &[("text-decoration", "line-through")],
        "sub" => &[("vertical-align", "sub"), ("font-size", "smaller")],
        "sup" => &[("vertical-align", "super"), ("font-size", "smaller")],
        "code" | "kbd" | "samp" | "tt" => &[("font-family", "monospace")],
        "pre" | "xmp" => &[("white-space", "pre"), ("font-family", "monospace")],
        "mark" => &[("background-color", "yellow")],
        "small" => &[("font-size", "smaller")],
        "big" => &[("font-size", "larger")],
        "center" => &[("text-align", "center")],
        "blockquote" => &[("margin-left", "40px"), ("margin-right", "40px")],
        "h1" => &[("font-weight", "bold"), ("font-size", "2em")],
        "h2" => &[("font-weight", "bold"), ("font-size", "1.5em")],
        "h3" => &[("font-weight", "bold"), ("font-size", "1.17em")],
        "h4" => &[("font-weight", "bold")],
        "h5" => &[("font-weight", "bold"), ("font-size", "0.83em")],
        "h6" => &[("font-weight", "bold"), ("font-size", "0.67em")],
        "li" => &[("display", "list-item")],
        "table" => &[("display", "table")],
        "td" => &[("display", "table-cell")],
        "th" => &[("display", "table-cell"), ("font-weight", "bold")],
        _ => &[],
    }
}

/// `<font face size color>`. Sizes 1 to 7 map to the browser defaults.
fn font_attributes(element: &ElementData, style: &mut InlineStyle) {
    if let Some(face) = element.attr("face") {
        style.set("font-family", face);
    }
    if let Some(color) = element.attr("color") {
        style.set("color", color);
    }
    let size = element.attr("size").and_then(|size| match size.trim() {
        "1" => Some("10px"),
        "2" => Some("13px"),
        "3" => Some("16px"),
        "4" => Some("18px"),
        "5" => Some("24px"),
        "6" => Some("32px"),
        "7" => Some("48px"),
        _ => None,
    });
    if let Some(size) = size {
        style.set("font-size", size);
    }
}

fn presentational_attributes(element: &ElementData, style: &mut InlineStyle) {
    // On tables and images `align` positions the element itself.
    if let Some(align) = element.attr("align") {
        if !matches!(element.tag(), "table" | "img") {
            style.set("text-align", align);
        }
    }
    if let Some(color) = element.attr("bgcolor") {
        style.set("background-color", color);
    }
    if let Some(valign) = element.attr("valign") {
        style.set("vertical-align", valign);
    }
    if let Some(dir) = element.attr("dir") {
        style.set("direction", dir);
    }
    for name in ["width", "height"] {
        if let Some(value) = element.attr(name) {
            style.set(name, &with_unit(value));
        }
    }
    if element.tag() == "table" {
        if let Some(border) = element.attr("border") {
            if border.trim() != "0" {
                style.set("border", &format!("{} solid", with_unit(border)));
            }
        }
    }
}

/// Bare numbers in attributes are pixel lengths.
fn with_unit(value: &str) -> String {
    let value = value.trim();
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        format!("{value}px")
    } else {
        value.to_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn headings_are_bold_blocks() {
        let style = default_style(&ElementData::new("h2"));

        assert_eq!(style.get("display"), Some("block"));
        assert_eq!(style.get("font-weight"), Some("bold"));
    }

    #[test]
    fn font_attributes_become_styles() {
        let element = ElementData::new("font")
            .with_attr("face", "Arial")
            .with_attr("size", "5");

        let style = default_style(&element);

        assert_eq!(style.get("font-family"), Some("Arial"));
        assert_eq!(style.get("font-size"), Some("24px"));
    }

    #[test]
    fn numeric_sizes_get_pixel_units() {
        let element = ElementData::new("td")
            .with_attr("width", "120")
            .with_attr("bgcolor", "#eee");

        let style = default_style(&element);

        assert_eq!(style.get("width"), Some("120px"));
        assert_eq!(style.get("background-color"), Some("#eee"));
    }
}
