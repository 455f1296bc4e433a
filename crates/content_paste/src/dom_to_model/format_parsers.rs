// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::HashMap;
use std::rc::Rc;

use strum::IntoEnumIterator;

use super::{DomToModelContext, FormatParser, StyledElement};
use crate::content_model::{Format, FormatKey};

/// One parser per format key. Most copy the CSS property of the same name;
/// a few need to combine or convert values.
pub fn default_format_parsers() -> HashMap<FormatKey, FormatParser> {
    FormatKey::iter().map(|key| (key, parser_for(key))).collect()
}

fn parser_for(key: FormatKey) -> FormatParser {
    use FormatKey::*;
    match key {
        FontSize => Rc::new(font_size_parser),
        TextDecoration => Rc::new(text_decoration_parser),
        MarginTop | MarginRight | MarginBottom | MarginLeft => Rc::new(
            move |format: &mut Format,
                  styled: &StyledElement<'_>,
                  _: &DomToModelContext| {
                box_side(format, styled, key, "margin")
            },
        ),
        PaddingTop | PaddingRight | PaddingBottom | PaddingLeft => Rc::new(
            move |format: &mut Format,
                  styled: &StyledElement<'_>,
                  _: &DomToModelContext| {
                box_side(format, styled, key, "padding")
            },
        ),
        _ => Rc::new(
            move |format: &mut Format,
                  styled: &StyledElement<'_>,
                  _: &DomToModelContext| {
                if let Some(value) = styled.value(key.as_ref()) {
                    format.set(key, value);
                }
            },
        ),
    }
}

/// `rem` lengths are resolved against the root font size.
fn font_size_parser(
    format: &mut Format,
    styled: &StyledElement<'_>,
    context: &DomToModelContext,
) {
    let Some(size) = styled.value("font-size") else {
        return;
    };
    let resolved = size
        .strip_suffix("rem")
        .and_then(|n| n.trim().parse::<f64>().ok())
        .map(|rem| format!("{}px", rem * context.root_font_size));
    format.set(FormatKey::FontSize, resolved.as_deref().unwrap_or(size));
}

/// Decorations add up: `<u><s>x</s></u>` is both underlined and struck.
/// `none` clears what was inherited.
fn text_decoration_parser(
    format: &mut Format,
    styled: &StyledElement<'_>,
    _context: &DomToModelContext,
) {
    let Some(value) = styled
        .value("text-decoration")
        .or_else(|| styled.value("text-decoration-line"))
    else {
        return;
    };
    if value.trim() == "none" {
        format.set(FormatKey::TextDecoration, "");
        return;
    }
    let mut tokens: Vec<&str> = format
        .get(FormatKey::TextDecoration)
        .unwrap_or("")
        .split_whitespace()
        .collect();
    for token in value.split_whitespace() {
        if matches!(token, "underline" | "line-through" | "overline")
            && !tokens.contains(&token)
        {
            tokens.push(token);
        }
    }
    let joined = tokens.join(" ");
    format.set(FormatKey::TextDecoration, joined);
}

/// Read `margin-top` and friends, falling back to the shorthand.
fn box_side(
    format: &mut Format,
    styled: &StyledElement<'_>,
    key: FormatKey,
    shorthand: &str,
) {
    if let Some(value) = styled.value(key.as_ref()) {
        format.set(key, value);
        return;
    }
    let Some(value) = styled.value(shorthand) else {
        return;
    };
    let parts: Vec<&str> = value.split_whitespace().collect();
    let (top, right, bottom, left) = match parts.as_slice() {
        [all] => (*all, *all, *all, *all),
        [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
        [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
        [top, right, bottom, left] => (*top, *right, *bottom, *left),
        _ => return,
    };
    let side = match key {
        FormatKey::MarginTop | FormatKey::PaddingTop => top,
        FormatKey::MarginRight | FormatKey::PaddingRight => right,
        FormatKey::MarginBottom | FormatKey::PaddingBottom => bottom,
        _ => left,
    };
    format.set(key, side);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::ElementData;

    fn parse(key: FormatKey, element: &ElementData, format: &mut Format) {
        let context = DomToModelContext::new(Format::new(), 10.0);
        let styled = StyledElement::new(element);
        parser_for(key)(format, &styled, &context);
    }

    #[test]
    fn rem_font_size_resolves_against_the_root() {
        let element =
            ElementData::new("span").with_attr("style", "font-size: 1.5rem");
        let mut format = Format::new();

        parse(FormatKey::FontSize, &element, &mut format);

        assert_eq!(format.get(FormatKey::FontSize), Some("15px"));
    }

    #[test]
    fn text_decoration_none_clears_inherited_value() {
        let element = ElementData::new("span")
            .with_attr("style", "text-decoration: none");
        let mut format =
            Format::new().with(FormatKey::TextDecoration, "underline");

        parse(FormatKey::TextDecoration, &element, &mut format);

        assert_eq!(format.get(FormatKey::TextDecoration), Some(""));
    }

    #[test]
    fn margin_shorthand_is_expanded() {
        let element =
            ElementData::new("p").with_attr("style", "margin: 1px 2px 3px");
        let mut format = Format::new();

        parse(FormatKey::MarginLeft, &element, &mut format);
        parse(FormatKey::MarginBottom, &element, &mut format);

        assert_eq!(format.get(FormatKey::MarginLeft), Some("2px"));
        assert_eq!(format.get(FormatKey::MarginBottom), Some("3px"));
    }
}
