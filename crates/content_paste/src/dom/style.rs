// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

/// The declarations of a `style` attribute, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    /// Parse `name: value; ...` text. Semicolons inside quotes or
    /// parentheses (e.g. `url(data:...;base64,...)`) do not end a
    /// declaration. Property names are lower-cased, `!important` is dropped.
    pub fn parse(css_text: &str) -> Self {
        let declarations = split_outside_quotes(css_text, ';')
            .into_iter()
            .filter_map(|declaration| {
                let (name, value) = declaration.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                let value = value
                    .strip_suffix("!important")
                    .map(str::trim_end)
                    .unwrap_or(value);
                if name.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((name, value.to_owned()))
                }
            })
            .collect();
        Self { declarations }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Value of a property; the last declaration wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.declarations.push((name.to_owned(), value.to_owned()));
    }

    pub fn remove(&mut self, name: &str) {
        self.declarations.retain(|(n, _)| n != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn to_css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(n, v)| format!("{n}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Split `text` on `separator`, ignoring separators inside quotes or
/// parentheses.
fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_keeps_semicolons_inside_urls() {
        let style = InlineStyle::parse(
            "background: url(data:image/png;base64,AAA); COLOR : red",
        );

        assert_eq!(
            style.get("background"),
            Some("url(data:image/png;base64,AAA)")
        );
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn last_declaration_wins() {
        let style = InlineStyle::parse("color: red; color: blue !important");

        assert_eq!(style.get("color"), Some("blue"));
    }

    #[test]
    fn set_replaces_and_serializes() {
        let mut style = InlineStyle::parse("color: red; font-size: 10pt;");
        style.set("color", "green");

        assert_eq!(style.to_css_text(), "font-size: 10pt; color: green");
    }
}
