// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Flat, additive formats carried by every node of the content tree.
//!
//! A [`Format`] maps CSS-like property names ([`FormatKey`]) to string
//! values. Nodes only store the values resolved locally, so rendering a
//! segment means layering its format over the paragraph's and the
//! document's. An empty string value is meaningful: it explicitly resets a
//! property to neutral when layered over another format.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A single format property. The string form is the CSS property name.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum FormatKey {
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
    TextDecoration,
    Color,
    BackgroundColor,
    LetterSpacing,
    LineHeight,
    VerticalAlign,
    TextAlign,
    Direction,
    WhiteSpace,
    TextIndent,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    Width,
    Height,
    MaxWidth,
    Border,
    BorderCollapse,
    Display,
}

/// Which group of format parsers runs for a given kind of node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatCategory {
    /// Text-level formatting of inline elements.
    Segment,
    /// Text-level formatting inherited from a block element.
    SegmentOnBlock,
    /// Paragraph-level formatting.
    Block,
    /// Size of block containers such as `div` and `p`.
    Container,
    Table,
    TableCell,
    Image,
    Entity,
    /// Only used to decide whether an element renders as a block.
    Display,
}

impl FormatCategory {
    pub fn keys(self) -> &'static [FormatKey] {
        use FormatKey::*;
        match self {
            Self::Segment => SEGMENT_FORMAT_KEYS,
            Self::SegmentOnBlock => &[
                FontFamily,
                FontSize,
                FontWeight,
                FontStyle,
                TextDecoration,
                Color,
                LetterSpacing,
            ],
            Self::Block => &[
                TextAlign,
                Direction,
                LineHeight,
                WhiteSpace,
                TextIndent,
                BackgroundColor,
                MarginTop,
                MarginRight,
                MarginBottom,
                MarginLeft,
                PaddingTop,
                PaddingRight,
                PaddingBottom,
                PaddingLeft,
            ],
            Self::Container => &[Width, Height, MaxWidth],
            Self::Table => &[
                Width,
                Border,
                BorderCollapse,
                BackgroundColor,
                MarginLeft,
                MarginRight,
            ],
            Self::TableCell => &[
                Width,
                Height,
                Border,
                BackgroundColor,
                VerticalAlign,
                TextAlign,
                PaddingTop,
                PaddingRight,
                PaddingBottom,
                PaddingLeft,
            ],
            Self::Image => &[Width, Height, MaxWidth],
            Self::Entity => &[Width, Height, Display],
            Self::Display => &[Display],
        }
    }
}

/// Properties that make up the text format of a segment.
pub const SEGMENT_FORMAT_KEYS: &[FormatKey] = &[
    FormatKey::FontFamily,
    FormatKey::FontSize,
    FormatKey::FontWeight,
    FormatKey::FontStyle,
    FormatKey::TextDecoration,
    FormatKey::Color,
    FormatKey::BackgroundColor,
    FormatKey::LetterSpacing,
    FormatKey::LineHeight,
    FormatKey::VerticalAlign,
];

/// Block properties that nested blocks and implicit paragraphs inherit.
pub const INHERITABLE_BLOCK_KEYS: &[FormatKey] = &[
    FormatKey::TextAlign,
    FormatKey::Direction,
    FormatKey::LineHeight,
    FormatKey::WhiteSpace,
];

static EMPTY_SEGMENT_FORMAT: Lazy<Format> = Lazy::new(|| {
    SEGMENT_FORMAT_KEYS
        .iter()
        .map(|key| (*key, String::new()))
        .collect()
});

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Format(BTreeMap<FormatKey, String>);

impl Format {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every segment property set to the empty (neutral) value.
    pub fn empty_segment_format() -> &'static Format {
        &EMPTY_SEGMENT_FORMAT
    }

    pub fn with(mut self, key: FormatKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: FormatKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: FormatKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn remove(&mut self, key: FormatKey) -> Option<String> {
        self.0.remove(&key)
    }

    pub fn contains(&self, key: FormatKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormatKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Layer `other` over `self`; values in `other` win.
    pub fn merged(&self, other: &Format) -> Format {
        let mut result = self.clone();
        result.extend(other);
        result
    }

    pub fn extend(&mut self, other: &Format) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// A copy holding only the given keys.
    pub fn only(&self, keys: &[FormatKey]) -> Format {
        self.iter()
            .filter(|(key, _)| keys.contains(key))
            .map(|(key, value)| (key, value.to_owned()))
            .collect()
    }

    /// Bold, italic and underline, the parts that survive a
    /// keep-source-emphasis merge.
    pub fn semantic_format(&self) -> Format {
        let mut result = Format::new();
        if let Some(weight) = self.get(FormatKey::FontWeight) {
            if !weight.is_empty() && weight != "normal" && weight != "400" {
                result.set(FormatKey::FontWeight, weight);
            }
        }
        if self.get(FormatKey::FontStyle) == Some("italic") {
            result.set(FormatKey::FontStyle, "italic");
        }
        if self
            .get(FormatKey::TextDecoration)
            .is_some_and(|d| d.split_whitespace().any(|t| t == "underline"))
        {
            result.set(FormatKey::TextDecoration, "underline");
        }
        result
    }
}

impl FromIterator<(FormatKey, String)> for Format {
    fn from_iter<T: IntoIterator<Item = (FormatKey, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        write!(f, "{{{}}}", parts.join("; "))
    }
}
