// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use strum_macros::{AsRefStr, Display, EnumString};

use super::ClipboardData;
use crate::dom::HtmlDocument;

/// How much of the clipboard's structure and formatting is kept.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "camelCase")]
pub enum PasteType {
    /// Keep structure and formatting.
    #[default]
    Normal,
    /// Only the plain text, split into lines.
    AsPlainText,
    /// Only the image payload.
    AsImage,
    /// Keep structure, take formatting from the destination except for
    /// bold, italic and underline.
    MergeFormat,
}

type PasteTypeCallback = dyn Fn(Option<&HtmlDocument>, &ClipboardData) -> PasteType;

/// Either a fixed paste type or a function choosing one from the parsed
/// clipboard HTML.
pub enum PasteTypeSelector {
    Fixed(PasteType),
    Dynamic(Box<PasteTypeCallback>),
}

impl PasteTypeSelector {
    pub fn dynamic(
        f: impl Fn(Option<&HtmlDocument>, &ClipboardData) -> PasteType + 'static,
    ) -> Self {
        Self::Dynamic(Box::new(f))
    }

    pub fn resolve(
        &self,
        document: Option<&HtmlDocument>,
        clipboard_data: &ClipboardData,
    ) -> PasteType {
        match self {
            Self::Fixed(paste_type) => *paste_type,
            Self::Dynamic(choose) => choose(document, clipboard_data),
        }
    }
}

impl From<PasteType> for PasteTypeSelector {
    fn from(paste_type: PasteType) -> Self {
        Self::Fixed(paste_type)
    }
}
