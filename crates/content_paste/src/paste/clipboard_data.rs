// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeMap;

use crate::content_model::ContentDocument;

/// An image on the clipboard, already encoded as a data URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipboardImage {
    pub mime_type: String,
    pub data_uri: String,
}

/// Everything the host captured for one paste gesture.
///
/// The pipeline updates it in place: `raw_html` is cleaned, `html` receives
/// the fragment between the producer's fragment markers, and
/// `model_before_paste` holds the document as it was before the first paste
/// of the gesture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipboardData {
    /// MIME types present on the clipboard.
    pub types: Vec<String>,
    pub text: String,
    pub raw_html: Option<String>,
    pub html: Option<String>,
    pub image: Option<ClipboardImage>,
    pub custom_values: BTreeMap<String, String>,
    /// Tags of the top-level elements of the clipboard HTML body.
    pub html_first_level_child_tags: Vec<String>,
    pub model_before_paste: Option<ContentDocument>,
}

impl ClipboardData {
    pub fn from_text(text: &str) -> Self {
        Self {
            types: vec!["text/plain".to_owned()],
            text: text.to_owned(),
            ..Default::default()
        }
    }

    pub fn from_html(html: &str, text: &str) -> Self {
        Self {
            types: vec!["text/html".to_owned(), "text/plain".to_owned()],
            text: text.to_owned(),
            raw_html: Some(html.to_owned()),
            ..Default::default()
        }
    }

    pub fn from_image(mime_type: &str, data_uri: &str) -> Self {
        Self {
            types: vec![mime_type.to_owned()],
            image: Some(ClipboardImage {
                mime_type: mime_type.to_owned(),
                data_uri: data_uri.to_owned(),
            }),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, mime_type: &str, data_uri: &str) -> Self {
        self.types.push(mime_type.to_owned());
        self.image = Some(ClipboardImage {
            mime_type: mime_type.to_owned(),
            data_uri: data_uri.to_owned(),
        });
        self
    }

    pub fn with_custom_value(mut self, key: &str, value: &str) -> Self {
        self.types.push(key.to_owned());
        self.custom_values.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn image_data_uri(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.data_uri.as_str())
    }
}
