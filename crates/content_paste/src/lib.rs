// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Pasting clipboard content into a rich text content model.
//!
//! Clipboard HTML is untrusted: it is parsed into a small arena DOM,
//! sanitized while it is converted into a [`ContentDocument`], and merged at
//! the selection of an [`EditorHost`].

pub mod content_model;
pub mod dom;
pub mod dom_to_model;
pub mod editor;
pub mod error;
pub mod model_merge;
pub mod paste;
pub mod selection;

pub use crate::content_model::{
    Block, ContentDocument, Format, FormatKey, Paragraph, Segment, Table,
};
pub use crate::dom::{Fragment, HtmlDocument, NodeId};
pub use crate::editor::{
    ChangeSource, Editor, EditorHost, EditorOptions, HistoryEntry,
};
pub use crate::error::PasteError;
pub use crate::model_merge::{InsertPoint, MergeFormat, MergeModelOption};
pub use crate::paste::{
    paste, BeforePasteEvent, ClipboardData, PastePlugin, PasteType,
    PasteTypeSelector, SanitizerTables, SanitizingOption,
};
pub use crate::selection::{
    is_single_image_in_selection, DomRange, DomSelection, SelectionLike,
};
