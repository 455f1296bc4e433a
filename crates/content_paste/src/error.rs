// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use thiserror::Error;

/// Errors raised while merging pasted content into the live document.
///
/// Malformed clipboard input and sanitizer rejections are never errors:
/// they degrade to less content being pasted. What remains are broken
/// contracts, e.g. a customized merge that leaves an insert point which no
/// longer resolves in the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PasteError {
    /// The cell path of an insert point does not lead to a block list.
    #[error("insert point path no longer resolves to a block list")]
    InvalidInsertPath,

    /// The block addressed by an insert point is not a paragraph.
    #[error("block {0} at the insert point is not a paragraph")]
    NotAParagraph(usize),

    /// The paragraph addressed by an insert point lost its selection marker.
    #[error("paragraph at the insert point has no selection marker")]
    MissingSelectionMarker,

    /// The table context of an insert point is not a table.
    #[error("block {0} containing the insert point is not a table")]
    NotATable(usize),
}
