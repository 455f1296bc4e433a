// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::{HtmlDocument, NodeId};

/// A selection as reported by the host: where it started and where it ends.
/// Offsets count child nodes of their container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomSelection {
    pub anchor_node: NodeId,
    pub anchor_offset: usize,
    pub focus_node: NodeId,
    pub focus_offset: usize,
}

/// A range in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomRange {
    pub start_container: NodeId,
    pub start_offset: usize,
    pub end_container: NodeId,
    pub end_offset: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionLike {
    Selection(DomSelection),
    Range(DomRange),
}

impl SelectionLike {
    /// `(anchor container, anchor offset, focus container, focus offset)`
    fn endpoints(&self) -> (NodeId, usize, NodeId, usize) {
        match *self {
            Self::Selection(s) => {
                (s.anchor_node, s.anchor_offset, s.focus_node, s.focus_offset)
            }
            Self::Range(r) => {
                (r.start_container, r.start_offset, r.end_container, r.end_offset)
            }
        }
    }
}

impl From<DomSelection> for SelectionLike {
    fn from(selection: DomSelection) -> Self {
        Self::Selection(selection)
    }
}

impl From<DomRange> for SelectionLike {
    fn from(range: DomRange) -> Self {
        Self::Range(range)
    }
}

/// The image element selected on its own: both ends in the same container,
/// exactly one child between them, and that child an `<img>`.
pub fn is_single_image_in_selection(
    dom: &HtmlDocument,
    selection: impl Into<SelectionLike>,
) -> Option<NodeId> {
    let (anchor, anchor_offset, focus, focus_offset) =
        selection.into().endpoints();
    if anchor != focus || anchor_offset.abs_diff(focus_offset) != 1 {
        return None;
    }
    let child = *dom.children(anchor).get(anchor_offset.min(focus_offset))?;
    (dom.tag(child) == Some("img")).then_some(child)
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;

    fn paragraph(html: &str) -> (HtmlDocument, NodeId) {
        let dom = HtmlDocument::parse(html);
        let body = dom.body().unwrap();
        let p = dom.children(body)[0];
        (dom, p)
    }

    fn selection(node: NodeId, anchor: usize, focus: usize) -> DomSelection {
        DomSelection {
            anchor_node: node,
            anchor_offset: anchor,
            focus_node: node,
            focus_offset: focus,
        }
    }

    fn range(node: NodeId, start: usize, end: usize) -> DomRange {
        DomRange {
            start_container: node,
            start_offset: start,
            end_container: node,
            end_offset: end,
        }
    }

    #[test]
    fn one_selected_image_is_found() {
        let (dom, p) = paragraph(r#"<p>a<img src="x.png">b</p>"#);
        let img = dom.children(p)[1];

        assert_that!(is_single_image_in_selection(&dom, range(p, 1, 2)))
            .is_equal_to(Some(img));
        assert_that!(is_single_image_in_selection(&dom, selection(p, 2, 1)))
            .is_equal_to(Some(img));
    }

    #[test]
    fn collapsed_or_wider_selections_are_not_images() {
        let (dom, p) = paragraph(r#"<p>a<img src="x.png">b</p>"#);

        assert_that!(is_single_image_in_selection(&dom, range(p, 1, 1))).is_none();
        assert_that!(is_single_image_in_selection(&dom, selection(p, 1, 1))).is_none();
        assert_that!(is_single_image_in_selection(&dom, range(p, 0, 2))).is_none();
        assert_that!(is_single_image_in_selection(&dom, selection(p, 3, 1))).is_none();
    }

    #[test]
    fn a_single_non_image_is_not_an_image() {
        let (dom, p) = paragraph(r#"<p>a<img src="x.png"><b>b</b></p>"#);

        assert_that!(is_single_image_in_selection(&dom, range(p, 0, 1))).is_none();
        assert_that!(is_single_image_in_selection(&dom, selection(p, 3, 2))).is_none();
    }

    #[test]
    fn endpoints_in_different_containers_are_not_an_image() {
        let (dom, p) = paragraph(r#"<p>a<img src="x.png">b</p>"#);
        let text = dom.children(p)[0];
        let mut selection = selection(p, 1, 2);
        selection.anchor_node = text;

        assert_that!(is_single_image_in_selection(&dom, selection)).is_none();
    }

    #[test]
    fn offsets_past_the_children_are_not_an_image() {
        let (dom, p) = paragraph(r#"<p>a</p>"#);

        assert_that!(is_single_image_in_selection(&dom, range(p, 4, 5))).is_none();
    }
}
