// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{
    Block, ContentDocument, Entity, Format, Segment, SegmentKind, Table,
};

/// Draw a content tree as text, one node per line, for debugging and tests:
///
/// ```text
///
/// ├>p
/// │ ├>"foo" {font-weight: bold}
/// │ └>|
/// └>table
///   └>tr
///     └>td
///       └>p
///         └>br
/// ```
pub trait ToTree {
    fn to_tree(&self) -> String;
}

struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }
}

impl ToTree for ContentDocument {
    fn to_tree(&self) -> String {
        let mut out = String::from("\n");
        render_children(&mut out, "", &blocks_to_nodes(&self.blocks));
        out
    }
}

impl ToTree for Block {
    fn to_tree(&self) -> String {
        let mut out = String::from("\n");
        render_children(&mut out, "", &[block_to_node(self)]);
        out
    }
}

fn render_children(out: &mut String, prefix: &str, children: &[TreeNode]) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        out.push_str(prefix);
        out.push_str(if last { "└>" } else { "├>" });
        out.push_str(&child.label);
        out.push('\n');
        let nested = format!("{prefix}{}", if last { "  " } else { "│ " });
        render_children(out, &nested, &child.children);
    }
}

fn with_format(label: &str, format: &Format) -> String {
    if format.is_empty() {
        label.to_owned()
    } else {
        format!("{label} {format}")
    }
}

fn blocks_to_nodes(blocks: &[Block]) -> Vec<TreeNode> {
    blocks.iter().map(block_to_node).collect()
}

fn block_to_node(block: &Block) -> TreeNode {
    match block {
        Block::Paragraph(paragraph) => TreeNode {
            label: with_format("p", &paragraph.format),
            children: paragraph.segments.iter().map(segment_to_node).collect(),
        },
        Block::Table(table) => table_to_node(table),
        Block::Entity(entity) => TreeNode::leaf(entity_label(entity)),
    }
}

fn table_to_node(table: &Table) -> TreeNode {
    let rows = table
        .rows
        .iter()
        .map(|row| TreeNode {
            label: with_format("tr", &row.format),
            children: row
                .cells
                .iter()
                .map(|cell| {
                    let mut label =
                        String::from(if cell.is_header { "th" } else { "td" });
                    if cell.span_left {
                        label.push_str(" (span-left)");
                    }
                    if cell.span_above {
                        label.push_str(" (span-above)");
                    }
                    TreeNode {
                        label: with_format(&label, &cell.format),
                        children: blocks_to_nodes(&cell.blocks),
                    }
                })
                .collect(),
        })
        .collect();
    TreeNode {
        label: with_format("table", &table.format),
        children: rows,
    }
}

fn entity_label(entity: &Entity) -> String {
    match &entity.entity_type {
        Some(entity_type) => format!("entity <{entity_type}>"),
        None => String::from("entity"),
    }
}

fn segment_to_node(segment: &Segment) -> TreeNode {
    let mut label = match &segment.kind {
        SegmentKind::Text(text) => format!("{text:?}"),
        SegmentKind::Br => String::from("br"),
        SegmentKind::SelectionMarker => String::from("|"),
        SegmentKind::Image(image) => format!("img {:?}", image.src),
        SegmentKind::Entity(entity) => entity_label(entity),
    };
    if let Some(link) = &segment.link {
        label = format!("{label} [{}]", link.href);
    }
    label = with_format(&label, &segment.format);
    if segment.is_selected {
        label.push_str(" (selected)");
    }
    TreeNode::leaf(label)
}
