// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The content tree: the normalized document representation used both for
//! the live document and for pasted content.
//!
//! ```text
//! ContentDocument
//! └>Block (Paragraph | Table | Entity)
//!   ├>Paragraph
//!   │ └>Segment (Text | Br | SelectionMarker | Image | Entity)
//!   └>Table
//!     └>TableRow
//!       └>TableCell
//!         └>Block ...
//! ```

pub mod format;
pub mod normalize;
pub mod path;
pub mod to_tree;

pub use format::{Format, FormatCategory, FormatKey};
pub use path::CellPosition;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentDocument {
    pub blocks: Vec<Block>,
    pub format: Format,
}

impl ContentDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            format: Format::new(),
        }
    }

    /// The format of the selection: the selection marker, or else the first
    /// selected segment, reduced to its text properties.
    pub fn selected_segment_format(&self) -> Option<Format> {
        fn find(blocks: &[Block]) -> Option<&Segment> {
            blocks.iter().find_map(|block| match block {
                Block::Paragraph(p) => p
                    .segments
                    .iter()
                    .find(|s| s.is_selection_marker() || s.is_selected),
                Block::Table(t) => t
                    .rows
                    .iter()
                    .flat_map(|r| r.cells.iter())
                    .find_map(|c| find(&c.blocks)),
                Block::Entity(_) => None,
            })
        }

        find(&self.blocks).map(|segment| {
            segment.format.only(format::SEGMENT_FORMAT_KEYS)
        })
    }

    /// Number of selection markers anywhere in the tree.
    pub fn selection_marker_count(&self) -> usize {
        fn count(blocks: &[Block]) -> usize {
            blocks
                .iter()
                .map(|block| match block {
                    Block::Paragraph(p) => p
                        .segments
                        .iter()
                        .filter(|s| s.is_selection_marker())
                        .count(),
                    Block::Table(t) => t
                        .rows
                        .iter()
                        .flat_map(|r| r.cells.iter())
                        .map(|c| count(&c.blocks))
                        .sum(),
                    Block::Entity(_) => 0,
                })
                .sum()
        }
        count(&self.blocks)
    }

    /// Concatenated text of every text segment, one line per paragraph.
    pub fn plain_text(&self) -> String {
        fn collect(blocks: &[Block], lines: &mut Vec<String>) {
            for block in blocks {
                match block {
                    Block::Paragraph(p) => lines.push(p.plain_text()),
                    Block::Table(t) => {
                        for cell in t.rows.iter().flat_map(|r| r.cells.iter())
                        {
                            collect(&cell.blocks, lines);
                        }
                    }
                    Block::Entity(_) => {}
                }
            }
        }
        let mut lines = Vec::new();
        collect(&self.blocks, &mut lines);
        lines.join("\n")
    }

    /// Check the invariants a live document must satisfy.
    ///
    /// Panics if a check fails.
    pub fn explicitly_assert_invariants(&self) {
        let markers = self.selection_marker_count();
        assert!(
            markers <= 1,
            "a live document holds at most one selection marker, found {markers}"
        );
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Entity(Entity),
}

impl Block {
    pub fn format(&self) -> &Format {
        match self {
            Self::Paragraph(p) => &p.format,
            Self::Table(t) => &t.format,
            Self::Entity(e) => &e.format,
        }
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Self::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Self::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
    pub format: Format,
    /// Created for inline content that had no block element around it.
    pub is_implicit: bool,
}

impl Paragraph {
    pub fn new(format: Format) -> Self {
        Self {
            segments: Vec::new(),
            format,
            is_implicit: false,
        }
    }

    pub fn implicit(format: Format) -> Self {
        Self {
            segments: Vec::new(),
            format,
            is_implicit: true,
        }
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            format: Format::new(),
            is_implicit: false,
        }
    }

    pub fn selection_marker_index(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_selection_marker)
    }

    /// True when the paragraph holds exactly one line break and nothing else.
    pub fn is_single_line_break(&self) -> bool {
        matches!(self.segments.as_slice(), [s] if s.kind == SegmentKind::Br)
    }

    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match &segment.kind {
                SegmentKind::Text(text) => text.as_str(),
                SegmentKind::Br => "\n",
                _ => "",
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub format: Format,
    pub link: Option<Link>,
    /// Part of a range selection, deleted before pasted content is merged.
    pub is_selected: bool,
}

impl Segment {
    pub fn new(kind: SegmentKind, format: Format) -> Self {
        Self {
            kind,
            format,
            link: None,
            is_selected: false,
        }
    }

    pub fn text(text: impl Into<String>, format: Format) -> Self {
        Self::new(SegmentKind::Text(text.into()), format)
    }

    pub fn br(format: Format) -> Self {
        Self::new(SegmentKind::Br, format)
    }

    pub fn selection_marker(format: Format) -> Self {
        Self::new(SegmentKind::SelectionMarker, format)
    }

    pub fn image(image: Image, format: Format) -> Self {
        Self::new(SegmentKind::Image(image), format)
    }

    pub fn entity(entity: Entity, format: Format) -> Self {
        Self::new(SegmentKind::Entity(entity), format)
    }

    pub fn selected(mut self) -> Self {
        self.is_selected = true;
        self
    }

    pub fn is_selection_marker(&self) -> bool {
        self.kind == SegmentKind::SelectionMarker
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentKind {
    Text(String),
    Br,
    SelectionMarker,
    Image(Image),
    Entity(Entity),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub target: Option<String>,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
    pub title: Option<String>,
}

/// Opaque content kept as sanitized HTML, e.g. a widget from another editor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entity {
    pub entity_type: Option<String>,
    pub id: Option<String>,
    pub html: String,
    pub is_block: bool,
    pub format: Format,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub format: Format,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub format: Format,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableCell {
    pub blocks: Vec<Block>,
    pub format: Format,
    /// Covered by the cell to the left (colspan).
    pub span_left: bool,
    /// Covered by the cell above (rowspan).
    pub span_above: bool,
    pub is_header: bool,
}

impl TableCell {
    pub fn new(
        span_left: bool,
        span_above: bool,
        is_header: bool,
        format: Format,
    ) -> Self {
        Self {
            blocks: Vec::new(),
            format,
            span_left,
            span_above,
            is_header,
        }
    }

    /// Append a segment to the last paragraph, creating one if needed.
    /// Returns the index of the paragraph the segment went into.
    pub fn add_segment(&mut self, segment: Segment) -> usize {
        add_segment(&mut self.blocks, segment, &Format::new())
    }
}

/// Append a segment to the last block of `blocks` when that is a
/// paragraph, otherwise to a new implicit paragraph with `block_format`.
/// Returns the index of the paragraph the segment went into.
pub fn add_segment(
    blocks: &mut Vec<Block>,
    segment: Segment,
    block_format: &Format,
) -> usize {
    if let Some(Block::Paragraph(paragraph)) = blocks.last_mut() {
        paragraph.segments.push(segment);
    } else {
        let mut paragraph = Paragraph::implicit(block_format.clone());
        paragraph.segments.push(segment);
        blocks.push(Block::Paragraph(paragraph));
    }
    blocks.len() - 1
}
