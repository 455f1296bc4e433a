// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The editor services a paste needs, and a small in-process editor
//! providing them.

use std::rc::Rc;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::content_model::{ContentDocument, Format};
use crate::error::PasteError;
use crate::paste::{
    paste, ClipboardData, PastePlugin, PasteType, PasteTypeSelector,
    SanitizerTables,
};

/// What caused a change of the content, recorded with each history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ChangeSource {
    Paste,
    SetContent,
}

#[derive(Clone, Debug)]
pub struct FormatContentModelOptions {
    pub change_source: ChangeSource,
    pub api_name: String,
    /// For a paste, the clipboard data that was pasted.
    pub change_data: Option<ClipboardData>,
}

/// Filled in by a formatting callback.
#[derive(Clone, Debug, Default)]
pub struct FormatContentModelContext {
    /// Format that the next typed characters get.
    pub new_pending_format: Option<Format>,
}

/// Edits the content in place. Returns whether anything changed.
pub type FormatCallback<'a> = dyn FnMut(&mut ContentDocument, &mut FormatContentModelContext) -> Result<bool, PasteError>
    + 'a;

/// The editor a paste runs against.
pub trait EditorHost {
    fn content_model(&self) -> &ContentDocument;

    /// Run `callback` on the live content as one logical edit.
    fn format_content_model(
        &mut self,
        callback: &mut FormatCallback<'_>,
        options: FormatContentModelOptions,
    ) -> Result<(), PasteError>;

    /// Paste plugins, in registration order.
    fn plugins(&self) -> &[Box<dyn PastePlugin>];

    fn sanitizer_tables(&self) -> Rc<SanitizerTables>;

    /// Size in px of the root font, for `rem` lengths.
    fn root_font_size(&self) -> f64;

    fn set_pending_format(&mut self, format: Format);
}

#[derive(Clone, Debug)]
pub struct EditorOptions {
    /// Used by [`Editor::paste`].
    pub default_paste_type: PasteType,
    pub sanitizer_tables: Rc<SanitizerTables>,
    pub root_font_size: f64,
    /// Format of a new, empty document.
    pub default_segment_format: Format,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            default_paste_type: PasteType::Normal,
            sanitizer_tables: Rc::new(SanitizerTables::default()),
            root_font_size: 16.0,
            default_segment_format: Format::new(),
        }
    }
}

/// One recorded edit and the content it produced.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub change_source: ChangeSource,
    pub api_name: String,
    pub change_data: Option<ClipboardData>,
    pub content: ContentDocument,
}

pub struct Editor {
    model: ContentDocument,
    options: EditorOptions,
    plugins: Vec<Box<dyn PastePlugin>>,
    history: Vec<HistoryEntry>,
    pending_format: Option<Format>,
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        let model = ContentDocument {
            blocks: Vec::new(),
            format: options.default_segment_format.clone(),
        };
        Self {
            model,
            options,
            plugins: Vec::new(),
            history: Vec::new(),
            pending_format: None,
        }
    }

    /// An editor with default options showing `model`.
    pub fn with_content(model: ContentDocument) -> Self {
        let mut editor = Self::new(EditorOptions::default());
        editor.set_content_model(model);
        editor
    }

    pub fn set_content_model(&mut self, model: ContentDocument) {
        self.model = model;
        self.pending_format = None;
        self.record(
            ChangeSource::SetContent,
            "setContentModel".to_owned(),
            None,
        );
    }

    pub fn add_plugin(&mut self, plugin: impl PastePlugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn pending_format(&self) -> Option<&Format> {
        self.pending_format.as_ref()
    }

    /// Paste with the default paste type of this editor.
    pub fn paste(
        &mut self,
        clipboard_data: &mut ClipboardData,
    ) -> Result<(), PasteError> {
        let paste_type = self.options.default_paste_type;
        self.paste_as(clipboard_data, paste_type)
    }

    pub fn paste_as(
        &mut self,
        clipboard_data: &mut ClipboardData,
        paste_type: impl Into<PasteTypeSelector>,
    ) -> Result<(), PasteError> {
        paste(self, clipboard_data, paste_type)
    }

    fn record(
        &mut self,
        change_source: ChangeSource,
        api_name: String,
        change_data: Option<ClipboardData>,
    ) {
        tracing::debug!(%change_source, api_name = %api_name, "content changed");
        self.history.push(HistoryEntry {
            change_source,
            api_name,
            change_data,
            content: self.model.clone(),
        });
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl EditorHost for Editor {
    fn content_model(&self) -> &ContentDocument {
        &self.model
    }

    fn format_content_model(
        &mut self,
        callback: &mut FormatCallback<'_>,
        options: FormatContentModelOptions,
    ) -> Result<(), PasteError> {
        let mut context = FormatContentModelContext::default();
        if !callback(&mut self.model, &mut context)? {
            return Ok(());
        }

        #[cfg(any(test, feature = "assert-invariants"))]
        self.model.explicitly_assert_invariants();

        if let Some(format) = context.new_pending_format {
            self.set_pending_format(format);
        }
        self.record(options.change_source, options.api_name, options.change_data);
        Ok(())
    }

    fn plugins(&self) -> &[Box<dyn PastePlugin>] {
        &self.plugins
    }

    fn sanitizer_tables(&self) -> Rc<SanitizerTables> {
        self.options.sanitizer_tables.clone()
    }

    fn root_font_size(&self) -> f64 {
        self.options.root_font_size
    }

    fn set_pending_format(&mut self, format: Format) {
        self.pending_format = Some(format);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content_model::{Block, Paragraph, Segment};

    fn model(text: &str) -> ContentDocument {
        ContentDocument::new(vec![Block::Paragraph(Paragraph::from_segments(
            vec![
                Segment::text(text, Format::new()),
                Segment::selection_marker(Format::new()),
            ],
        ))])
    }

    #[test]
    fn unchanged_callback_records_nothing() {
        let mut editor = Editor::with_content(model("a"));

        editor
            .format_content_model(
                &mut |_, _| Ok(false),
                FormatContentModelOptions {
                    change_source: ChangeSource::Paste,
                    api_name: "noop".to_owned(),
                    change_data: None,
                },
            )
            .unwrap();

        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.history()[0].change_source, ChangeSource::SetContent);
    }

    #[test]
    fn changes_are_recorded_with_their_pending_format() {
        let mut editor = Editor::with_content(model("a"));
        let bold = Format::new().with(crate::content_model::FormatKey::FontWeight, "bold");
        let pending = bold.clone();

        editor
            .format_content_model(
                &mut |model, context| {
                    model.blocks.clear();
                    context.new_pending_format = Some(pending.clone());
                    Ok(true)
                },
                FormatContentModelOptions {
                    change_source: ChangeSource::Paste,
                    api_name: "clear".to_owned(),
                    change_data: None,
                },
            )
            .unwrap();

        let entry = editor.history().last().unwrap();
        assert_eq!(entry.change_source.to_string(), "paste");
        assert!(entry.content.blocks.is_empty());
        assert_eq!(editor.pending_format(), Some(&bold));
    }

    #[test]
    fn callback_errors_are_propagated() {
        let mut editor = Editor::with_content(model("a"));

        let result = editor.format_content_model(
            &mut |_, _| Err(PasteError::InvalidInsertPath),
            FormatContentModelOptions {
                change_source: ChangeSource::Paste,
                api_name: "paste".to_owned(),
                change_data: None,
            },
        );

        assert_eq!(result, Err(PasteError::InvalidInsertPath));
        assert_eq!(editor.history().len(), 1);
    }
}
