// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::html_info::HtmlFromClipboard;
use super::sanitizer::SanitizingOption;
use super::{ClipboardData, PasteType};
use crate::content_model::ContentDocument;
use crate::dom::{CssRule, Fragment};
use crate::error::PasteError;
use crate::model_merge::InsertPoint;

/// Replaces the default merge. Receives the live document and the converted
/// pasted content, and returns where the caret ended up.
pub type CustomizedMerge = Rc<
    dyn Fn(
        &mut ContentDocument,
        ContentDocument,
    ) -> Result<Option<InsertPoint>, PasteError>,
>;

/// What a paste is about to insert. Each plugin receives it and returns it,
/// possibly changed, to the next one.
#[derive(Clone)]
pub struct BeforePasteEvent<'a> {
    pub clipboard_data: &'a ClipboardData,
    pub fragment: Fragment,
    pub paste_type: PasteType,
    pub html_before: String,
    pub html_after: String,
    pub html_attributes: BTreeMap<String, String>,
    pub global_css_rules: Vec<CssRule>,
    pub metadata: BTreeMap<String, String>,
    pub dom_to_model_option: SanitizingOption,
    pub contains_block_elements: bool,
    pub customized_merge: Option<CustomizedMerge>,
}

impl fmt::Debug for BeforePasteEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforePasteEvent")
            .field("fragment", &self.fragment.to_html())
            .field("paste_type", &self.paste_type)
            .field("contains_block_elements", &self.contains_block_elements)
            .field("customized_merge", &self.customized_merge.is_some())
            .finish_non_exhaustive()
    }
}

/// An editor extension that may rewrite pasted content before conversion,
/// e.g. to normalize the markup of a specific producer.
pub trait PastePlugin {
    fn name(&self) -> &str;

    fn on_before_paste<'a>(
        &self,
        event: BeforePasteEvent<'a>,
    ) -> BeforePasteEvent<'a>;
}

/// Build the event and pass it through `plugins` in order. Plain text
/// pastes skip the plugins so they cannot bring structure back.
pub fn generate_before_paste_event<'a>(
    plugins: &[Box<dyn PastePlugin>],
    clipboard_data: &'a ClipboardData,
    fragment: Fragment,
    html_info: HtmlFromClipboard,
    paste_type: PasteType,
    dom_to_model_option: SanitizingOption,
) -> BeforePasteEvent<'a> {
    let contains_block_elements = fragment.contains_block_elements();
    let event = BeforePasteEvent {
        clipboard_data,
        fragment,
        paste_type,
        html_before: html_info.html_before,
        html_after: html_info.html_after,
        html_attributes: html_info.html_attributes,
        global_css_rules: html_info.global_css_rules,
        metadata: html_info.metadata,
        dom_to_model_option,
        contains_block_elements,
        customized_merge: None,
    };

    if paste_type == PasteType::AsPlainText {
        return event;
    }

    plugins.iter().fold(event, |event, plugin| {
        tracing::debug!(plugin = plugin.name(), "running before-paste plugin");
        plugin.on_before_paste(event)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::ElementData;

    /// Wraps the whole fragment in a `<b>`, and records its position in the
    /// chain as an allowed tag.
    struct Emphasize(&'static str);

    impl PastePlugin for Emphasize {
        fn name(&self) -> &str {
            self.0
        }

        fn on_before_paste<'a>(
            &self,
            mut event: BeforePasteEvent<'a>,
        ) -> BeforePasteEvent<'a> {
            let dom = &mut event.fragment.dom;
            let b = dom.create_element(ElementData::new("b"));
            dom.move_children(event.fragment.root, b);
            dom.append_child(event.fragment.root, b);
            event
                .dom_to_model_option
                .additional_allowed_tags
                .push(self.0.to_owned());
            event
        }
    }

    fn plugins() -> Vec<Box<dyn PastePlugin>> {
        vec![Box::new(Emphasize("first")), Box::new(Emphasize("second"))]
    }

    #[test]
    fn plugins_run_in_registration_order() {
        let clipboard = ClipboardData::from_text("x");
        let event = generate_before_paste_event(
            &plugins(),
            &clipboard,
            crate::paste::text_to_fragment("x"),
            HtmlFromClipboard::default(),
            PasteType::Normal,
            SanitizingOption::default(),
        );

        assert_eq!(event.fragment.to_html(), "<b><b>x</b></b>");
        assert_eq!(
            event.dom_to_model_option.additional_allowed_tags,
            vec!["first", "second"]
        );
    }

    #[test]
    fn plain_text_paste_skips_plugins() {
        let clipboard = ClipboardData::from_text("x");
        let event = generate_before_paste_event(
            &plugins(),
            &clipboard,
            crate::paste::text_to_fragment("x"),
            HtmlFromClipboard::default(),
            PasteType::AsPlainText,
            SanitizingOption::default(),
        );

        assert_eq!(event.fragment.to_html(), "x");
        assert!(event.dom_to_model_option.additional_allowed_tags.is_empty());
    }

    #[test]
    fn event_reports_block_content() {
        let clipboard = ClipboardData::from_text("a\nb\nc");
        let event = generate_before_paste_event(
            &[],
            &clipboard,
            crate::paste::text_to_fragment("a\nb\nc"),
            HtmlFromClipboard::default(),
            PasteType::Normal,
            SanitizingOption::default(),
        );

        assert!(event.contains_block_elements);
    }
}
