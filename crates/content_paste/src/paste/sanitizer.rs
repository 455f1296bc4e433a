// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use url::Url;

use crate::content_model::{FormatCategory, FormatKey};
use crate::dom::{CopyAction, ElementData};
use crate::dom_to_model::{DomToModelOption, ElementProcessor, FormatParser};

/// Cleans one style property or attribute value. `Transform` returns the
/// value to keep, or `None` to drop it.
#[derive(Clone)]
pub enum ValueSanitizer {
    Allow,
    Deny,
    /// Called with the value and the element's tag.
    Transform(Rc<dyn Fn(&str, &str) -> Option<String>>),
}

impl ValueSanitizer {
    pub fn transform(
        f: impl Fn(&str, &str) -> Option<String> + 'static,
    ) -> Self {
        Self::Transform(Rc::new(f))
    }

    pub fn apply(&self, value: &str, tag: &str) -> Option<String> {
        match self {
            Self::Allow => Some(value.to_owned()),
            Self::Deny => None,
            Self::Transform(f) => f(value, tag),
        }
    }
}

impl fmt::Debug for ValueSanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("Allow"),
            Self::Deny => f.write_str("Deny"),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// Per-paste additions to the sanitizer and conversion tables. Plugins may
/// replace or extend it during the before-paste fold.
#[derive(Clone, Default)]
pub struct SanitizingOption {
    pub additional_allowed_tags: Vec<String>,
    pub additional_disallowed_tags: Vec<String>,
    /// By CSS property name.
    pub style_sanitizers: HashMap<String, ValueSanitizer>,
    /// By attribute name.
    pub attribute_sanitizers: HashMap<String, ValueSanitizer>,
    /// By tag name, or `#text`, `entity` or `*`.
    pub processor_override: HashMap<String, ElementProcessor>,
    /// `None` disables the parser for that key.
    pub format_parser_override: HashMap<FormatKey, Option<FormatParser>>,
    pub additional_format_parsers: HashMap<FormatCategory, Vec<FormatParser>>,
}

impl SanitizingOption {
    /// The conversion overrides of this option.
    pub fn dom_to_model_option(&self) -> DomToModelOption {
        DomToModelOption {
            processor_override: self.processor_override.clone(),
            format_parser_override: self.format_parser_override.clone(),
            additional_format_parsers: self.additional_format_parsers.clone(),
            element_filter: None,
        }
    }
}

const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "b", "bdi", "bdo",
    "big", "blockquote", "body", "br", "caption", "center", "cite", "code",
    "col", "colgroup", "data", "dd", "del", "details", "dfn", "div", "dl",
    "dt", "em", "figcaption", "figure", "font", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "hr", "html", "i", "img", "ins",
    "kbd", "label", "li", "main", "mark", "nav", "ol", "p", "picture",
    "pre", "q", "s", "samp", "section", "small", "span", "strike", "strong",
    "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead",
    "time", "tr", "tt", "u", "ul", "var", "wbr", "xmp",
];

const DEFAULT_DISALLOWED_TAGS: &[&str] = &[
    "applet", "base", "button", "embed", "form", "frame", "frameset", "head",
    "iframe", "input", "link", "math", "meta", "noscript", "object",
    "script", "select", "style", "svg", "template", "textarea", "title",
];

/// Schemes a link or image may point to. Relative URLs are allowed too.
const ALLOWED_URL_SCHEMES: &[&str] =
    &["http", "https", "mailto", "tel", "ftp", "data", "cid"];

/// Keep relative URLs and URLs with a safe scheme.
fn sanitize_url(value: &str, _tag: &str) -> Option<String> {
    let trimmed: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_whitespace())
        .collect();
    match Url::parse(&trimmed) {
        Ok(url) => ALLOWED_URL_SCHEMES
            .contains(&url.scheme())
            .then(|| value.trim().to_owned()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Some(value.trim().to_owned())
        }
        Err(_) => None,
    }
}

/// The built-in sanitizer tables, built once per editor.
#[derive(Clone, Debug)]
pub struct SanitizerTables {
    pub allowed_tags: HashSet<String>,
    pub disallowed_tags: HashSet<String>,
    pub style_sanitizers: HashMap<String, ValueSanitizer>,
    pub attribute_sanitizers: HashMap<String, ValueSanitizer>,
}

impl Default for SanitizerTables {
    fn default() -> Self {
        let url = ValueSanitizer::transform(sanitize_url);
        Self {
            allowed_tags: DEFAULT_ALLOWED_TAGS
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            disallowed_tags: DEFAULT_DISALLOWED_TAGS
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            style_sanitizers: HashMap::from([(
                "position".to_owned(),
                ValueSanitizer::Deny,
            )]),
            attribute_sanitizers: HashMap::from([
                ("href".to_owned(), url.clone()),
                ("src".to_owned(), url),
            ]),
        }
    }
}

impl SanitizerTables {
    /// These tables with a paste's additions layered on top. Entries of
    /// `option` win over the defaults.
    pub fn with_option(&self, option: &SanitizingOption) -> SanitizerTables {
        let mut tables = self.clone();
        let lower = |t: &String| t.to_ascii_lowercase();
        tables
            .allowed_tags
            .extend(option.additional_allowed_tags.iter().map(lower));
        tables
            .disallowed_tags
            .extend(option.additional_disallowed_tags.iter().map(lower));
        for (name, sanitizer) in &option.style_sanitizers {
            tables
                .style_sanitizers
                .insert(name.to_ascii_lowercase(), sanitizer.clone());
        }
        for (name, sanitizer) in &option.attribute_sanitizers {
            tables
                .attribute_sanitizers
                .insert(name.to_ascii_lowercase(), sanitizer.clone());
        }
        tables
    }

    pub fn is_disallowed(&self, tag: &str) -> bool {
        self.disallowed_tags.contains(tag)
    }

    /// How a paste treats `element`: a disallowed tag loses its whole
    /// subtree, a tag that is merely not allowed is unwrapped so its children
    /// are still pasted.
    pub fn classify(&self, element: &ElementData) -> CopyAction {
        if self.is_disallowed(element.tag()) {
            return CopyAction::Drop;
        }
        match self.sanitize(element) {
            Some(clean) => CopyAction::Keep(clean),
            None => CopyAction::Unwrap,
        }
    }

    pub fn sanitize(&self, element: &ElementData) -> Option<ElementData> {
        sanitize_element(
            element,
            &self.allowed_tags,
            &self.disallowed_tags,
            &self.style_sanitizers,
            &self.attribute_sanitizers,
        )
    }
}

/// Clean one element without touching its children or the source tree.
///
/// Returns `None` when the tag is disallowed or not allowed. Otherwise
/// returns a copy where:
/// - every inline style property with a sanitizer is kept, replaced or
///   dropped as the sanitizer decides
/// - every attribute with a sanitizer is treated the same way
/// - `on*` event handler attributes are dropped
pub fn sanitize_element(
    element: &ElementData,
    allowed_tags: &HashSet<String>,
    disallowed_tags: &HashSet<String>,
    style_sanitizers: &HashMap<String, ValueSanitizer>,
    attribute_sanitizers: &HashMap<String, ValueSanitizer>,
) -> Option<ElementData> {
    let tag = element.tag();
    if disallowed_tags.contains(tag) || !allowed_tags.contains(tag) {
        tracing::trace!(tag, "sanitizer rejected element");
        return None;
    }

    let mut attrs = Vec::with_capacity(element.attrs.len());
    for (name, value) in &element.attrs {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("on") {
            tracing::trace!(tag, attribute = %lower, "dropped event handler");
            continue;
        }
        if lower == "style" {
            let mut style = crate::dom::InlineStyle::default();
            for (property, value) in element.style().iter() {
                let kept = match style_sanitizers.get(property) {
                    Some(sanitizer) => sanitizer.apply(value, tag),
                    None => Some(value.to_owned()),
                };
                match kept {
                    Some(kept) => style.set(property, &kept),
                    None => {
                        tracing::trace!(tag, property, "dropped style")
                    }
                }
            }
            if !style.is_empty() {
                attrs.push((name.clone(), style.to_css_text()));
            }
            continue;
        }
        let kept = match attribute_sanitizers.get(&lower) {
            Some(sanitizer) => sanitizer.apply(value, tag),
            None => Some(value.clone()),
        };
        match kept {
            Some(kept) => attrs.push((name.clone(), kept)),
            None => tracing::trace!(tag, attribute = %lower, "dropped attribute"),
        }
    }

    Some(ElementData {
        name: element.name.clone(),
        attrs,
    })
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;

    fn sanitize(element: &ElementData) -> Option<ElementData> {
        SanitizerTables::default().sanitize(element)
    }

    #[test]
    fn disallowed_tags_are_rejected_whatever_their_attributes() {
        for tag in ["script", "style", "iframe", "object"] {
            let element = ElementData::new(tag)
                .with_attr("style", "color: red")
                .with_attr("class", "safe");
            assert_that!(sanitize(&element)).is_none();
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_that!(sanitize(&ElementData::new("o:p"))).is_none();
        assert_that!(sanitize(&ElementData::new("custom-widget"))).is_none();
    }

    #[test]
    fn disallowed_wins_over_allowed() {
        let tables = SanitizerTables::default().with_option(&SanitizingOption {
            additional_allowed_tags: vec!["script".into()],
            ..Default::default()
        });

        assert_that!(tables.sanitize(&ElementData::new("script"))).is_none();
    }

    #[test]
    fn classify_drops_disallowed_and_unwraps_unknown() {
        let tables = SanitizerTables::default();

        assert!(matches!(
            tables.classify(&ElementData::new("iframe")),
            CopyAction::Drop
        ));
        assert!(matches!(
            tables.classify(&ElementData::new("o:p")),
            CopyAction::Unwrap
        ));
        assert!(matches!(
            tables.classify(&ElementData::new("span")),
            CopyAction::Keep(_)
        ));
    }

    #[test]
    fn position_is_removed_from_inline_style() {
        let element = ElementData::new("div")
            .with_attr("style", "position: absolute; color: red");

        let sanitized = sanitize(&element).unwrap();

        assert_eq!(sanitized.attr("style"), Some("color: red"));
        assert_eq!(element.attr("style"), Some("position: absolute; color: red"));
    }

    #[test]
    fn script_urls_and_event_handlers_are_dropped() {
        let element = ElementData::new("a")
            .with_attr("href", " JavaScript:alert(1)")
            .with_attr("onclick", "steal()")
            .with_attr("title", "t");

        let sanitized = sanitize(&element).unwrap();

        assert_eq!(sanitized.attrs, vec![("title".to_owned(), "t".to_owned())]);
    }

    #[test]
    fn safe_and_relative_urls_are_kept() {
        for href in ["https://matrix.org", "mailto:a@b.c", "#top", "/docs/x"] {
            let element = ElementData::new("a").with_attr("href", href);
            assert_eq!(sanitize(&element).unwrap().attr("href"), Some(href));
        }
    }

    #[test]
    fn local_file_urls_are_dropped() {
        let link = ElementData::new("a").with_attr("href", "file:///etc/passwd");
        let image = ElementData::new("img").with_attr("src", "FILE://host/share/x.png");

        assert_that!(sanitize(&link).unwrap().attr("href")).is_none();
        assert_that!(sanitize(&image).unwrap().attr("src")).is_none();
    }

    #[test]
    fn custom_transform_sees_value_and_tag() {
        let tables = SanitizerTables::default().with_option(&SanitizingOption {
            attribute_sanitizers: HashMap::from([(
                "class".to_owned(),
                ValueSanitizer::transform(|value, tag| {
                    (tag == "p").then(|| value.to_uppercase())
                }),
            )]),
            ..Default::default()
        });

        let p = ElementData::new("p").with_attr("class", "x");
        let span = ElementData::new("span").with_attr("class", "x");

        assert_eq!(tables.sanitize(&p).unwrap().attr("class"), Some("X"));
        assert_eq!(tables.sanitize(&span).unwrap().attr("class"), None);
    }
}
