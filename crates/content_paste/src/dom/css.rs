// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use lightningcss::declaration::DeclarationBlock;
use lightningcss::rules::CssRule as StyleSheetRule;
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use super::html_document::ElementData;
use super::style::InlineStyle;

/// A compound selector made of an optional tag, ids and classes, e.g.
/// `p.MsoNormal`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
}

impl CompoundSelector {
    /// Anything with combinators, pseudo classes or attribute tests gives
    /// `None`.
    fn from_selector(selector: &Selector<'_>) -> Option<Self> {
        let mut compound = CompoundSelector {
            tag: None,
            ids: Vec::new(),
            classes: Vec::new(),
        };
        for component in selector.iter_raw_match_order() {
            match component {
                Component::LocalName(local) => {
                    compound.tag = Some(local.lower_name.0.to_ascii_lowercase());
                }
                Component::ID(id) => compound.ids.push(String::from(&*id.0)),
                Component::Class(class) => {
                    compound.classes.push(String::from(&*class.0))
                }
                Component::ExplicitUniversalType => {}
                _ => return None,
            }
        }
        Some(compound)
    }

    pub fn matches(&self, element: &ElementData) -> bool {
        self.tag.as_deref().map_or(true, |tag| tag == element.tag())
            && self.ids.iter().all(|id| element.attr("id") == Some(id.as_str()))
            && self.classes.iter().all(|class| element.has_class(class))
    }
}

/// A style rule from a stylesheet: the compound selectors it applies to and
/// its declarations, `!important` ones last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssRule {
    pub selectors: Vec<CompoundSelector>,
    pub declarations: InlineStyle,
}

/// Parse the style rules of a stylesheet. At-rules (`@font-face`,
/// `@media`, `@page`, ...) and leftover HTML comment markers are skipped,
/// and so are rules without a single compound selector.
pub fn parse_css_rules(stylesheet: &str) -> Vec<CssRule> {
    let options = ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    };
    let sheet = match StyleSheet::parse(stylesheet, options) {
        Ok(sheet) => sheet,
        Err(error) => {
            tracing::debug!(%error, "unparsable stylesheet");
            return Vec::new();
        }
    };

    sheet
        .rules
        .0
        .iter()
        .filter_map(|rule| match rule {
            StyleSheetRule::Style(style) => {
                let selectors: Vec<CompoundSelector> = style
                    .selectors
                    .0
                    .iter()
                    .filter_map(CompoundSelector::from_selector)
                    .collect();
                (!selectors.is_empty()).then(|| CssRule {
                    selectors,
                    declarations: declarations_to_style(&style.declarations),
                })
            }
            _ => None,
        })
        .collect()
}

fn declarations_to_style(block: &DeclarationBlock<'_>) -> InlineStyle {
    let mut style = InlineStyle::default();
    for property in block
        .declarations
        .iter()
        .chain(block.important_declarations.iter())
    {
        match property.value_to_css_string(PrinterOptions::default()) {
            Ok(value) => style.set(property.property_id().name(), &value),
            Err(error) => tracing::trace!(%error, "skipped css declaration"),
        }
    }
    style
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;

    fn selector(tag: Option<&str>, ids: &[&str], classes: &[&str]) -> CompoundSelector {
        CompoundSelector {
            tag: tag.map(str::to_owned),
            ids: ids.iter().map(|s| s.to_string()).collect(),
            classes: classes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rules_are_split_by_selector() {
        let rules = parse_css_rules(indoc! {"
            <!--
            /* Style Definitions */
            p.MsoNormal, li.MsoNormal { font-size: 11pt; }
            .red { color: red }
            -->
        "});

        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].selectors,
            vec![
                selector(Some("p"), &[], &["MsoNormal"]),
                selector(Some("li"), &[], &["MsoNormal"]),
            ]
        );
        assert_eq!(rules[0].declarations.get("font-size"), Some("11pt"));
        assert_eq!(rules[1].selectors, vec![selector(None, &[], &["red"])]);
        assert_eq!(rules[1].declarations.get("color"), Some("red"));
    }

    #[test]
    fn selectors_are_read_as_compounds() {
        let rules = parse_css_rules("P.a.b#c { color: red } div p, a:hover, [x] { color: red }");

        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].selectors,
            vec![selector(Some("p"), &["c"], &["a", "b"])]
        );
    }

    #[test]
    fn at_rules_are_skipped() {
        let rules = parse_css_rules(indoc! {"
            @font-face { font-family: Calibri; panose-1: 2 15 5 2 2 2 4 3 2 4; }
            @import url(x.css);
            @media print { p { color: black; } }
            b { font-weight: bold }
        "});

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selectors, vec![selector(Some("b"), &[], &[])]);
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_rule() {
        let rules = parse_css_rules(r#".a{content:"}";color:red} .b { color: red }"#);

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].declarations.get("color"), Some("red"));
        assert_eq!(rules[1].selectors, vec![selector(None, &[], &["b"])]);
    }

    #[test]
    fn important_declarations_come_last() {
        let rules = parse_css_rules(".a { color: red !important; color: green }");

        assert_eq!(rules[0].declarations.get("color"), Some("red"));
    }

    #[test]
    fn compound_selectors_match_tag_id_and_classes() {
        let element = ElementData::new("p")
            .with_attr("id", "c")
            .with_attr("class", "a b");

        assert!(selector(Some("p"), &["c"], &["a", "b"]).matches(&element));
        assert!(selector(None, &[], &["b"]).matches(&element));
        assert!(!selector(Some("span"), &[], &[]).matches(&element));
        assert!(!selector(None, &["d"], &[]).matches(&element));
    }
}
