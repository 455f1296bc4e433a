// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::{CssRule, Fragment, InlineStyle};

/// Write the declarations of `rules` into the inline style of every
/// matching element of `fragment`. Later rules override earlier ones, and
/// declarations already inline override both.
pub fn apply_css_rules(fragment: &mut Fragment, rules: &[CssRule]) {
    if rules.is_empty() {
        return;
    }

    let mut styled = 0;
    for id in fragment.dom.descendants(fragment.root) {
        let Some(element) = fragment.dom.element_mut(id) else {
            continue;
        };
        let mut style = InlineStyle::default();
        for rule in rules {
            if rule.selectors.iter().any(|s| s.matches(element)) {
                for (name, value) in rule.declarations.iter() {
                    style.set(name, value);
                }
            }
        }
        if style.is_empty() {
            continue;
        }
        for (name, value) in element.style().iter() {
            style.set(name, value);
        }
        element.set_style(&style);
        styled += 1;
    }
    tracing::debug!(rules = rules.len(), styled, "applied global css rules");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::{parse_css_rules, HtmlDocument};

    fn fragment(html: &str) -> Fragment {
        let mut dom = HtmlDocument::parse(html);
        let body = dom.body().unwrap();
        let root = dom.create_fragment();
        dom.move_children(body, root);
        Fragment { dom, root }
    }

    #[test]
    fn matching_rules_become_inline_styles() {
        let mut fragment = fragment(
            r#"<p class="MsoNormal" style="color: blue">a</p><span id="s">b</span>"#,
        );
        let rules = parse_css_rules(
            "p.MsoNormal { color: red; font-size: 11pt }\n#s { font-weight: bold }\n.MsoNormal { font-size: 12pt }",
        );

        apply_css_rules(&mut fragment, &rules);

        assert_eq!(
            fragment.to_html(),
            r#"<p class="MsoNormal" style="font-size: 12pt; color: blue">a</p><span id="s" style="font-weight: bold">b</span>"#
        );
    }

    #[test]
    fn unsupported_selectors_are_ignored() {
        let mut fragment = fragment("<p>a</p>");
        let rules = parse_css_rules("body p { color: red } p:first-child { color: green }");

        apply_css_rules(&mut fragment, &rules);

        assert_eq!(fragment.to_html(), "<p>a</p>");
    }

    #[test]
    fn quoted_braces_keep_the_rest_of_the_rule() {
        let mut fragment = fragment(r#"<span class="a">x</span>"#);
        let rules = parse_css_rules(r#".a{content:"}";color:red}"#);

        apply_css_rules(&mut fragment, &rules);

        let span = fragment.children()[0];
        let style = fragment.dom.element(span).unwrap().style();
        assert_eq!(style.get("color"), Some("red"));
    }
}
