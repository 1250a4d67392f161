//! Stylesheet scoping for application `<style>` elements

use super::css::{CssParser, CssRule, GroupingRule};
use super::dom::{MutationObserver, Node};
use super::selector::scope_style_rule;
use std::sync::{LazyLock, Mutex, PoisonError};

/// Process-wide scratch stylesheet used purely to split CSS text into rules
static TEMPLATE_STYLE: LazyLock<Mutex<ScratchStyleSheet>> =
    LazyLock::new(|| Mutex::new(ScratchStyleSheet::new()));

/// Detached, disabled stylesheet. It never renders and holds no text
/// between calls.
pub struct ScratchStyleSheet {
    text: String,
    disabled: bool,
    parser: CssParser,
}

impl ScratchStyleSheet {
    fn new() -> Self {
        log::debug!("creating scratch stylesheet");
        Self {
            text: String::new(),
            disabled: true,
            parser: CssParser::new(),
        }
    }

    fn parse_rules(&mut self, css: &str) -> Vec<CssRule> {
        debug_assert!(self.disabled, "scratch stylesheet must stay disabled");
        self.text.push_str(css);
        let rules = self.parser.parse(&self.text).rules;
        self.text.clear();
        rules
    }

    /// Whether the sheet is disabled and empty
    pub fn is_inert(&self) -> bool {
        self.disabled && self.text.is_empty()
    }
}

/// Check the scratch stylesheet's state between scoping calls
pub fn scratch_is_inert() -> bool {
    TEMPLATE_STYLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_inert()
}

/// Scope a `<style>` element in place.
///
/// A populated element is rewritten immediately. An empty one gets a one-shot
/// observer that scopes the content it receives first.
pub fn scoped_css(style: &mut Node, prefix: &str) {
    let content = style.text_content();
    if !content.is_empty() {
        style.replace_text(scope_css_text(&content, prefix));
        return;
    }

    let prefix = prefix.to_string();
    style.observe(MutationObserver::new(move |node| {
        let content = node.text_content();
        node.replace_text(scope_css_text(&content, &prefix));
    }));
}

/// Scope a full stylesheet's text under `prefix`
pub fn scope_css_text(css: &str, prefix: &str) -> String {
    let rules = TEMPLATE_STYLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .parse_rules(css);
    scoped_rules(&rules, prefix, "\n")
}

/// Scope each rule in turn
pub fn scoped_rules(rules: &[CssRule], prefix: &str, separator: &str) -> String {
    rules
        .iter()
        .map(|rule| match rule {
            CssRule::Style(style) => scope_style_rule(style, prefix),
            CssRule::Media(group) => scoped_pack_rule("media", group, prefix),
            CssRule::Supports(group) => scoped_pack_rule("supports", group, prefix),
            CssRule::Other(text) => text.clone(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Re-emit a grouping rule with its nested rules scoped
fn scoped_pack_rule(keyword: &str, group: &GroupingRule, prefix: &str) -> String {
    let inner = scoped_rules(&group.rules, prefix, " ");
    format!("@{keyword} {} {{ {inner} }}", group.condition_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = r#"picocontainer-app[name="app1"]"#;

    #[test]
    fn test_scope_full_stylesheet() {
        let css = "html, body { margin: 0; }\n* { box-sizing: border-box; }\n.title, h1 { color: red; }";
        assert_eq!(
            scope_css_text(css, PREFIX),
            "picocontainer-app[name=\"app1\"] { margin: 0; }\n\
             picocontainer-app[name=\"app1\"] * { box-sizing: border-box; }\n\
             picocontainer-app[name=\"app1\"] .title, picocontainer-app[name=\"app1\"] h1 { color: red; }"
        );
        assert!(scratch_is_inert());
    }

    #[test]
    fn test_media_rule_rewrapped_with_condition() {
        let css = "@media screen and (max-width: 600px) { .a { b: c; } body { d: e; } }";
        assert_eq!(
            scope_css_text(css, "P"),
            "@media screen and (max-width: 600px) { P .a { b: c; } P { d: e; } }"
        );
    }

    #[test]
    fn test_nested_grouping_rules() {
        let css = "@supports (display: grid) { @media print { .g { display: grid; } } }";
        assert_eq!(
            scope_css_text(css, "P"),
            "@supports (display: grid) { @media print { P .g { display: grid; } } }"
        );
    }

    #[test]
    fn test_functional_and_attribute_selectors_scoped_whole() {
        let css = "li:not(.x) > a, [data-k=\"1\"] { a: b; }\n@media (min-width: 1px) { :is(.a, .b) { c: d; } }";
        assert_eq!(
            scope_css_text(css, "P"),
            "P li:not(.x) > a, P [data-k=\"1\"] { a: b; }\n@media (min-width: 1px) { P :is(.a, .b) { c: d; } }"
        );
    }

    #[test]
    fn test_keyframes_and_font_face_unchanged() {
        let css = "@font-face { font-family: X; src: url(x.woff); }\n@keyframes spin { to { transform: rotate(1turn); } }";
        assert_eq!(scope_css_text(css, "P"), css);
    }

    #[test]
    fn test_populated_style_scoped_immediately() {
        let mut style = Node::element("style");
        style.add_child(Node::text(".a { color: red; }"));
        scoped_css(&mut style, "P");
        assert_eq!(style.text_content(), "P .a { color: red; }");
        assert!(!style.is_observed());
    }

    #[test]
    fn test_empty_style_scoped_on_first_content() {
        let mut style = Node::element("style");
        scoped_css(&mut style, "P");
        assert!(style.is_observed());

        style.set_text_content(".late { color: blue; }");
        assert_eq!(style.text_content(), "P .late { color: blue; }");
        assert!(!style.is_observed());

        // Watch is disconnected after the first change
        style.set_text_content(".later { color: green; }");
        assert_eq!(style.text_content(), ".later { color: green; }");
    }

    #[test]
    fn test_scratch_sheet_cleared_between_calls() {
        assert_eq!(scope_css_text(".one { a: b; }", "P"), "P .one { a: b; }");
        assert_eq!(scope_css_text(".two { a: b; }", "P"), "P .two { a: b; }");
        assert!(scratch_is_inert());
    }
}
