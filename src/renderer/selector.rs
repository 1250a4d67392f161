//! Selector rewriting for application-scoped styles
//!
//! Rewrites one style rule so it only matches inside the element identified
//! by a namespace prefix (e.g. `picocontainer-app[name="app1"]`). Document-root
//! selectors (`html`, `body`, `html body`, `:root`) are replaced by the prefix
//! since the prefix already names the application root; everything else is
//! prefixed with a descendant combinator.

use super::css::StyleRule;
use cssparser::{ParseError, Parser, ParserInput};

/// Rewrite a style rule into text scoped under `prefix`
pub fn scope_style_rule(rule: &StyleRule, prefix: &str) -> String {
    format!("{} {}", scope_selector(&rule.selector_text, prefix), rule.block)
}

/// Rewrite a selector list so every branch is scoped under `prefix`
pub fn scope_selector(selector_text: &str, prefix: &str) -> String {
    let selector_text = selector_text.trim();
    if selector_text == "*" {
        return format!("{prefix} *");
    }

    let branches = split_selector_list(selector_text);
    if branches
        .iter()
        .all(|branch| root_fragment_len(branch) == Some(branch.len()))
    {
        return prefix.to_string();
    }

    branches
        .iter()
        .map(|branch| match root_fragment_len(branch) {
            Some(len) => format!("{prefix}{}", &branch[len..]),
            None => format!("{prefix} {branch}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split on top-level commas; commas inside `:is(a, b)` or `[x="a,b"]` stay put
fn split_selector_list(selector_text: &str) -> Vec<&str> {
    let mut input = ParserInput::new(selector_text);
    let mut parser = Parser::new(&mut input);
    let branches = parser.parse_comma_separated(|p| {
        let start = p.position();
        while p.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, ParseError<()>>(p.slice_from(start).trim())
    });

    match branches {
        Ok(branches) => branches.into_iter().filter(|b| !b.is_empty()).collect(),
        Err(_) => selector_text
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect(),
    }
}

/// Byte length of a leading document-root selector, if the branch starts with one.
///
/// The root must end at the branch end, before whitespace, or before a `>` or
/// `~` combinator, so `bodyTag`, `body.dark` and `body+p` are not roots.
fn root_fragment_len(branch: &str) -> Option<usize> {
    let len = if let Some(rest) = branch.strip_prefix("html") {
        let after_combinator = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '>' || c == '~');
        let skipped = rest.len() - after_combinator.len();
        match after_combinator.strip_prefix("body") {
            Some(tail) if skipped > 0 && ends_fragment(tail) => 4 + skipped + 4,
            _ => 4,
        }
    } else if branch.starts_with("body") {
        4
    } else if branch.starts_with(":root") {
        5
    } else {
        return None;
    };

    ends_fragment(&branch[len..]).then_some(len)
}

fn ends_fragment(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_none_or(|c| c.is_whitespace() || matches!(c, '>' | '~'))
}
