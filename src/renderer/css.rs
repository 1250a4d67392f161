//! CSS rule splitter using cssparser
//!
//! Splits a stylesheet into top-level rules without interpreting declarations.
//! Style rules keep their selector text and raw block, grouping rules
//! (`@media`, `@supports`) keep their condition and nested rules, and every
//! other at-rule is carried through as text.

use cssparser::{Delimiter, Delimiters, ParseError, Parser, ParserInput, SourcePosition, Token};

/// A plain style rule
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Selector list with whitespace runs collapsed
    pub selector_text: String,
    /// Declaration block as written, braces included
    pub block: String,
}

/// A conditional rule wrapping nested rules
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingRule {
    /// Condition as written after the at-keyword
    pub condition_text: String,
    /// Nested rules
    pub rules: Vec<CssRule>,
}

/// A top-level or nested stylesheet rule
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(StyleRule),
    Media(GroupingRule),
    Supports(GroupingRule),
    /// Keyframes, font-face, import, ... kept verbatim
    Other(String),
}

/// CSS stylesheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

/// CSS parser using cssparser crate
pub struct CssParser {}

impl CssParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Parse CSS content into a stylesheet
    ///
    /// Rules that never reach their block are dropped; the parse itself
    /// cannot fail.
    pub fn parse(&self, content: &str) -> Stylesheet {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        Stylesheet {
            rules: self.parse_rule_list(&mut parser),
        }
    }

    fn parse_rule_list<'i>(&self, parser: &mut Parser<'i, '_>) -> Vec<CssRule> {
        let mut rules = Vec::new();

        loop {
            parser.skip_whitespace();
            let start = parser.position();
            let token = match parser.next() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };

            let rule = match token {
                Token::AtKeyword(ref name) => self.parse_at_rule(name, start, parser),
                Token::CDO | Token::CDC | Token::Semicolon => continue,
                Token::CurlyBracketBlock => {
                    // Block without a selector
                    Self::skip_block(parser);
                    None
                }
                _ => Self::parse_style_rule(start, parser),
            };

            if let Some(rule) = rule {
                rules.push(rule);
            }
        }

        rules
    }

    /// Parse a style rule whose first prelude token was already consumed
    fn parse_style_rule<'i>(start: SourcePosition, parser: &mut Parser<'i, '_>) -> Option<CssRule> {
        Self::skip_prelude(parser, Delimiter::CurlyBracketBlock);
        let prelude = parser.slice_from(start);
        let block_start = parser.position();
        match parser.next() {
            Ok(Token::CurlyBracketBlock) => {
                Self::skip_block(parser);
                let block = parser.slice_from(block_start).trim().to_string();
                Some(CssRule::Style(StyleRule {
                    selector_text: collapse_whitespace(prelude),
                    block,
                }))
            }
            _ => None,
        }
    }

    fn parse_at_rule<'i>(
        &self,
        name: &str,
        start: SourcePosition,
        parser: &mut Parser<'i, '_>,
    ) -> Option<CssRule> {
        let prelude_start = parser.position();
        let keyword = name.to_ascii_lowercase();
        Self::skip_prelude(parser, Delimiter::CurlyBracketBlock | Delimiter::Semicolon);
        let prelude = parser.slice_from(prelude_start);

        match parser.next() {
            Ok(Token::CurlyBracketBlock) if keyword == "media" || keyword == "supports" => {
                let rules = parser
                    .parse_nested_block(|p| Ok::<_, ParseError<()>>(self.parse_rule_list(p)))
                    .unwrap_or_default();
                let group = GroupingRule {
                    condition_text: collapse_whitespace(prelude),
                    rules,
                };
                Some(if keyword == "media" {
                    CssRule::Media(group)
                } else {
                    CssRule::Supports(group)
                })
            }
            Ok(Token::CurlyBracketBlock) => {
                Self::skip_block(parser);
                Some(CssRule::Other(parser.slice_from(start).trim().to_string()))
            }
            Ok(_) => Some(CssRule::Other(parser.slice_from(start).trim().to_string())),
            Err(_) => {
                let text = parser.slice_from(start).trim();
                (!text.is_empty()).then(|| CssRule::Other(text.to_string()))
            }
        }
    }

    /// Consume a rule prelude, nested blocks included, up to `delimiters`
    fn skip_prelude(parser: &mut Parser<'_, '_>, delimiters: Delimiters) {
        let _ = parser.parse_until_before(delimiters, |p| {
            while p.next().is_ok() {}
            Ok::<(), ParseError<()>>(())
        });
    }

    /// Consume the contents of the block that was just opened
    fn skip_block(parser: &mut Parser<'_, '_>) {
        let _ = parser.parse_nested_block(|p| {
            while p.next().is_ok() {}
            Ok::<(), ParseError<()>>(())
        });
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(selector: &str, block: &str) -> CssRule {
        CssRule::Style(StyleRule {
            selector_text: selector.to_string(),
            block: block.to_string(),
        })
    }

    #[test]
    fn test_parse_simple_rule() {
        let sheet = CssParser::new().parse("body { color: red; }");
        assert_eq!(sheet.rules, vec![style("body", "{ color: red; }")]);
    }

    #[test]
    fn test_parse_selector_list_keeps_raw_block() {
        let sheet = CssParser::new()
            .parse("/* lead */ .foo,\n   .bar   { x:1; }");
        assert_eq!(sheet.rules, vec![style(".foo, .bar", "{ x:1; }")]);
    }

    #[test]
    fn test_parse_media_rule_nested() {
        let sheet = CssParser::new()
            .parse("@media (max-width: 600px) { .a { b: c; } .d { e: f; } }");
        assert_eq!(
            sheet.rules,
            vec![CssRule::Media(GroupingRule {
                condition_text: "(max-width: 600px)".to_string(),
                rules: vec![style(".a", "{ b: c; }"), style(".d", "{ e: f; }")],
            })]
        );
    }

    #[test]
    fn test_parse_supports_rule() {
        let sheet = CssParser::new()
            .parse("@supports (display: grid) { .grid { display: grid; } }");
        assert!(matches!(&sheet.rules[0], CssRule::Supports(g) if g.rules.len() == 1));
    }

    #[test]
    fn test_other_at_rules_pass_through() {
        let css = "@import url(\"a.css\");\n@keyframes spin { from { a: b; } to { a: c; } }\n.x { y: z; }";
        let sheet = CssParser::new().parse(css);
        assert_eq!(
            sheet.rules,
            vec![
                CssRule::Other("@import url(\"a.css\");".to_string()),
                CssRule::Other("@keyframes spin { from { a: b; } to { a: c; } }".to_string()),
                style(".x", "{ y: z; }"),
            ]
        );
    }

    #[test]
    fn test_unterminated_rule_is_dropped() {
        let sheet = CssParser::new().parse(".ok { a: b; } .broken");
        assert_eq!(sheet.rules, vec![style(".ok", "{ a: b; }")]);
    }

    #[test]
    fn test_functional_selector_kept_whole() {
        let sheet = CssParser::new().parse("li:not(.x) { a: b; }");
        assert_eq!(sheet.rules, vec![style("li:not(.x)", "{ a: b; }")]);
    }

    #[test]
    fn test_attribute_selector_kept_whole() {
        let sheet = CssParser::new().parse("[data-x=\"1\"] > p { a: b; }");
        assert_eq!(sheet.rules, vec![style("[data-x=\"1\"] > p", "{ a: b; }")]);
    }

    #[test]
    fn test_supports_condition_text() {
        let sheet = CssParser::new().parse("@supports (display: grid) { .g { a: b; } }");
        assert_eq!(
            sheet.rules,
            vec![CssRule::Supports(GroupingRule {
                condition_text: "(display: grid)".to_string(),
                rules: vec![style(".g", "{ a: b; }")],
            })]
        );
    }
}
