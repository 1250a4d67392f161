//! HTML/CSS handling for application documents
//!
//! Parses application HTML into an owned DOM tree and rewrites application
//! stylesheets so they only apply inside the application's container.

pub mod css;
mod dom;
pub mod html;
pub mod scoped_css;
pub mod selector;

pub use css::{CssParser, CssRule, GroupingRule, StyleRule, Stylesheet};
pub use dom::{Document, ElementData, MutationObserver, Node, NodeRef, NodeType};
pub use html::HtmlParser;
pub use scoped_css::{scope_css_text, scoped_css};
pub use selector::{scope_selector, scope_style_rule};
