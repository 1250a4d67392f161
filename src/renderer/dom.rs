//! DOM (Document Object Model) implementation

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a host-page node (containers are held this way)
pub type NodeRef = Rc<RefCell<Node>>;

/// Elements whose serialization has no closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Node types in the DOM
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Document root
    Document,
    /// Element node (e.g., <div>)
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name (e.g., "div", "span")
    pub tag_name: String,
    /// Element attributes, in source order
    pub attributes: IndexMap<String, String>,
}

impl ElementData {
    /// Create a new element
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Check for an attribute regardless of its value
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// One-shot watch for content changes on a node.
///
/// The first [`Node::set_text_content`] on the observed node disconnects the
/// observer and then hands it the mutated node.
#[derive(Clone)]
pub struct MutationObserver {
    callback: Rc<dyn Fn(&mut Node)>,
}

impl MutationObserver {
    /// Create an observer from a callback
    pub fn new(callback: impl Fn(&mut Node) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    fn notify(&self, node: &mut Node) {
        (self.callback)(node);
    }
}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MutationObserver")
    }
}

/// A node in the DOM tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Node type and data
    pub node_type: NodeType,
    /// Child nodes
    pub children: Vec<Node>,
    observer: Option<MutationObserver>,
}

impl Node {
    /// Create a new node
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            children: Vec::new(),
            observer: None,
        }
    }

    /// Create an element node
    pub fn element(tag_name: impl Into<String>) -> Self {
        Self::new(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Create a text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeType::Text(content.into()))
    }

    /// Wrap this node in a shared handle
    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Builder-style attribute setter for element nodes
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        if let Some(element) = self.as_element_mut() {
            element.set_attribute(name, value);
        }
        self
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Get mutable element data if this is an element
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Tag name of an element node
    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.tag_name.as_str())
    }

    /// Check whether this is an element with the given tag
    pub fn is_tag(&self, tag_name: &str) -> bool {
        self.tag_name()
            .is_some_and(|tag| tag.eq_ignore_ascii_case(tag_name))
    }

    /// Attribute lookup on an element node
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.as_element().and_then(|e| e.get_attribute(name))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        match &self.node_type {
            NodeType::Text(content) => out.push_str(content),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Replace all children with a single text node (or none for empty text)
    /// and fire a pending mutation observer.
    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.replace_text(text.into());
        if let Some(observer) = self.observer.take() {
            observer.notify(self);
        }
    }

    /// Replace text without notifying observers
    pub(crate) fn replace_text(&mut self, text: String) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::text(text));
        }
    }

    /// Install a one-shot content observer, replacing any previous one
    pub fn observe(&mut self, observer: MutationObserver) {
        self.observer = Some(observer);
    }

    /// Check whether a content observer is still connected
    pub fn is_observed(&self) -> bool {
        self.observer.is_some()
    }

    /// Depth-first search for the first element with the given tag
    pub fn find_element(&self, tag_name: &str) -> Option<&Node> {
        if self.is_tag(tag_name) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_element(tag_name))
    }

    /// Mutable variant of [`Node::find_element`]
    pub fn find_element_mut(&mut self, tag_name: &str) -> Option<&mut Node> {
        if self.is_tag(tag_name) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_element_mut(tag_name))
    }

    /// Serialize this node (and its subtree) as HTML
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        self.write_html(&mut html, false);
        html
    }

    /// Serialize only the children of this node
    pub fn inner_html(&self) -> String {
        let raw_text = self.is_raw_text_element();
        let mut html = String::new();
        for child in &self.children {
            child.write_html(&mut html, raw_text);
        }
        html
    }

    fn is_raw_text_element(&self) -> bool {
        self.is_tag("script") || self.is_tag("style")
    }

    fn write_html(&self, out: &mut String, raw_text: bool) {
        match &self.node_type {
            NodeType::Document => {
                for child in &self.children {
                    child.write_html(out, false);
                }
            }
            NodeType::Text(text) if raw_text => out.push_str(text),
            NodeType::Text(text) => escape_into(out, text, false),
            NodeType::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeType::Element(element) => {
                out.push('<');
                out.push_str(&element.tag_name);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(out, value, true);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag_name.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html());
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// The DOM document
#[derive(Debug, Clone)]
pub struct Document {
    /// Root node
    pub root: Node,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self {
            root: Node::new(NodeType::Document),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
