//! HTML5 parser implementation using html5ever

use super::dom::{Document, ElementData, Node, NodeType};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// HTML5 parser using html5ever
pub struct HtmlParser {
    opts: ParseOpts,
}

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self {
            opts: ParseOpts {
                tree_builder: TreeBuilderOpts {
                    drop_doctype: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    /// Parse HTML content into a DOM document
    pub fn parse(&self, content: &str) -> Document {
        let mut document = Document::new();
        if content.trim().is_empty() {
            return document;
        }

        let dom = parse_document(RcDom::default(), self.opts.clone()).one(content);
        for child in dom.document.children.borrow().iter() {
            if let Some(node) = convert_node(child) {
                document.root.add_child(node);
            }
        }

        document
    }

    /// Parse an application document into a detached fragment.
    ///
    /// The document's `<head>` and `<body>` are renamed to `head_tag` and
    /// `body_tag` so that inserting the fragment into a host page never
    /// creates a second head or body. The returned root is a `div` wrapper.
    pub fn parse_fragment(&self, content: &str, head_tag: &str, body_tag: &str) -> Node {
        let document = self.parse(content);
        let mut fragment = Node::element("div");

        let mut top_level = document.root.children;
        let html_index = top_level.iter().position(|n| n.is_tag("html"));
        let children = match html_index {
            Some(index) => top_level.swap_remove(index).children,
            None => top_level,
        };

        for mut child in children {
            if let Some(element) = child.as_element_mut() {
                if element.tag_name.eq_ignore_ascii_case("head") {
                    element.tag_name = head_tag.to_string();
                } else if element.tag_name.eq_ignore_ascii_case("body") {
                    element.tag_name = body_tag.to_string();
                }
            }
            fragment.add_child(child);
        }

        fragment
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_node(handle: &Handle) -> Option<Node> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut elem_data = ElementData::new(name.local.to_string());
            for attr in attrs.borrow().iter() {
                elem_data.set_attribute(attr.name.local.to_string(), attr.value.to_string());
            }
            let mut node = Node::new(NodeType::Element(elem_data));
            for child in handle.children.borrow().iter() {
                if let Some(child) = convert_node(child) {
                    node.add_child(child);
                }
            }
            Some(node)
        }
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if text.trim().is_empty() {
                None
            } else {
                Some(Node::text(text))
            }
        }
        NodeData::Comment { contents } => Some(Node::new(NodeType::Comment(contents.to_string()))),
        NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {
            None
        }
    }
}
