use std::fmt;
use std::io::Cursor;

use xmltree::{Element, XMLNode};

use crate::tree::{Node, Tag};

/// Failure to read workspace XML.
#[derive(Debug)]
pub struct XmlError(xmltree::ParseError);

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid workspace xml: {}", self.0)
    }
}

impl std::error::Error for XmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Parse exported workspace XML into the serializer's input tree.
///
/// Element names map onto tags case-insensitively, attributes are copied
/// as-is, and text/CDATA children are concatenated into each node's
/// inline text. Comments and processing instructions are dropped.
pub fn parse(source: &str) -> Result<Node, XmlError> {
    let element = Element::parse(Cursor::new(source.as_bytes())).map_err(XmlError)?;
    Ok(convert(&element))
}

fn convert(element: &Element) -> Node {
    let mut node = Node::new(Tag::from_name(&element.name));
    for (name, value) in &element.attributes {
        node.attributes.insert(name.clone(), value.clone());
    }
    for child in &element.children {
        match child {
            XMLNode::Element(inner) => node.children.push(convert(inner)),
            XMLNode::Text(text) | XMLNode::CData(text) => node.text.push_str(text),
            _ => {}
        }
    }
    node
}
