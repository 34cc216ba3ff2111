use std::collections::HashMap;
use std::fmt;

/// Element tags the serializer distinguishes. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Variables,
    Variable,
    Block,
    Shadow,
    Field,
    Value,
    Statement,
    Next,
    Other(String),
}

impl Tag {
    /// Map an element name onto a tag. The live editor DOM reports tag
    /// names uppercased while exported XML carries them lowercased, so
    /// the match is case-insensitive.
    pub fn from_name(name: &str) -> Tag {
        match name.to_ascii_lowercase().as_str() {
            "variables" => Tag::Variables,
            "variable" => Tag::Variable,
            "block" => Tag::Block,
            "shadow" => Tag::Shadow,
            "field" => Tag::Field,
            "value" => Tag::Value,
            "statement" => Tag::Statement,
            "next" => Tag::Next,
            other => Tag::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Variables => "variables",
            Tag::Variable => "variable",
            Tag::Block => "block",
            Tag::Shadow => "shadow",
            Tag::Field => "field",
            Tag::Value => "value",
            Tag::Statement => "statement",
            Tag::Next => "next",
            Tag::Other(name) => name,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single node of the input tree: a tag, ordered children, attribute
/// lookup and the character data directly inside the element.
///
/// This is the representation-agnostic boundary of the serializer.
/// Adapters (see [`crate::xml`]) build it from whatever surface the
/// program came from; the serializer only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<Node>,
    pub text: String,
}

impl Node {
    pub fn new(tag: Tag) -> Node {
        Node {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Node {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Node {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Node) -> Node {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }
}
