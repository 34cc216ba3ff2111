use crate::tree::{Node, Tag};

/// The recognized argument shapes. Classification inspects a node's
/// structure exactly once; the serializer then branches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgumentShape<'a> {
    /// A FIELD element: a named inline value.
    Field(&'a Node),
    /// A wrapper whose second child is a block. The block's result is
    /// the argument value; the first child is the displaced shadow.
    NestedBlock(&'a Node),
    /// A wrapper holding a single shadow whose inner text is a constant.
    ShadowConstant(&'a Node),
    /// Anything else. Best-effort constant coercion still applies.
    Malformed,
}

pub fn classify(node: &Node) -> ArgumentShape<'_> {
    if node.tag == Tag::Field {
        return ArgumentShape::Field(node);
    }
    if node.children.len() > 1 && node.children[1].tag == Tag::Block {
        return ArgumentShape::NestedBlock(&node.children[1]);
    }
    if node.children.len() == 1 {
        return ArgumentShape::ShadowConstant(&node.children[0]);
    }
    ArgumentShape::Malformed
}
