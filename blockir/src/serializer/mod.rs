pub mod argument;
pub mod error;

pub use argument::{ArgumentShape, classify};
pub use error::{Diagnostic, DiagnosticKind, SerializeError};

use crate::Program;
use crate::block::{Argument, Block, Chain};
use crate::tree::{Node, Tag};
use crate::variable::{self, Lookup, ValueType, Variable};

/// How to treat recoverable diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Collect diagnostics and keep going (the editor's behavior).
    #[default]
    Lenient,
    /// Perform the full traversal, then reject if any error-severity
    /// diagnostic accumulated. Warnings never reject.
    Strict,
}

/// The result of a successful serialization.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Serializer entry point. Holds only configuration, so one instance can
/// serialize any number of independent trees.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    mode: Mode,
}

impl Serializer {
    pub fn new(mode: Mode) -> Self {
        Serializer { mode }
    }

    pub fn lenient() -> Self {
        Serializer::new(Mode::Lenient)
    }

    pub fn strict() -> Self {
        Serializer::new(Mode::Strict)
    }

    /// Serialize a rooted tree into a [`Program`] document.
    ///
    /// The root's first child must be the variable container; every
    /// remaining child is the head of a top-level chain. The input is
    /// never mutated, so the same tree serializes to the same document
    /// every time.
    pub fn serialize(&self, root: &Node) -> Result<Outcome, SerializeError> {
        let mut walk = Walk {
            diagnostics: Vec::new(),
        };

        let mut children = root.children.iter();
        let container = children
            .next()
            .ok_or(SerializeError::MissingVariableContainer)?;
        if container.tag != Tag::Variables {
            return Err(SerializeError::MissingVariableContainer);
        }

        let variables = walk.serialize_variables(container);

        let mut blocks = Vec::new();
        for top in children {
            if top.tag != Tag::Block {
                return Err(SerializeError::UnexpectedTopLevel {
                    tag: top.tag.name().to_string(),
                });
            }
            blocks.push(walk.serialize_chain(top)?);
        }

        if self.mode == Mode::Strict && walk.diagnostics.iter().any(|d| !d.is_warning()) {
            return Err(SerializeError::Rejected(walk.diagnostics));
        }

        Ok(Outcome {
            program: Program { variables, blocks },
            diagnostics: walk.diagnostics,
        })
    }
}

struct Walk {
    diagnostics: Vec<Diagnostic>,
}

impl Walk {
    /// Walk a NEXT-linked chain iteratively, flattening it into a single
    /// ordered run. Chain length never deepens the stack; only statement
    /// bodies and block arguments recurse.
    fn serialize_chain(&mut self, head: &Node) -> Result<Chain, SerializeError> {
        let mut chain = Chain::new();
        let mut current = Some(head);
        while let Some(node) = current {
            current = self.serialize_block(node, &mut chain)?;
        }
        Ok(chain)
    }

    /// Serialize one block into `chain`, returning the node its NEXT
    /// link points at, if any.
    fn serialize_block<'t>(
        &mut self,
        node: &'t Node,
        chain: &mut Chain,
    ) -> Result<Option<&'t Node>, SerializeError> {
        let id = node.attr("id").unwrap_or_default().to_string();
        let block_type = node
            .attr("type")
            .ok_or_else(|| SerializeError::BlockWithoutType { id: id.clone() })?
            .to_string();

        let mut args = Vec::new();
        let mut statement = None;
        let mut next = None;
        for child in &node.children {
            match child.tag {
                Tag::Statement => {
                    if statement.is_some() {
                        self.duplicate_link("statement", &id);
                    } else {
                        statement = Some(child);
                    }
                }
                Tag::Next => {
                    if next.is_some() {
                        self.duplicate_link("next", &id);
                    } else {
                        next = Some(child);
                    }
                }
                _ => args.push(self.serialize_argument(child, &id)?),
            }
        }

        let contents = match statement {
            Some(link) => self.serialize_chain(linked_block(link, "statement", &id)?)?,
            None => Chain::new(),
        };

        chain.push(Block {
            id: id.clone(),
            block_type,
            args,
            contents,
        });

        match next {
            Some(link) => Ok(Some(linked_block(link, "next", &id)?)),
            None => Ok(None),
        }
    }

    fn serialize_argument(&mut self, node: &Node, block: &str) -> Result<Argument, SerializeError> {
        match classify(node) {
            ArgumentShape::Field(field) => {
                let name = field
                    .attr("name")
                    .ok_or_else(|| SerializeError::MissingFieldName {
                        block: block.to_string(),
                    })?;
                Ok(Argument::field(name, field.text.clone()))
            }
            ArgumentShape::NestedBlock(head) => Ok(Argument::block(self.serialize_chain(head)?)),
            ArgumentShape::ShadowConstant(shadow) => {
                let text = constant_text(shadow.first_child(), block)?;
                Ok(Argument::constant(text))
            }
            ArgumentShape::Malformed => {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::MalformedArgument,
                        format!("unexpected argument shape `{}`", node.tag),
                    )
                    .on_block(block)
                    .with_note("defaulting to constant"),
                );
                let text = constant_text(node.first_child().and_then(Node::first_child), block)?;
                Ok(Argument::constant(text))
            }
        }
    }

    fn serialize_variables(&mut self, container: &Node) -> Vec<Variable> {
        container
            .children
            .iter()
            .map(|node| self.serialize_variable(node))
            .collect()
    }

    fn serialize_variable(&mut self, node: &Node) -> Variable {
        let id = node.attr("id").unwrap_or_default().to_string();
        let name = node.text.clone();
        let value_type = match node.attr("type") {
            None => {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MissingTypeAnnotation,
                    format!("no type set on variable `{}`", name),
                ));
                ValueType::Any
            }
            Some(raw) => match variable::lookup(raw) {
                Lookup::Known(value_type) => value_type,
                Lookup::Unsupported => ValueType::Any,
                Lookup::Unknown => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnknownType,
                        format!("unknown type `{}` on variable `{}`", raw, name),
                    ));
                    ValueType::Any
                }
            },
        };
        Variable {
            id,
            name,
            value_type,
        }
    }

    fn duplicate_link(&mut self, link: &str, block: &str) {
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::DuplicateLink,
                format!("more than one {} link", link),
            )
            .on_block(block)
            .with_note("ignoring all but the first"),
        );
    }
}

/// Resolve the block a STATEMENT/NEXT wrapper points at.
fn linked_block<'t>(
    link: &'t Node,
    kind: &'static str,
    block: &str,
) -> Result<&'t Node, SerializeError> {
    link.first_child()
        .filter(|node| node.tag == Tag::Block)
        .ok_or_else(|| SerializeError::DanglingLink {
            link: kind,
            block: block.to_string(),
        })
}

/// Extract the inline text a constant argument falls back to. `inner` is
/// the element directly wrapping the text, typically the field inside a
/// shadow. Its absence is the one unrecoverable argument shape.
fn constant_text(inner: Option<&Node>, block: &str) -> Result<String, SerializeError> {
    inner
        .map(|node| node.text.clone())
        .ok_or_else(|| SerializeError::MalformedArgument {
            block: block.to_string(),
        })
}
