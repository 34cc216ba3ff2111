use std::fmt;

use codespan_reporting::diagnostic::{self, Severity};

/// Recoverable conditions found during serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An argument node matched none of the recognized shapes.
    MalformedArgument,
    /// A variable carried no type annotation.
    MissingTypeAnnotation,
    /// A type annotation outside the recognized vocabulary.
    UnknownType,
    /// More than one STATEMENT or NEXT child on a single block.
    DuplicateLink,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::MalformedArgument | DiagnosticKind::UnknownType => Severity::Error,
            DiagnosticKind::MissingTypeAnnotation | DiagnosticKind::DuplicateLink => {
                Severity::Warning
            }
        }
    }
}

/// A diagnostic accumulated while serializing. The input tree carries no
/// source spans, so context is the id of the nearest enclosing block.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub block: Option<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            block: None,
            notes: Vec::new(),
        }
    }

    pub fn on_block(mut self, id: impl Into<String>) -> Self {
        self.block = Some(id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display. The tree
    /// has no byte spans, so the diagnostic carries no labels.
    pub fn to_diagnostic(&self) -> diagnostic::Diagnostic<usize> {
        let mut notes = self.notes.clone();
        if let Some(block) = &self.block {
            notes.push(format!("on block `{}`", block));
        }
        diagnostic::Diagnostic::new(self.severity())
            .with_message(&self.message)
            .with_notes(notes)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(block) = &self.block {
            write!(f, " (block {})", block)?;
        }
        Ok(())
    }
}

/// Fatal precondition violations. These abort the whole `serialize`
/// call; there is no partial output across them.
#[derive(Debug, Clone)]
pub enum SerializeError {
    /// The root has no children, or its first child is not a variable
    /// container.
    MissingVariableContainer,
    /// A top-level child of the root is not a block.
    UnexpectedTopLevel { tag: String },
    /// A block element with no `type` attribute.
    BlockWithoutType { id: String },
    /// A FIELD argument with no `name` attribute.
    MissingFieldName { block: String },
    /// A STATEMENT or NEXT wrapper with no nested block.
    DanglingLink {
        link: &'static str,
        block: String,
    },
    /// A malformed argument with nothing to coerce into a constant.
    MalformedArgument { block: String },
    /// Strict mode only: error-severity diagnostics were produced.
    Rejected(Vec<Diagnostic>),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::MissingVariableContainer => {
                write!(f, "missing variable container at the head of the tree")
            }
            SerializeError::UnexpectedTopLevel { tag } => {
                write!(f, "unexpected top-level element `{}`, expected a block", tag)
            }
            SerializeError::BlockWithoutType { id } => {
                write!(f, "block `{}` has no type attribute", id)
            }
            SerializeError::MissingFieldName { block } => {
                write!(f, "field argument on block `{}` has no name attribute", block)
            }
            SerializeError::DanglingLink { link, block } => {
                write!(f, "{} link on block `{}` has no nested block", link, block)
            }
            SerializeError::MalformedArgument { block } => {
                write!(
                    f,
                    "malformed argument on block `{}`: no constant value to fall back to",
                    block
                )
            }
            SerializeError::Rejected(diagnostics) => {
                let errors = diagnostics.iter().filter(|d| !d.is_warning()).count();
                write!(f, "serialization rejected: {} error diagnostic(s)", errors)
            }
        }
    }
}

impl std::error::Error for SerializeError {}
