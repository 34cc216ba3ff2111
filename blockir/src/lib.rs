pub mod block;
pub mod serializer;
pub mod tree;
pub mod variable;
pub mod xml;

use serde::Serialize;

use crate::block::Chain;
use crate::variable::Variable;

/// A serialized visual program: the JSON intermediate representation
/// handed to downstream execution and persistence layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    /// Workspace variables, in declaration order.
    pub variables: Vec<Variable>,
    /// One chain per top-level block in the workspace, in source order.
    pub blocks: Vec<Chain>,
}
