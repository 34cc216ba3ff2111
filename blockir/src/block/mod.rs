use serde::Serialize;

/// A flat ordered run of blocks linked by NEXT edges. Nesting never
/// appears here; statement bodies hang off each block's `contents`.
pub type Chain = Vec<Block>;

/// One serialized block record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    /// Positional inputs, in source order.
    pub args: Vec<Argument>,
    /// The nested STATEMENT chain; empty when the block has no body.
    pub contents: Chain,
}

/// A positional block input. `kind` is the lowercased field name for
/// field arguments, `"block"` for plugged blocks and `"constant"` for
/// shadow defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: ArgumentValue,
}

impl Argument {
    pub fn field(name: &str, value: impl Into<String>) -> Argument {
        Argument {
            kind: name.to_lowercase(),
            value: ArgumentValue::Text(value.into()),
        }
    }

    pub fn constant(value: impl Into<String>) -> Argument {
        Argument {
            kind: "constant".to_string(),
            value: ArgumentValue::Text(value.into()),
        }
    }

    pub fn block(chain: Chain) -> Argument {
        Argument {
            kind: "block".to_string(),
            value: ArgumentValue::Blocks(chain),
        }
    }
}

/// Field and constant arguments carry text; block arguments carry the
/// serialized chain that produces their value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Text(String),
    Blocks(Chain),
}
