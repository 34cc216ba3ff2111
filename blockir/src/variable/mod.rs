use std::fmt;

use serde::Serialize;

/// A workspace variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

/// Normalized value types carried by variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Any,
    String,
    Boolean,
    Integer,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a raw `type` annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Known(ValueType),
    /// Recognized but not supported by the execution side; downgrades
    /// to `any` without a diagnostic.
    Unsupported,
    Unknown,
}

/// Resolve a raw annotation the way the toolbox resolves port types.
/// The empty string means explicitly untyped.
pub fn lookup(raw: &str) -> Lookup {
    match raw {
        "" => Lookup::Known(ValueType::Any),
        "string" => Lookup::Known(ValueType::String),
        "boolean" => Lookup::Known(ValueType::Boolean),
        "integer" => Lookup::Known(ValueType::Integer),
        "float" | "number" => Lookup::Unsupported,
        _ => Lookup::Unknown,
    }
}
