//! Fixed compatibility tables keyed by `(lhs, rhs)` built-in pairs.

use super::{BuiltIn as B, Type};

pub type Table = &'static [(B, B, B)];

/// Result type of arithmetic operators.
pub const BIN_OP_RESULT: Table = &[
    (B::String, B::String, B::String),
    (B::Int, B::Int, B::Int),
    (B::Int, B::Float, B::Float),
    (B::Float, B::Float, B::Float),
    (B::Float, B::Int, B::Float),
];

/// Result type of relational operators.
pub const RTL_OP_RESULT: Table = &[
    (B::String, B::String, B::Bool),
    (B::Int, B::Int, B::Bool),
    (B::Int, B::Float, B::Bool),
    (B::Float, B::Float, B::Bool),
    (B::Float, B::Int, B::Bool),
];

/// Result type of equality operators.
pub const EQ_OP_RESULT: Table = &[
    (B::String, B::String, B::Bool),
    (B::Int, B::Int, B::Bool),
    (B::Int, B::Float, B::Bool),
    (B::Float, B::Float, B::Bool),
    (B::Float, B::Int, B::Bool),
    (B::Any, B::Any, B::Bool),
    (B::Null, B::Any, B::Bool),
    (B::Any, B::Null, B::Bool),
];

/// Implicit widening, `(from, to)`.
pub const PROMOTE_FROM_TO: Table = &[(B::Int, B::Float, B::Float)];

/// Explicit conversions, `(from, to)`.
pub const CAST_FROM_TO: Table = &[
    (B::Bool, B::String, B::String),
    (B::Bool, B::Int, B::Int),
    (B::Bool, B::Float, B::Float),
    (B::Bool, B::Any, B::Any),
    (B::String, B::String, B::String),
    (B::String, B::Any, B::Any),
    (B::Int, B::Bool, B::Bool),
    (B::Int, B::String, B::String),
    (B::Int, B::Int, B::Int),
    (B::Int, B::Float, B::Float),
    (B::Int, B::Any, B::Any),
    (B::Float, B::Bool, B::Bool),
    (B::Float, B::String, B::String),
    (B::Float, B::Int, B::Int),
    (B::Float, B::Float, B::Float),
    (B::Float, B::Any, B::Any),
    (B::Any, B::Bool, B::Bool),
    (B::Any, B::String, B::String),
    (B::Any, B::Int, B::Int),
    (B::Any, B::Float, B::Float),
    (B::Any, B::Any, B::Any),
];

/// Looks up `(lhs, rhs)`; only built-in pairs can match.
pub fn lookup(table: Table, lhs: &Type, rhs: &Type) -> Option<Type> {
    let (l, r) = (lhs.as_builtin()?, rhs.as_builtin()?);
    table
        .iter()
        .find(|(a, b, _)| *a == l && *b == r)
        .map(|(_, _, res)| Type::BuiltIn(*res))
}
