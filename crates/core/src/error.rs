use bhl_runtime::RuntimeError;
use thiserror::Error;

/// First-fault error raised while building or checking the symbol tree.
///
/// Semantic variants carry `at`: the `file:line:column` of the offending
/// declaration or expression, or `name(?)` for native symbols.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{at}: already defined symbol '{name}'")]
    DuplicateSymbol { at: String, name: String },
    #[error("{at}: symbol '{name}' not resolved")]
    UnresolvedSymbol { at: String, name: String },
    #[error("{at}: {detail}")]
    IncompatibleTypes { at: String, detail: String },
    #[error("{at}: {reason}")]
    InvalidOperatorOverload { at: String, reason: String },
    #[error("bad type name: '{0}'")]
    MalformedTypeName(String),
    #[error("{at}: enum '{owner}' already has an item named '{name}'")]
    DuplicateEnumKey {
        at: String,
        owner: String,
        name: String,
    },
    #[error("{at}: enum '{owner}' already has an item with value {value}")]
    DuplicateEnumValue {
        at: String,
        owner: String,
        value: i32,
    },
    #[error("{at}: defining symbols in '{scope}' is not allowed")]
    DefineNotAllowed { at: String, scope: String },
    #[error("'{0}' does not name a type")]
    NotAType(String),
    #[error("unknown symbol id {0}")]
    DanglingSymbol(u32),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub(crate) fn incompatible(at: impl Into<String>, detail: impl Into<String>) -> Self {
        CompileError::IncompatibleTypes {
            at: at.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
