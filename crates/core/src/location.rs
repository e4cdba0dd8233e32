use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a declaration or expression sits in its source file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Formats an optional location the way diagnostics expect it, falling
/// back to `name(?)` for symbols that have no source (natives, built-ins).
pub fn describe(location: Option<&SourceLocation>, name: &str) -> String {
    match location {
        Some(loc) => loc.to_string(),
        None => format!("{name}(?)"),
    }
}
