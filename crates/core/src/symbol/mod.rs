//! Declarations and the scopes that own them.
//!
//! Every symbol lives in the [`SymbolTable`] arena of its type system and is
//! addressed by a copyable [`SymbolId`]. Scopes hold a [`SymbolsDictionary`]
//! of member ids, so the same symbol can appear in several dictionaries (an
//! inherited class member, for instance) while keeping one identity.

pub mod class;
pub mod dictionary;
pub mod enums;
pub mod func;
pub mod scope;
pub mod table;

use crate::location::{SourceLocation, describe};
use crate::types::{BuiltIn, TypeRef};
use bhl_runtime::FieldAccessor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use class::{ClassCreator, ClassFlavor, ClassInfo, Structural};
pub use dictionary::SymbolsDictionary;
pub use func::{FuncFlavor, FuncInfo, LambdaInfo, UpValue};
pub use scope::BlockInfo;
pub use table::SymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
pub enum SymbolKind {
    BuiltIn(BuiltIn),
    Variable,
    FuncArg { is_ref: bool },
    /// Class field; script fields carry no accessor and are read by slot.
    Field { accessor: Option<Arc<dyn FieldAccessor>> },
    Class(ClassInfo),
    Func(FuncInfo),
    Enum,
    EnumItem { owner: SymbolId, value: i32 },
    Global,
    Module,
    Block(BlockInfo),
}

impl SymbolKind {
    /// Variables, arguments and fields: everything that can go out of scope.
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Variable | SymbolKind::FuncArg { .. } | SymbolKind::Field { .. }
        )
    }

    /// Kinds that receive a positional slot when defined.
    pub fn is_scope_indexed(&self) -> bool {
        self.is_variable() || matches!(self, SymbolKind::Func(_))
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::BuiltIn(_) | SymbolKind::Class(_) | SymbolKind::Enum
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SymbolKind::BuiltIn(_) => "builtin",
            SymbolKind::Variable => "variable",
            SymbolKind::FuncArg { .. } => "argument",
            SymbolKind::Field { .. } => "field",
            SymbolKind::Class(_) => "class",
            SymbolKind::Func(f) => f.flavor.label(),
            SymbolKind::Enum => "enum",
            SymbolKind::EnumItem { .. } => "enum item",
            SymbolKind::Global => "global",
            SymbolKind::Module => "module",
            SymbolKind::Block(_) => "block",
        }
    }
}

impl fmt::Debug for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::BuiltIn(b) => write!(f, "BuiltIn({})", b.name()),
            SymbolKind::FuncArg { is_ref } => write!(f, "FuncArg(ref={is_ref})"),
            SymbolKind::Field { accessor } => {
                write!(f, "Field(native={})", accessor.is_some())
            }
            SymbolKind::Class(info) => write!(f, "{info:?}"),
            SymbolKind::Func(info) => write!(f, "{info:?}"),
            SymbolKind::EnumItem { owner, value } => write!(f, "EnumItem({owner}={value})"),
            SymbolKind::Block(info) => write!(f, "{info:?}"),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// One declaration.
#[derive(Debug, Clone)]
pub struct SymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared type; scope-like symbols that are types themselves leave it empty.
    pub type_ref: Option<TypeRef>,
    /// Owning scope. Not rewritten when a class copies inherited members.
    pub scope: Option<SymbolId>,
    pub scope_idx: Option<usize>,
    /// Block nesting depth a variable was declared at.
    pub scope_level: u32,
    pub location: Option<SourceLocation>,
    pub out_of_scope: bool,
    pub members: SymbolsDictionary,
}

impl SymbolNode {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_ref: None,
            scope: None,
            scope_idx: None,
            scope_level: 0,
            location: None,
            out_of_scope: false,
            members: SymbolsDictionary::default(),
        }
    }

    pub fn with_type(mut self, tr: TypeRef) -> Self {
        self.type_ref = Some(tr);
        self
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// `file:line:column`, or `name(?)` for symbols without a source.
    pub fn describe_location(&self) -> String {
        describe(self.location.as_ref(), &self.name)
    }
}
