//! Type values and deferred type references.

pub mod signature;
pub mod tables;

use crate::error::Result;
use crate::symbol::SymbolId;
use crate::type_system::TypeSystem;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub use signature::{FuncSignature, TupleType};

/// The primitive types every type system starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltIn {
    Bool,
    String,
    Int,
    Float,
    Void,
    Enum,
    Any,
    Null,
}

impl BuiltIn {
    /// Built-ins reachable by name from the global scope.
    pub const DEFINED: [BuiltIn; 6] = [
        BuiltIn::Int,
        BuiltIn::Float,
        BuiltIn::Bool,
        BuiltIn::String,
        BuiltIn::Void,
        BuiltIn::Any,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltIn::Bool => "bool",
            BuiltIn::String => "string",
            BuiltIn::Int => "int",
            BuiltIn::Float => "float",
            BuiltIn::Void => "void",
            BuiltIn::Enum => "enum",
            BuiltIn::Any => "any",
            BuiltIn::Null => "null",
        }
    }
}

/// A resolved type.
///
/// Class and enum types are identified by their declaring symbol; function
/// signatures and tuples are structural and compare by their textual name.
#[derive(Debug, Clone)]
pub enum Type {
    BuiltIn(BuiltIn),
    Class(SymbolId),
    Enum(SymbolId),
    Func(Arc<FuncSignature>),
    Tuple(Arc<TupleType>),
}

impl Type {
    pub const BOOL: Type = Type::BuiltIn(BuiltIn::Bool);
    pub const STRING: Type = Type::BuiltIn(BuiltIn::String);
    pub const INT: Type = Type::BuiltIn(BuiltIn::Int);
    pub const FLOAT: Type = Type::BuiltIn(BuiltIn::Float);
    pub const VOID: Type = Type::BuiltIn(BuiltIn::Void);
    pub const ENUM: Type = Type::BuiltIn(BuiltIn::Enum);
    pub const ANY: Type = Type::BuiltIn(BuiltIn::Any);
    pub const NULL: Type = Type::BuiltIn(BuiltIn::Null);

    pub fn as_builtin(&self) -> Option<BuiltIn> {
        match self {
            Type::BuiltIn(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<SymbolId> {
        match self {
            Type::Class(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Arc<FuncSignature>> {
        match self {
            Type::Func(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Type::Enum(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Type::Func(_))
    }

    pub fn is(&self, b: BuiltIn) -> bool {
        self.as_builtin() == Some(b)
    }

    pub fn is_numeric(&self) -> bool {
        self.is(BuiltIn::Int) || self.is(BuiltIn::Float)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::BuiltIn(a), Type::BuiltIn(b)) => a == b,
            (Type::Class(a), Type::Class(b)) => a == b,
            (Type::Enum(a), Type::Enum(b)) => a == b,
            (Type::Func(a), Type::Func(b)) => a.name() == b.name(),
            (Type::Tuple(a), Type::Tuple(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

/// A reference to a type that may not be resolvable yet.
///
/// Clones share the resolution slot, so once any clone resolves every clone
/// sees the same type. The `is_ref` flag is per clone: it marks a function
/// argument passed by reference.
#[derive(Clone)]
pub struct TypeRef {
    name: Arc<str>,
    slot: Arc<OnceCell<Type>>,
    is_ref: bool,
}

impl TypeRef {
    /// A reference resolved lazily against the type system by `name`.
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            slot: Arc::new(OnceCell::new()),
            is_ref: false,
        }
    }

    /// A reference that is already bound to `ty`.
    pub fn resolved(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(OnceCell::with_value(ty)),
            is_ref: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ref(&self) -> bool {
        self.is_ref
    }

    pub fn with_ref(&self, is_ref: bool) -> Self {
        Self {
            is_ref,
            ..self.clone()
        }
    }

    /// The bound type, if resolution already happened.
    pub fn try_get(&self) -> Option<&Type> {
        self.slot.get()
    }

    /// Resolves the referenced type, memoizing the first success.
    ///
    /// A failed lookup is not cached: the name may be declared later.
    pub fn get(&self, ts: &TypeSystem) -> Result<Type> {
        if let Some(ty) = self.slot.get() {
            return Ok(ty.clone());
        }
        let ty = ts.resolve_type_name(&self.name)?;
        Ok(self.slot.get_or_init(|| ty).clone())
    }

    /// True when both references share one resolution slot.
    pub fn same_slot(&self, other: &TypeRef) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ref {
            write!(f, "ref ")?;
        }
        write!(f, "{}", self.name)?;
        if self.slot.get().is_none() {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// Either a plain type name or an existing reference.
#[derive(Debug, Clone)]
pub enum TypeName {
    Name(String),
    Ref(TypeRef),
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::Name(name.to_string())
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName::Name(name)
    }
}

impl From<TypeRef> for TypeName {
    fn from(tr: TypeRef) -> Self {
        TypeName::Ref(tr)
    }
}

impl From<&TypeRef> for TypeName {
    fn from(tr: &TypeRef) -> Self {
        TypeName::Ref(tr.clone())
    }
}

/// True when `name` cannot name a single declared type, e.g. `int[]`.
pub fn is_compound_type(name: &str) -> bool {
    name.chars().any(|c| !(c.is_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_names() {
        assert!(!is_compound_type("Foo_1"));
        assert!(is_compound_type("int[]"));
        assert!(is_compound_type("void^()"));
        assert!(is_compound_type("a,b"));
    }

    #[test]
    fn test_ref_flag_is_per_clone() {
        let tr = TypeRef::resolved("int", Type::INT);
        let by_ref = tr.with_ref(true);
        assert!(by_ref.is_ref());
        assert!(!tr.is_ref());
        assert!(tr.same_slot(&by_ref));
        assert_eq!(format!("{by_ref:?}"), "ref int");
    }

    #[test]
    fn test_structural_types_compare_by_name() {
        let a = FuncSignature::new(TypeRef::resolved("int", Type::INT));
        let b = FuncSignature::new(TypeRef::named("int"));
        assert_eq!(Type::Func(Arc::new(a)), Type::Func(Arc::new(b)));
        assert_ne!(Type::INT, Type::FLOAT);
        assert_ne!(Type::Class(SymbolId(1)), Type::Enum(SymbolId(1)));
    }
}
