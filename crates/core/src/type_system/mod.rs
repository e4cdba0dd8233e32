//! The registry every compilation works against.
//!
//! A [`TypeSystem`] owns the symbol arena, the global scope with its
//! built-ins, the list of linked module scopes and the registry of
//! synthesized structural types. One instance is created per compilation
//! and shared by reference; nothing here is process-global.

pub mod checks;

use crate::error::{CompileError, Result};
use crate::natives::{self, ArrayBackend};
use crate::symbol::{ClassFlavor, Structural, SymbolId, SymbolKind, SymbolNode, SymbolTable};
use crate::types::{FuncSignature, TupleType, Type, TypeName, TypeRef, is_compound_type};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

pub use checks::TypedNode;

/// Function-type suffix of a parsed type, e.g. `int[]^(ref a, b)`.
#[derive(Debug, Clone, Default)]
pub struct ParsedFnArgs {
    pub ret_is_array: bool,
    pub args: Vec<ParsedArg>,
}

#[derive(Debug, Clone)]
pub struct ParsedArg {
    pub name: String,
    pub is_ref: bool,
}

pub struct TypeSystem {
    symbols: SymbolTable,
    globals: SymbolId,
    links: RwLock<Vec<SymbolId>>,
    /// Synthesized array and map classes by type name.
    structural: DashMap<String, SymbolId>,
    /// Specialized array storage by item type name.
    array_backends: DashMap<String, Arc<dyn ArrayBackend>>,
}

impl std::fmt::Debug for TypeSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSystem")
            .field("symbols", &self.symbols.len())
            .field("globals", &self.globals)
            .field("structural", &self.structural.len())
            .finish()
    }
}

impl TypeSystem {
    /// Creates a type system with built-in types, built-in functions, the
    /// generic array prototype and the primitive array specializations.
    pub fn new() -> Result<Self> {
        let symbols = SymbolTable::new();
        let globals = symbols.alloc(SymbolNode::new("$global", SymbolKind::Global));
        let ts = Self {
            symbols,
            globals,
            links: RwLock::new(Vec::new()),
            structural: DashMap::new(),
            array_backends: DashMap::new(),
        };
        natives::builtins::install(&ts)?;
        natives::array::install_specializations(&ts)?;
        info!(symbols = ts.symbols.len(), "type system initialized");
        Ok(ts)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn globals(&self) -> SymbolId {
        self.globals
    }

    /// Snapshot of one symbol.
    pub fn symbol(&self, id: SymbolId) -> Result<SymbolNode> {
        self.symbols.get(id)
    }

    /// Makes the members of `scope` visible from the global scope without
    /// merging them. Linking the same scope twice is a no-op.
    pub fn link(&self, scope: SymbolId) -> Result<()> {
        let mut links = self
            .links
            .write()
            .map_err(|_| CompileError::Internal("links lock poisoned".to_string()))?;
        if !links.contains(&scope) {
            links.push(scope);
            debug!(scope = %scope, total = links.len(), "scope linked");
        }
        Ok(())
    }

    pub fn links(&self) -> Result<Vec<SymbolId>> {
        self.links
            .read()
            .map(|l| l.clone())
            .map_err(|_| CompileError::Internal("links lock poisoned".to_string()))
    }

    /// Resolves `name` from the global scope, then the linked scopes.
    pub fn resolve(&self, name: &str) -> Result<Option<SymbolId>> {
        self.resolve_in(self.globals, name)
    }

    pub(crate) fn resolve_type_name(&self, name: &str) -> Result<Type> {
        if let Some(id) = self.resolve(name)? {
            return self.type_of_symbol(id);
        }
        let structural = self.structural.get(name).map(|e| *e.value());
        match structural {
            Some(id) => Ok(Type::Class(id)),
            None => Err(CompileError::UnresolvedSymbol {
                at: crate::location::describe(None, name),
                name: name.to_string(),
            }),
        }
    }

    /// The type a type-declaring symbol stands for.
    pub fn type_of_symbol(&self, id: SymbolId) -> Result<Type> {
        self.symbols.read(id, |n| match &n.kind {
            SymbolKind::BuiltIn(b) => Ok(Type::BuiltIn(*b)),
            SymbolKind::Class(_) => Ok(Type::Class(id)),
            SymbolKind::Enum => Ok(Type::Enum(id)),
            _ => Err(CompileError::NotAType(n.name.clone())),
        })?
    }

    /// The type an expression naming `id` evaluates to.
    pub fn symbol_type(&self, id: SymbolId) -> Result<Type> {
        let (is_func, tr) = self
            .symbols
            .read(id, |n| (matches!(n.kind, SymbolKind::Func(_)), n.type_ref.clone()))?;
        if is_func {
            return self.func_type(id);
        }
        match tr {
            Some(tr) => tr.get(self),
            None => self.type_of_symbol(id),
        }
    }

    pub fn type_name(&self, ty: &Type) -> Result<String> {
        match ty {
            Type::BuiltIn(b) => Ok(b.name().to_string()),
            Type::Class(id) | Type::Enum(id) => self.name_of(*id),
            Type::Func(sig) => Ok(sig.name().to_string()),
            Type::Tuple(tuple) => Ok(tuple.name().to_string()),
        }
    }

    /// A reference to a simple type name, resolved on first use.
    pub fn type_ref(&self, tn: impl Into<TypeName>) -> Result<TypeRef> {
        match tn.into() {
            TypeName::Ref(tr) => Ok(tr),
            TypeName::Name(name) => {
                if name.is_empty() || is_compound_type(&name) {
                    return Err(CompileError::MalformedTypeName(name));
                }
                Ok(TypeRef::named(&name))
            }
        }
    }

    pub fn type_ref_of(&self, ty: Type) -> Result<TypeRef> {
        Ok(TypeRef::resolved(self.type_name(&ty)?, ty))
    }

    /// Array of `item`, named `item[]`.
    ///
    /// Uses the specialization registered for the item type if any, the
    /// generic list-backed layout otherwise. Either way one class exists per
    /// item type, however many threads ask for it.
    pub fn type_arr(&self, item: impl Into<TypeName>) -> Result<TypeRef> {
        let item = self.type_ref(item)?;
        let name = format!("{}[]", item.name());
        let id = match self.structural.entry(name.clone()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(slot) => {
                let backend = self.array_backends.get(item.name()).map(|b| b.value().clone());
                let id = self.build_array_class(&name, &item, backend)?;
                slot.insert(id);
                id
            }
        };
        Ok(TypeRef::resolved(name, Type::Class(id)))
    }

    /// Registers specialized storage for arrays of `item`.
    pub fn register_array_type(&self, item: impl Into<TypeName>, backend: Arc<dyn ArrayBackend>) -> Result<TypeRef> {
        let item = self.type_ref(item)?;
        let name = format!("{}[]", item.name());
        match self.structural.entry(name.clone()) {
            Entry::Occupied(_) => Err(CompileError::DuplicateSymbol {
                at: crate::location::describe(None, &name),
                name,
            }),
            Entry::Vacant(slot) => {
                self.array_backends.insert(item.name().to_string(), backend.clone());
                let id = self.build_array_class(&name, &item, Some(backend))?;
                slot.insert(id);
                Ok(TypeRef::resolved(name, Type::Class(id)))
            }
        }
    }

    pub(crate) fn build_array_class(
        &self,
        name: &str,
        item: &TypeRef,
        backend: Option<Arc<dyn ArrayBackend>>,
    ) -> Result<SymbolId> {
        let generic = backend.is_none();
        let backend = backend.unwrap_or_else(|| Arc::new(natives::GenericArray));
        let class = self.new_class(name, None, ClassFlavor::Native, None)?;
        self.symbols.write(class, |n| {
            if let SymbolKind::Class(info) = &mut n.kind {
                info.structural = Some(Structural::Array {
                    item: item.clone(),
                    generic,
                });
            }
        })?;
        natives::array::install_members(self, class, item, backend)?;
        debug!(array = name, generic, "array type synthesized");
        Ok(class)
    }

    /// Map from `key` to `value`, named `[key]value`.
    pub fn type_map(&self, key: impl Into<TypeName>, value: impl Into<TypeName>) -> Result<TypeRef> {
        let key = self.type_ref(key)?;
        let value = self.type_ref(value)?;
        let name = format!("[{}]{}", key.name(), value.name());
        let id = match self.structural.entry(name.clone()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(slot) => {
                let class = self.new_class(&name, None, ClassFlavor::Native, None)?;
                self.symbols.write(class, |n| {
                    if let SymbolKind::Class(info) = &mut n.kind {
                        info.structural = Some(Structural::Map {
                            key: key.clone(),
                            value: value.clone(),
                        });
                    }
                })?;
                natives::map::install_members(self, class, &key, &value)?;
                debug!(map = %name, "map type synthesized");
                slot.insert(class);
                class
            }
        };
        Ok(TypeRef::resolved(name, Type::Class(id)))
    }

    pub fn type_func(&self, ret: impl Into<TypeName>, args: Vec<TypeName>) -> Result<TypeRef> {
        let mut sig = FuncSignature::new(self.type_ref(ret)?);
        for arg in args {
            sig.add_arg(self.type_ref(arg)?);
        }
        self.type_ref_of(Type::Func(Arc::new(sig)))
    }

    pub fn type_tuple(&self, items: Vec<TypeName>) -> Result<TypeRef> {
        let mut tuple = TupleType::default();
        for item in items {
            tuple.add(self.type_ref(item)?);
        }
        self.type_ref_of(Type::Tuple(Arc::new(tuple)))
    }

    /// Declared return type of a function: `void`, the single type, or a
    /// tuple of several.
    pub fn type_from_returns(&self, returns: &[TypeRef]) -> Result<TypeRef> {
        match returns {
            [] => self.type_ref("void"),
            [single] => Ok(single.clone()),
            many => self.type_ref_of(Type::Tuple(Arc::new(TupleType::new(many.to_vec())))),
        }
    }

    /// Builds the type of a parsed type expression: a plain or function type
    /// name, optionally followed by an array suffix.
    pub fn type_from_parts(&self, name: &str, is_array: bool, fn_args: Option<&ParsedFnArgs>) -> Result<TypeRef> {
        let mut tr = match fn_args {
            Some(fn_args) => {
                let mut ret = self.type_ref(name)?;
                if fn_args.ret_is_array {
                    ret = self.type_arr(ret)?;
                }
                let mut args = Vec::with_capacity(fn_args.args.len());
                for arg in &fn_args.args {
                    args.push(self.type_ref(arg.name.as_str())?.with_ref(arg.is_ref));
                }
                self.type_ref_of(Type::Func(Arc::new(FuncSignature::with_args(ret, args))))?
            }
            None => self.type_ref(name)?,
        };
        if is_array {
            tr = self.type_arr(tr)?;
        }
        Ok(tr)
    }
}
