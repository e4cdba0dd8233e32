//! Class scopes: inheritance layout, instantiation and operator overloads.

use super::{SymbolId, SymbolKind, SymbolNode, SymbolsDictionary};
use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use crate::type_system::TypeSystem;
use crate::types::{BuiltIn, Type, TypeRef};
use bhl_runtime::{FieldAccessor, NativeFrame, RuntimeError, Val, value::lock};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Builds a fresh runtime instance of a class.
pub type ClassCreator = Arc<dyn Fn(&mut dyn NativeFrame) -> bhl_runtime::Result<Val> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassFlavor {
    /// Declared in script; instances are lists with one slot per member.
    Script,
    /// Provided by the host.
    Native,
}

/// Classes synthesized from their component types.
#[derive(Debug, Clone)]
pub enum Structural {
    Array { item: TypeRef, generic: bool },
    Map { key: TypeRef, value: TypeRef },
}

#[derive(Clone)]
pub struct ClassInfo {
    pub super_class: Option<SymbolId>,
    pub flavor: ClassFlavor,
    pub creator: Option<ClassCreator>,
    pub structural: Option<Structural>,
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("super_class", &self.super_class)
            .field("flavor", &self.flavor)
            .field("creator", &self.creator.is_some())
            .field("structural", &self.structural)
            .finish()
    }
}

/// Reads and writes a script field at its slot in the instance list.
struct SlotAccessor {
    idx: usize,
}

impl FieldAccessor for SlotAccessor {
    fn get(&self, ctx: &Val) -> bhl_runtime::Result<Val> {
        let slots = lock(ctx.as_list()?)?;
        slots.get(self.idx).cloned().ok_or(RuntimeError::IndexOutOfRange {
            idx: self.idx as i64,
            len: slots.len(),
        })
    }

    fn set(&self, ctx: &Val, v: Val) -> bhl_runtime::Result<()> {
        let mut slots = lock(ctx.as_list()?)?;
        let len = slots.len();
        let slot = slots.get_mut(self.idx).ok_or(RuntimeError::IndexOutOfRange {
            idx: self.idx as i64,
            len,
        })?;
        *slot = v;
        Ok(())
    }
}

/// Value a freshly created instance holds for a member of type `ty`.
pub fn default_value(ty: &Type) -> Val {
    match ty.as_builtin() {
        Some(BuiltIn::Int | BuiltIn::Float) => Val::Num(0.0),
        Some(BuiltIn::Bool) => Val::Bool(false),
        Some(BuiltIn::String) => Val::str(""),
        _ => Val::Null,
    }
}

impl TypeSystem {
    /// Creates a class, copying every member of `super_class` first so that
    /// inherited members keep their base-class slots.
    pub fn new_class(
        &self,
        name: &str,
        super_class: Option<SymbolId>,
        flavor: ClassFlavor,
        location: Option<SourceLocation>,
    ) -> Result<SymbolId> {
        let members = match super_class {
            Some(parent) => self.symbols().read(parent, |n| match n.kind {
                SymbolKind::Class(_) => Ok(n.members.clone()),
                _ => Err(CompileError::incompatible(
                    crate::location::describe(location.as_ref(), name),
                    format!("'{}' is not a class", n.name),
                )),
            })??,
            None => SymbolsDictionary::new(),
        };

        let info = ClassInfo {
            super_class,
            flavor,
            creator: None,
            structural: None,
        };
        let mut node = SymbolNode::new(name, SymbolKind::Class(info)).at(location);
        node.members = members;
        let id = self.symbols().alloc(node);
        debug!(class = name, id = %id, inherited = ?super_class, "class created");
        Ok(id)
    }

    pub fn new_native_class(
        &self,
        name: &str,
        super_class: Option<SymbolId>,
        creator: Option<ClassCreator>,
    ) -> Result<SymbolId> {
        let id = self.new_class(name, super_class, ClassFlavor::Native, None)?;
        self.set_class_creator(id, creator)?;
        Ok(id)
    }

    pub(crate) fn set_class_creator(&self, class: SymbolId, creator: Option<ClassCreator>) -> Result<()> {
        self.symbols().write(class, |n| {
            if let SymbolKind::Class(info) = &mut n.kind {
                info.creator = creator;
            }
        })
    }

    pub(crate) fn class_info(&self, class: SymbolId) -> Result<ClassInfo> {
        self.symbols()
            .read(class, |n| match &n.kind {
                SymbolKind::Class(info) => Ok(info.clone()),
                _ => Err(CompileError::NotAType(n.name.clone())),
            })?
    }

    pub fn super_class(&self, class: SymbolId) -> Result<Option<SymbolId>> {
        Ok(self.class_info(class)?.super_class)
    }

    /// True when `class` is `parent` or inherits from it.
    pub fn is_subclass_of(&self, class: SymbolId, parent: SymbolId) -> bool {
        let mut current = Some(class);
        while let Some(c) = current {
            if c == parent {
                return true;
            }
            current = self.super_class(c).ok().flatten();
        }
        false
    }

    /// Finds a member of `class` or of one of its ancestors.
    pub fn resolve_member(&self, class: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        let mut current = Some(class);
        while let Some(c) = current {
            if let Some(id) = self.symbols().read(c, |n| n.members.find(name))? {
                return Ok(Some(id));
            }
            current = self.super_class(c)?;
        }
        Ok(None)
    }

    /// Name the runtime uses to look the class up; `[]` for generic arrays.
    pub fn class_type(&self, class: SymbolId) -> Result<String> {
        match self.class_info(class)?.structural {
            Some(Structural::Array { generic: true, .. }) => Ok(crate::natives::GENERIC_ARRAY.to_string()),
            _ => self.name_of(class),
        }
    }

    pub fn new_field(&self, name: &str, tr: TypeRef, location: Option<SourceLocation>) -> SymbolId {
        let node = SymbolNode::new(name, SymbolKind::Field { accessor: None })
            .with_type(tr)
            .at(location);
        self.symbols().alloc(node)
    }

    pub fn new_native_field(&self, name: &str, tr: TypeRef, accessor: Arc<dyn FieldAccessor>) -> SymbolId {
        let node = SymbolNode::new(
            name,
            SymbolKind::Field {
                accessor: Some(accessor),
            },
        )
        .with_type(tr);
        self.symbols().alloc(node)
    }

    /// Accessor for a field: the host's for native fields, a slot accessor
    /// for script fields.
    pub fn field_accessor(&self, field: SymbolId) -> Result<Arc<dyn FieldAccessor>> {
        let (accessor, idx, name) = self.symbols().read(field, |n| match &n.kind {
            SymbolKind::Field { accessor } => Ok((accessor.clone(), n.scope_idx, n.name.clone())),
            _ => Err(CompileError::Internal(format!("'{}' is not a field", n.name))),
        })??;
        if let Some(accessor) = accessor {
            return Ok(accessor);
        }
        let idx = idx.ok_or_else(|| CompileError::Internal(format!("field '{name}' is not defined in a class")))?;
        Ok(Arc::new(SlotAccessor { idx }))
    }

    /// Creator for `class`.
    ///
    /// Script classes get one built from their current member list: fields
    /// start at the default value of their type and methods at null.
    pub fn class_creator(&self, class: SymbolId) -> Result<ClassCreator> {
        let info = self.class_info(class)?;
        if let Some(creator) = info.creator {
            return Ok(creator);
        }
        if info.flavor == ClassFlavor::Native {
            let name = self.name_of(class)?;
            return Err(RuntimeError::Unsupported(format!("class '{name}' has no creator")).into());
        }

        let members = self.members(class)?;
        let mut template = Vec::with_capacity(members.len());
        for member in members.ids() {
            let (is_var, tr) = self.symbols().read(member, |n| (n.kind.is_variable(), n.type_ref.clone()))?;
            let slot = match (is_var, tr) {
                (true, Some(tr)) => default_value(&tr.get(self)?),
                _ => Val::Null,
            };
            template.push(slot);
        }
        Ok(Arc::new(
            move |_frame: &mut dyn NativeFrame| -> bhl_runtime::Result<Val> {
                Ok(Val::List(Arc::new(Mutex::new(template.clone()))))
            },
        ))
    }

    pub fn instantiate(&self, class: SymbolId, frame: &mut dyn NativeFrame) -> Result<Val> {
        let creator = self.class_creator(class)?;
        Ok(creator(frame)?)
    }

    /// Registers `func` as a binary operator of a native class.
    pub fn overload_binary_operator(&self, class: SymbolId, func: SymbolId) -> Result<()> {
        let info = self.class_info(class)?;
        let at = self.symbols().read(func, SymbolNode::describe_location)?;
        let invalid = |reason: &str| CompileError::InvalidOperatorOverload {
            at: at.clone(),
            reason: reason.to_string(),
        };
        if info.flavor != ClassFlavor::Native {
            return Err(invalid("operators can only be overloaded on native classes"));
        }
        if self.total_args(func)? != 1 {
            return Err(invalid("operator overload must have exactly one argument"));
        }
        if self.return_type(func)?.is(BuiltIn::Void) {
            return Err(invalid("operator overload return value can't be void"));
        }
        self.define_in(class, func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhl_runtime::StackFrame;

    fn class_with_fields(ts: &TypeSystem) -> SymbolId {
        let class = ts.new_class("Unit", None, ClassFlavor::Script, None).unwrap();
        ts.define(class).unwrap();
        for (name, ty) in [("hp", "int"), ("name", "string"), ("alive", "bool")] {
            let field = ts.new_field(name, ts.type_ref(ty).unwrap(), None);
            ts.define_in(class, field).unwrap();
        }
        let method = ts.new_script_func("Hit", ts.type_ref("void").unwrap(), None);
        ts.define_in(class, method).unwrap();
        class
    }

    #[test]
    fn test_script_instance_has_default_slots() {
        let ts = TypeSystem::new().unwrap();
        let class = class_with_fields(&ts);
        let mut frame = StackFrame::new();
        let obj = ts.instantiate(class, &mut frame).unwrap();
        let slots = lock(obj.as_list().unwrap()).unwrap().clone();
        assert_eq!(slots, vec![Val::Num(0.0), Val::str(""), Val::Bool(false), Val::Null]);
    }

    #[test]
    fn test_script_field_accessor_uses_slot() {
        let ts = TypeSystem::new().unwrap();
        let class = class_with_fields(&ts);
        let obj = ts.instantiate(class, &mut StackFrame::new()).unwrap();
        let name = ts.resolve_member(class, "name").unwrap().unwrap();
        let accessor = ts.field_accessor(name).unwrap();
        accessor.set(&obj, Val::str("orc")).unwrap();
        assert_eq!(accessor.get(&obj).unwrap(), Val::str("orc"));
        assert_eq!(lock(obj.as_list().unwrap()).unwrap()[1], Val::str("orc"));
    }

    #[test]
    fn test_subclass_shares_inherited_slots() {
        let ts = TypeSystem::new().unwrap();
        let base = class_with_fields(&ts);
        let derived = ts.new_class("Hero", Some(base), ClassFlavor::Script, None).unwrap();
        let extra = ts.new_field("xp", ts.type_ref("int").unwrap(), None);
        ts.define_in(derived, extra).unwrap();

        let hp = ts.resolve_member(base, "hp").unwrap();
        assert_eq!(ts.resolve_member(derived, "hp").unwrap(), hp);
        assert_eq!(ts.scope_idx(extra).unwrap(), Some(4));
        assert_eq!(ts.scope_of(hp.unwrap()).unwrap(), Some(base));
        assert!(ts.is_subclass_of(derived, base));
        assert!(!ts.is_subclass_of(base, derived));

        let clash = ts.new_field("hp", ts.type_ref("int").unwrap(), None);
        let err = ts.define_in(derived, clash).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSymbol { .. }));
    }

    #[test]
    fn test_operator_overload_rules() {
        let ts = TypeSystem::new().unwrap();
        let vec2 = ts.new_native_class("Vec2", None, None).unwrap();
        ts.define(vec2).unwrap();
        let cb: Arc<dyn bhl_runtime::NativeCallable> =
            Arc::new(
                |_f: &mut dyn NativeFrame, _a: bhl_runtime::FuncArgsInfo| -> bhl_runtime::Result<bhl_runtime::CallStatus> {
                    Ok(bhl_runtime::CallStatus::Done)
                },
            );

        let no_args = ts
            .new_native_func("+", ts.type_ref("Vec2").unwrap(), 0, cb.clone(), &[])
            .unwrap();
        assert!(matches!(
            ts.overload_binary_operator(vec2, no_args),
            Err(CompileError::InvalidOperatorOverload { .. })
        ));

        let arg = ts.new_arg("o", ts.type_ref("Vec2").unwrap(), false, None);
        let void_ret = ts
            .new_native_func("*", ts.type_ref("void").unwrap(), 0, cb.clone(), &[arg])
            .unwrap();
        assert!(ts.overload_binary_operator(vec2, void_ret).is_err());

        let arg = ts.new_arg("o", ts.type_ref("Vec2").unwrap(), false, None);
        let plus = ts
            .new_native_func("+", ts.type_ref("Vec2").unwrap(), 0, cb, &[arg])
            .unwrap();
        ts.overload_binary_operator(vec2, plus).unwrap();
        assert_eq!(ts.resolve_member(vec2, "+").unwrap(), Some(plus));
    }

    #[test]
    fn test_native_class_without_creator_cannot_instantiate() {
        let ts = TypeSystem::new().unwrap();
        let class = ts.new_native_class("Handle", None, None).unwrap();
        let err = ts.instantiate(class, &mut StackFrame::new()).unwrap_err();
        assert!(matches!(err, CompileError::Runtime(RuntimeError::Unsupported(_))));
    }
}
