//! Definition and name resolution across nested scopes.

use super::{FuncFlavor, SymbolId, SymbolKind, SymbolNode};
use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use crate::type_system::TypeSystem;
use crate::types::TypeRef;
use tracing::trace;

/// A lexical block inside a function body.
///
/// Block variables are stored in the owning function so their slots are
/// frame slots; the block only remembers which ones to retire on close.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub func: SymbolId,
    pub level: u32,
    pub vars: Vec<SymbolId>,
}

enum Lookup {
    Local(Option<SymbolId>),
    Global(Option<SymbolId>),
    Lambda,
    Delegate(SymbolId),
}

enum Fallback {
    Scope(Option<SymbolId>),
    FuncParent(Option<SymbolId>),
    Of(SymbolId),
}

impl TypeSystem {
    pub fn new_module(&self, name: &str) -> SymbolId {
        let mut node = SymbolNode::new(name, SymbolKind::Module);
        node.scope = Some(self.globals());
        self.symbols().alloc(node)
    }

    pub fn new_variable(&self, name: &str, tr: TypeRef, location: Option<SourceLocation>) -> SymbolId {
        self.symbols()
            .alloc(SymbolNode::new(name, SymbolKind::Variable).with_type(tr).at(location))
    }

    pub fn new_arg(
        &self,
        name: &str,
        tr: TypeRef,
        is_ref: bool,
        location: Option<SourceLocation>,
    ) -> SymbolId {
        let node = SymbolNode::new(name, SymbolKind::FuncArg { is_ref })
            .with_type(tr.with_ref(is_ref))
            .at(location);
        self.symbols().alloc(node)
    }

    /// Defines `sym` into the global scope.
    pub fn define(&self, sym: SymbolId) -> Result<()> {
        self.define_in(self.globals(), sym)
    }

    /// Defines `sym` in `scope`, assigning the next positional slot.
    pub fn define_in(&self, scope: SymbolId, sym: SymbolId) -> Result<()> {
        let kind = self.symbols().read(scope, |n| n.kind.clone())?;
        match kind {
            SymbolKind::Enum => {
                let at = self.symbols().read(sym, SymbolNode::describe_location)?;
                let scope = self.symbols().read(scope, |n| n.name.clone())?;
                Err(CompileError::DefineNotAllowed { at, scope })
            }
            SymbolKind::Func(info) if matches!(info.flavor, FuncFlavor::Native { .. }) => {
                let at = self.symbols().read(sym, SymbolNode::describe_location)?;
                let scope = self.symbols().read(scope, |n| n.name.clone())?;
                Err(CompileError::DefineNotAllowed { at, scope })
            }
            SymbolKind::Block(block) => {
                self.attach(block.func, sym)?;
                self.symbols().write(sym, |n| n.scope_level = block.level)?;
                self.symbols().write(scope, |n| {
                    if let SymbolKind::Block(b) = &mut n.kind {
                        b.vars.push(sym);
                    }
                })
            }
            SymbolKind::Class(info) => {
                if let Some(super_class) = info.super_class {
                    let name = self.symbols().read(sym, |n| n.name.clone())?;
                    if self.symbols().read(super_class, |n| n.members.contains(&name))? {
                        return Err(self.duplicate(sym)?);
                    }
                }
                self.attach(scope, sym)
            }
            SymbolKind::Global | SymbolKind::Module => {
                let name = self.symbols().read(sym, |n| n.name.clone())?;
                for link in self.links()? {
                    if link != scope && self.resolve_local(link, &name)?.is_some() {
                        return Err(self.duplicate(sym)?);
                    }
                }
                self.attach(scope, sym)
            }
            _ => self.attach(scope, sym),
        }
    }

    /// Adds `sym` to the members of `scope` and records the back-reference.
    pub(crate) fn attach(&self, scope: SymbolId, sym: SymbolId) -> Result<()> {
        let name = self.symbols().read(sym, |n| n.name.clone())?;
        let added = self.symbols().write(scope, |n| n.members.add(&name, sym))?;
        let idx = match added {
            Ok(idx) => idx,
            Err(_) => return Err(self.duplicate(sym)?),
        };
        self.symbols().write(sym, |n| {
            if n.kind.is_scope_indexed() && n.scope_idx.is_none() {
                n.scope_idx = Some(idx);
            }
            n.scope = Some(scope);
        })?;
        trace!(symbol = %name, scope = %scope, idx, "defined");
        Ok(())
    }

    fn duplicate(&self, sym: SymbolId) -> Result<CompileError> {
        self.symbols().read(sym, |n| CompileError::DuplicateSymbol {
            at: n.describe_location(),
            name: n.name.clone(),
        })
    }

    /// Looks `name` up in `scope` only, ignoring fallbacks.
    pub fn resolve_local(&self, scope: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        let hit = self.symbols().read(scope, |n| n.members.find(name))?;
        match hit {
            Some(id) => self.visible(id),
            None => Ok(None),
        }
    }

    /// Resolves `name` from `scope`, walking the fallback chain.
    pub fn resolve_in(&self, scope: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let lookup = self.symbols().read(scope, |n| match &n.kind {
                SymbolKind::Block(b) => Lookup::Delegate(b.func),
                SymbolKind::Func(f) if matches!(f.flavor, FuncFlavor::Lambda(_)) => Lookup::Lambda,
                SymbolKind::Global => Lookup::Global(n.members.find(name)),
                _ => Lookup::Local(n.members.find(name)),
            })?;
            match lookup {
                Lookup::Delegate(func) => current = Some(func),
                Lookup::Lambda => return self.resolve_in_lambda(scope, name),
                Lookup::Global(Some(id)) | Lookup::Local(Some(id)) => return self.visible(id),
                Lookup::Global(None) => {
                    for link in self.links()? {
                        if let Some(id) = self.resolve_local(link, name)? {
                            return Ok(Some(id));
                        }
                    }
                    return Ok(None);
                }
                Lookup::Local(None) => current = self.fallback_scope(scope)?,
            }
        }
        Ok(None)
    }

    /// Like [`Self::resolve_in`] but fails with `UnresolvedSymbol`.
    pub fn require(
        &self,
        scope: SymbolId,
        name: &str,
        location: Option<&SourceLocation>,
    ) -> Result<SymbolId> {
        self.resolve_in(scope, name)?
            .ok_or_else(|| CompileError::UnresolvedSymbol {
                at: crate::location::describe(location, name),
                name: name.to_string(),
            })
    }

    /// An out-of-scope variable resolves as if it were absent.
    pub(crate) fn visible(&self, id: SymbolId) -> Result<Option<SymbolId>> {
        let hidden = self
            .symbols()
            .read(id, |n| n.kind.is_variable() && n.out_of_scope)?;
        Ok(if hidden { None } else { Some(id) })
    }

    /// The scope searched when `scope` has no member of the requested name.
    ///
    /// Functions skip their class: method bodies reach members only through
    /// `this`. Lambdas continue from their outermost enclosing function.
    pub fn fallback_scope(&self, scope: SymbolId) -> Result<Option<SymbolId>> {
        let fallback = self.symbols().read(scope, |n| match &n.kind {
            SymbolKind::Class(info) => Fallback::Scope(info.super_class.or(n.scope)),
            SymbolKind::Func(info) => match &info.flavor {
                FuncFlavor::Lambda(lambda) => match lambda.stack.first() {
                    Some(outer) if *outer != scope => Fallback::Of(*outer),
                    _ => Fallback::FuncParent(n.scope),
                },
                _ => Fallback::FuncParent(n.scope),
            },
            SymbolKind::Block(b) => Fallback::Of(b.func),
            SymbolKind::Global => Fallback::Scope(None),
            _ => Fallback::Scope(n.scope),
        })?;
        match fallback {
            Fallback::Scope(s) => Ok(s),
            Fallback::Of(other) => self.fallback_scope(other),
            Fallback::FuncParent(None) => Ok(None),
            Fallback::FuncParent(Some(parent)) => {
                let class_scope = self.symbols().read(parent, |n| match n.kind {
                    SymbolKind::Class(_) => Some(n.scope),
                    _ => None,
                })?;
                Ok(class_scope.unwrap_or(Some(parent)))
            }
        }
    }

    /// Opens a block nested in a function or in another block.
    pub fn open_block(&self, parent: SymbolId, location: Option<SourceLocation>) -> Result<SymbolId> {
        let owner = self.symbols().read(parent, |n| match &n.kind {
            SymbolKind::Block(b) => Some((b.func, b.level + 1)),
            SymbolKind::Func(_) => Some((parent, 1)),
            _ => None,
        })?;
        let (func, level) = owner.ok_or_else(|| {
            CompileError::Internal(format!("blocks can only open inside functions, got {parent}"))
        })?;
        let mut node = SymbolNode::new(
            format!("block{level}"),
            SymbolKind::Block(BlockInfo {
                func,
                level,
                vars: Vec::new(),
            }),
        )
        .at(location);
        node.scope = Some(parent);
        Ok(self.symbols().alloc(node))
    }

    /// Retires every variable declared directly in `block`.
    pub fn close_block(&self, block: SymbolId) -> Result<()> {
        let vars = self.symbols().read(block, |n| match &n.kind {
            SymbolKind::Block(b) => b.vars.clone(),
            _ => Vec::new(),
        })?;
        for var in vars {
            self.mark_out_of_scope(var)?;
        }
        Ok(())
    }

    pub fn mark_out_of_scope(&self, sym: SymbolId) -> Result<()> {
        self.symbols().write(sym, |n| n.out_of_scope = true)
    }

    pub fn members(&self, scope: SymbolId) -> Result<super::SymbolsDictionary> {
        self.symbols().read(scope, |n| n.members.clone())
    }

    pub fn scope_idx(&self, sym: SymbolId) -> Result<Option<usize>> {
        self.symbols().read(sym, |n| n.scope_idx)
    }

    pub fn scope_of(&self, sym: SymbolId) -> Result<Option<SymbolId>> {
        self.symbols().read(sym, |n| n.scope)
    }

    pub fn name_of(&self, sym: SymbolId) -> Result<String> {
        self.symbols().read(sym, |n| n.name.clone())
    }
}
