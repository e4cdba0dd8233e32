//! Functions, native bindings and closures.

use super::{SymbolId, SymbolKind, SymbolNode, SymbolsDictionary};
use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use crate::type_system::TypeSystem;
use crate::types::{FuncSignature, Type, TypeRef};
use bhl_runtime::NativeCallable;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
pub enum FuncFlavor {
    Native { cb: Arc<dyn NativeCallable> },
    Script,
    Lambda(LambdaInfo),
}

impl FuncFlavor {
    pub fn label(&self) -> &'static str {
        match self {
            FuncFlavor::Native { .. } => "native function",
            FuncFlavor::Script => "function",
            FuncFlavor::Lambda(_) => "lambda",
        }
    }
}

impl fmt::Debug for FuncFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuncFlavor::Native { .. } => write!(f, "Native"),
            FuncFlavor::Script => write!(f, "Script"),
            FuncFlavor::Lambda(info) => write!(f, "{info:?}"),
        }
    }
}

/// A captured variable: the lambda's local slot `dst_idx` is filled from
/// slot `src_idx` of the immediately enclosing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpValue {
    pub name: String,
    pub dst_idx: usize,
    pub src_idx: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LambdaInfo {
    /// Enclosing functions, outermost first, ending with the lambda itself.
    pub stack: Vec<SymbolId>,
    pub upvals: Vec<UpValue>,
}

#[derive(Debug, Clone)]
pub struct FuncInfo {
    pub flavor: FuncFlavor,
    pub signature: FuncSignature,
    pub default_args: usize,
}

impl TypeSystem {
    /// Creates a native function whose arguments are fixed at construction.
    pub fn new_native_func(
        &self,
        name: &str,
        ret: TypeRef,
        default_args: usize,
        cb: Arc<dyn NativeCallable>,
        args: &[SymbolId],
    ) -> Result<SymbolId> {
        if default_args > args.len() {
            return Err(CompileError::Internal(format!(
                "'{name}' declares {default_args} defaults for {} arguments",
                args.len()
            )));
        }
        let info = FuncInfo {
            flavor: FuncFlavor::Native { cb },
            signature: FuncSignature::new(ret),
            default_args,
        };
        let func = self.symbols().alloc(SymbolNode::new(name, SymbolKind::Func(info)));
        for arg in args {
            self.attach(func, *arg)?;
            self.push_arg_type(func, *arg, false)?;
        }
        Ok(func)
    }

    pub fn new_script_func(&self, name: &str, ret: TypeRef, location: Option<SourceLocation>) -> SymbolId {
        let info = FuncInfo {
            flavor: FuncFlavor::Script,
            signature: FuncSignature::new(ret),
            default_args: 0,
        };
        self.symbols()
            .alloc(SymbolNode::new(name, SymbolKind::Func(info)).at(location))
    }

    /// Creates a lambda nested in `enclosing` (outermost first), which must
    /// name at least one function.
    pub fn new_lambda(
        &self,
        name: &str,
        ret: TypeRef,
        enclosing: &[SymbolId],
        location: Option<SourceLocation>,
    ) -> Result<SymbolId> {
        if enclosing.is_empty() {
            return Err(CompileError::Internal(format!(
                "lambda '{}' has no enclosing function",
                crate::location::describe(location.as_ref(), name)
            )));
        }
        let info = FuncInfo {
            flavor: FuncFlavor::Lambda(LambdaInfo {
                stack: enclosing.to_vec(),
                upvals: Vec::new(),
            }),
            signature: FuncSignature::new(ret),
            default_args: 0,
        };
        let mut node = SymbolNode::new(name, SymbolKind::Func(info)).at(location);
        node.scope = enclosing.last().copied();
        let lambda = self.symbols().alloc(node);
        self.symbols().write(lambda, |n| {
            if let SymbolKind::Func(FuncInfo {
                flavor: FuncFlavor::Lambda(info),
                ..
            }) = &mut n.kind
            {
                info.stack.push(lambda);
            }
        })?;
        Ok(lambda)
    }

    /// Defines an argument of a script function or lambda and appends its
    /// type to the signature. Arguments precede every local.
    pub fn define_arg(&self, func: SymbolId, arg: SymbolId, has_default: bool) -> Result<()> {
        let (members, args) = self.func_info(func, |n, info| (n.members.len(), info.signature.args_num()))?;
        if members != args {
            let name = self.name_of(func)?;
            return Err(CompileError::Internal(format!(
                "arguments of '{name}' must be defined before its locals"
            )));
        }
        self.define_in(func, arg)?;
        self.push_arg_type(func, arg, has_default)
    }

    fn push_arg_type(&self, func: SymbolId, arg: SymbolId, has_default: bool) -> Result<()> {
        let tr = self.symbols().read(arg, |n| match (&n.kind, &n.type_ref) {
            (SymbolKind::FuncArg { is_ref }, Some(tr)) => Ok(tr.with_ref(*is_ref)),
            _ => Err(CompileError::Internal(format!("'{}' is not an argument", n.name))),
        })??;
        self.symbols().write(func, |n| {
            if let SymbolKind::Func(info) = &mut n.kind {
                info.signature.add_arg(tr);
                if has_default {
                    info.default_args += 1;
                }
            }
        })
    }

    fn func_info<R>(&self, func: SymbolId, f: impl FnOnce(&SymbolNode, &FuncInfo) -> R) -> Result<R> {
        self.symbols().read(func, |n| match &n.kind {
            SymbolKind::Func(info) => Ok(f(n, info)),
            _ => Err(CompileError::Internal(format!("'{}' is not a function", n.name))),
        })?
    }

    pub fn signature(&self, func: SymbolId) -> Result<FuncSignature> {
        self.func_info(func, |_, info| info.signature.clone())
    }

    pub fn func_type(&self, func: SymbolId) -> Result<Type> {
        Ok(Type::Func(Arc::new(self.signature(func)?)))
    }

    pub fn return_type(&self, func: SymbolId) -> Result<Type> {
        self.signature(func)?.ret_type().get(self)
    }

    pub fn total_args(&self, func: SymbolId) -> Result<usize> {
        self.func_info(func, |_, info| info.signature.args_num())
    }

    pub fn default_args(&self, func: SymbolId) -> Result<usize> {
        self.func_info(func, |_, info| info.default_args)
    }

    pub fn required_args(&self, func: SymbolId) -> Result<usize> {
        self.func_info(func, |_, info| info.signature.args_num() - info.default_args)
    }

    pub fn get_arg(&self, func: SymbolId, idx: usize) -> Result<SymbolId> {
        let arg = self.func_info(func, |n, info| {
            (idx < info.signature.args_num())
                .then(|| n.members.try_at(idx))
                .flatten()
        })?;
        arg.ok_or_else(|| CompileError::Internal(format!("no argument {idx} in {func}")))
    }

    pub fn args(&self, func: SymbolId) -> Result<SymbolsDictionary> {
        let members = self.members(func)?;
        let total = self.total_args(func)?;
        let mut args = SymbolsDictionary::new();
        for (name, id) in members.iter().take(total) {
            let _ = args.add(name, id);
        }
        Ok(args)
    }

    pub fn native_callable(&self, func: SymbolId) -> Result<Arc<dyn NativeCallable>> {
        self.func_info(func, |n, info| match &info.flavor {
            FuncFlavor::Native { cb } => Ok(cb.clone()),
            _ => Err(CompileError::Internal(format!("'{}' is not native", n.name))),
        })?
    }

    pub fn upvalues(&self, lambda: SymbolId) -> Result<Vec<UpValue>> {
        self.func_info(lambda, |_, info| match &info.flavor {
            FuncFlavor::Lambda(l) => l.upvals.clone(),
            _ => Vec::new(),
        })
    }

    fn is_lambda(&self, func: SymbolId) -> Result<bool> {
        self.symbols().read(func, |n| {
            matches!(
                &n.kind,
                SymbolKind::Func(FuncInfo {
                    flavor: FuncFlavor::Lambda(_),
                    ..
                })
            )
        })
    }

    /// Lambda lookup: own members, then variables of enclosing functions
    /// (captured through every lambda in between), then the fallback scope.
    pub(crate) fn resolve_in_lambda(&self, lambda: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        let (own, stack) = self.func_info(lambda, |n, info| {
            let stack = match &info.flavor {
                FuncFlavor::Lambda(l) => l.stack.clone(),
                _ => Vec::new(),
            };
            (n.members.find(name), stack)
        })?;
        if let Some(id) = own {
            return self.visible(id);
        }
        if let Some(id) = self.resolve_upvalue(lambda, &stack, name)? {
            return Ok(Some(id));
        }
        match self.fallback_scope(lambda)? {
            Some(scope) => self.resolve_in(scope, name),
            None => Ok(None),
        }
    }

    fn resolve_upvalue(&self, lambda: SymbolId, stack: &[SymbolId], name: &str) -> Result<Option<SymbolId>> {
        let my_idx = stack
            .iter()
            .position(|s| *s == lambda)
            .ok_or_else(|| CompileError::Internal(format!("lambda {lambda} is missing from its stack")))?;

        for i in (0..my_idx).rev() {
            let Some(found) = self.symbols().read(stack[i], |n| n.members.find(name))? else {
                continue;
            };
            let live = self
                .symbols()
                .read(found, |n| n.kind.is_variable() && !n.out_of_scope)?;
            if live {
                return self.assign_upvalues(found, &stack[i + 1..=my_idx]).map(Some);
            }
        }
        Ok(None)
    }

    /// Threads a capture of `src` through every lambda of `chain`, returning
    /// the copy made in the last one.
    fn assign_upvalues(&self, src: SymbolId, chain: &[SymbolId]) -> Result<SymbolId> {
        let mut current = src;
        for scope in chain {
            if self.is_lambda(*scope)? {
                current = self.add_upvalue(*scope, current)?;
            }
        }
        Ok(current)
    }

    fn add_upvalue(&self, lambda: SymbolId, src: SymbolId) -> Result<SymbolId> {
        let (name, tr, location, src_idx) = self
            .symbols()
            .read(src, |n| (n.name.clone(), n.type_ref.clone(), n.location.clone(), n.scope_idx))?;
        let src_idx = src_idx.ok_or_else(|| CompileError::Internal(format!("captured '{name}' has no slot")))?;

        let mut node = SymbolNode::new(&name, SymbolKind::Variable).at(location);
        node.type_ref = tr;
        let local = self.symbols().alloc(node);
        self.define_in(lambda, local)?;

        let dst_idx = self
            .scope_idx(local)?
            .ok_or_else(|| CompileError::Internal(format!("upvalue '{name}' has no slot")))?;
        trace!(upvalue = %name, lambda = %lambda, dst_idx, src_idx, "captured");
        self.symbols().write(lambda, |n| {
            if let SymbolKind::Func(FuncInfo {
                flavor: FuncFlavor::Lambda(info),
                ..
            }) = &mut n.kind
            {
                info.upvals.push(UpValue {
                    name,
                    dst_idx,
                    src_idx,
                });
            }
        })?;
        Ok(local)
    }
}
