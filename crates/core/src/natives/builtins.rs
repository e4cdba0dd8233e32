//! Symbols every global scope starts with.

use super::GENERIC_ARRAY;
use crate::error::Result;
use crate::symbol::{SymbolKind, SymbolNode};
use crate::type_system::TypeSystem;
use crate::types::{BuiltIn, Type, TypeRef};
use bhl_runtime::{CallStatus, FuncArgsInfo, NativeCallable, NativeFrame, Val};
use std::sync::Arc;

type RtResult<T> = bhl_runtime::Result<T>;

fn status(s: CallStatus) -> Arc<dyn NativeCallable> {
    Arc::new(move |_frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> { Ok(s) })
}

/// `start(p)`: pops the function value, starts a fiber running it and pushes
/// the fiber id.
fn start() -> Arc<dyn NativeCallable> {
    Arc::new(|frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let func = frame.stack().pop()?;
        let id = frame.start_fiber(func)?;
        frame.stack().push(Val::Num(id as f64));
        Ok(CallStatus::Done)
    })
}

/// `stop(fid)`: pops the fiber id and stops that fiber.
fn stop() -> Arc<dyn NativeCallable> {
    Arc::new(|frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let id = frame.stack().pop()?.as_index()?;
        frame.stop_fiber(id)?;
        Ok(CallStatus::Done)
    })
}

pub(crate) fn install(ts: &TypeSystem) -> Result<()> {
    for b in BuiltIn::DEFINED {
        let node = SymbolNode::new(b.name(), SymbolKind::BuiltIn(b))
            .with_type(TypeRef::resolved(b.name(), Type::BuiltIn(b)));
        let id = ts.symbols().alloc(node);
        ts.define(id)?;
    }

    // prototype the runtime looks generic arrays up by
    let proto = ts.build_array_class(GENERIC_ARRAY, &TypeRef::named(""), None)?;
    ts.define(proto)?;

    let void = ts.type_ref("void")?;
    for (name, s) in [
        ("suspend", CallStatus::Suspend),
        ("yield", CallStatus::Yield),
        ("fail", CallStatus::Failure),
    ] {
        let func = ts.new_native_func(name, void.clone(), 0, status(s), &[])?;
        ts.define(func)?;
    }

    let p = ts.new_arg("p", ts.type_func("void", vec![])?, false, None);
    let func = ts.new_native_func("start", ts.type_ref("int")?, 0, start(), &[p])?;
    ts.define(func)?;

    let fid = ts.new_arg("fid", ts.type_ref("int")?, false, None);
    let func = ts.new_native_func("stop", void, 0, stop(), &[fid])?;
    ts.define(func)
}
