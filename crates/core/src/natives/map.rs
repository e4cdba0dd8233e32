use crate::error::Result;
use crate::symbol::SymbolId;
use crate::type_system::TypeSystem;
use crate::types::TypeRef;
use bhl_runtime::value::lock;
use bhl_runtime::{CallStatus, FieldAccessor, FuncArgsInfo, MapKey, NativeCallable, NativeFrame, Val};
use std::sync::Arc;

type RtResult<T> = bhl_runtime::Result<T>;

struct CountAccessor;

impl FieldAccessor for CountAccessor {
    fn get(&self, ctx: &Val) -> RtResult<Val> {
        Ok(Val::Num(lock(ctx.as_map()?)?.len() as f64))
    }
}

fn callable(
    f: impl Fn(&mut dyn NativeFrame) -> RtResult<()> + Send + Sync + 'static,
) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        f(frame)?;
        Ok(CallStatus::Done)
    })
}

/// Defines the map members on `class`:
///
/// - `Add(k, v)`: pops the value, the key, then the map.
/// - `Remove(k)`: pops the key, then the map.
/// - `Contains(k)`: pops the key, then the map; pushes a bool.
/// - `TryGet(k)`: pops the key, then the map; pushes the value (null when
///   absent), then the found flag, so the flag ends on top.
/// - `Clear()`: pops the map.
/// - `Count`: read-only field.
pub(crate) fn install_members(ts: &TypeSystem, class: SymbolId, key: &TypeRef, value: &TypeRef) -> Result<()> {
    let void = ts.type_ref("void")?;
    let bool_type = ts.type_ref("bool")?;
    let arg = |name: &str, tr: &TypeRef| ts.new_arg(name, tr.clone(), false, None);

    ts.set_class_creator(
        class,
        Some(Arc::new(|_frame: &mut dyn NativeFrame| -> RtResult<Val> { Ok(Val::new_map()) })),
    )?;

    let count = ts.new_native_field("Count", ts.type_ref("int")?, Arc::new(CountAccessor));
    ts.define_in(class, count)?;

    let add = callable(|frame| {
        let stack = frame.stack();
        let v = stack.pop()?;
        let k = MapKey::from_val(&stack.pop()?)?;
        let map = stack.pop()?;
        lock(map.as_map()?)?.insert(k, v);
        Ok(())
    });
    let remove = callable(|frame| {
        let stack = frame.stack();
        let k = MapKey::from_val(&stack.pop()?)?;
        let map = stack.pop()?;
        lock(map.as_map()?)?.shift_remove(&k);
        Ok(())
    });
    let contains = callable(|frame| {
        let stack = frame.stack();
        let k = MapKey::from_val(&stack.pop()?)?;
        let map = stack.pop()?;
        let found = lock(map.as_map()?)?.contains_key(&k);
        stack.push(Val::Bool(found));
        Ok(())
    });
    let try_get = callable(|frame| {
        let stack = frame.stack();
        let k = MapKey::from_val(&stack.pop()?)?;
        let map = stack.pop()?;
        let hit = lock(map.as_map()?)?.get(&k).cloned();
        stack.push(hit.clone().unwrap_or_default());
        stack.push(Val::Bool(hit.is_some()));
        Ok(())
    });
    let clear = callable(|frame| {
        let map = frame.stack().pop()?;
        lock(map.as_map()?)?.clear();
        Ok(())
    });

    let pair = ts.type_tuple(vec!["bool".into(), value.into()])?;
    let methods = [
        ts.new_native_func("Add", void.clone(), 0, add, &[arg("k", key), arg("v", value)])?,
        ts.new_native_func("Remove", void.clone(), 0, remove, &[arg("k", key)])?,
        ts.new_native_func("Contains", bool_type, 0, contains, &[arg("k", key)])?,
        ts.new_native_func("TryGet", pair, 0, try_get, &[arg("k", key)])?,
        ts.new_native_func("Clear", void, 0, clear, &[])?,
    ];
    for method in methods {
        ts.define_in(class, method)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use bhl_runtime::StackFrame;

    fn call(ts: &TypeSystem, class: SymbolId, method: &str, frame: &mut StackFrame) {
        let func = ts.resolve_member(class, method).unwrap().unwrap();
        ts.native_callable(func)
            .unwrap()
            .call(frame, FuncArgsInfo::default())
            .unwrap();
    }

    #[test]
    fn test_map_stack_contract() {
        let ts = TypeSystem::new().unwrap();
        let class = ts
            .type_map("string", "int")
            .unwrap()
            .try_get()
            .and_then(Type::as_class)
            .unwrap();
        let mut frame = StackFrame::new();
        let map = ts.instantiate(class, &mut frame).unwrap();

        frame.stack.push(map.clone());
        frame.stack.push(Val::str("hey"));
        frame.stack.push(Val::Num(42.0));
        call(&ts, class, "Add", &mut frame);

        frame.stack.push(map.clone());
        frame.stack.push(Val::str("hey"));
        call(&ts, class, "TryGet", &mut frame);
        assert_eq!(frame.stack.pop().unwrap(), Val::Bool(true));
        assert_eq!(frame.stack.pop().unwrap(), Val::Num(42.0));

        frame.stack.push(map.clone());
        frame.stack.push(Val::str("nope"));
        call(&ts, class, "Contains", &mut frame);
        assert_eq!(frame.stack.pop().unwrap(), Val::Bool(false));

        let count = ts.resolve_member(class, "Count").unwrap().unwrap();
        let accessor = ts.field_accessor(count).unwrap();
        assert_eq!(accessor.get(&map).unwrap(), Val::Num(1.0));

        frame.stack.push(map.clone());
        frame.stack.push(Val::str("hey"));
        call(&ts, class, "Remove", &mut frame);
        assert_eq!(accessor.get(&map).unwrap(), Val::Num(0.0));

        frame.stack.push(map.clone());
        call(&ts, class, "Clear", &mut frame);
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn test_try_get_signature() {
        let ts = TypeSystem::new().unwrap();
        let class = ts
            .type_map("int", "string")
            .unwrap()
            .try_get()
            .and_then(Type::as_class)
            .unwrap();
        let try_get = ts.resolve_member(class, "TryGet").unwrap().unwrap();
        assert_eq!(ts.signature(try_get).unwrap().name(), "bool,string^(int)");
    }
}
