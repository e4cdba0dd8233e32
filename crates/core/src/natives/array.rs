use crate::error::Result;
use crate::symbol::SymbolId;
use crate::type_system::TypeSystem;
use crate::types::TypeRef;
use bhl_runtime::value::lock;
use bhl_runtime::{
    CallStatus, FieldAccessor, FuncArgsInfo, NativeCallable, NativeFrame, NativeValue, RuntimeError, Val,
};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

type RtResult<T> = bhl_runtime::Result<T>;

/// Storage behind one array type.
pub trait ArrayBackend: Send + Sync {
    fn create(&self) -> Val;
    fn count(&self, arr: &Val) -> RtResult<usize>;
    fn add(&self, arr: &Val, item: Val) -> RtResult<()>;
    fn at(&self, arr: &Val, idx: i64) -> RtResult<Val>;
    fn set_at(&self, arr: &Val, idx: i64, item: Val) -> RtResult<()>;
    fn remove_at(&self, arr: &Val, idx: i64) -> RtResult<()>;
    fn clear(&self, arr: &Val) -> RtResult<()>;

    /// Rejects items this storage cannot hold, before any operand is popped.
    fn accepts(&self, _item: &Val) -> RtResult<()> {
        Ok(())
    }
}

fn checked(idx: i64, len: usize) -> RtResult<usize> {
    usize::try_from(idx)
        .ok()
        .filter(|i| *i < len)
        .ok_or(RuntimeError::IndexOutOfRange { idx, len })
}

/// Arrays of any item type, stored as a shared list of values.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericArray;

impl ArrayBackend for GenericArray {
    fn create(&self) -> Val {
        Val::new_list()
    }

    fn count(&self, arr: &Val) -> RtResult<usize> {
        Ok(lock(arr.as_list()?)?.len())
    }

    fn add(&self, arr: &Val, item: Val) -> RtResult<()> {
        lock(arr.as_list()?)?.push(item);
        Ok(())
    }

    fn at(&self, arr: &Val, idx: i64) -> RtResult<Val> {
        let items = lock(arr.as_list()?)?;
        let i = checked(idx, items.len())?;
        Ok(items[i].clone())
    }

    fn set_at(&self, arr: &Val, idx: i64, item: Val) -> RtResult<()> {
        let mut items = lock(arr.as_list()?)?;
        let i = checked(idx, items.len())?;
        items[i] = item;
        Ok(())
    }

    fn remove_at(&self, arr: &Val, idx: i64) -> RtResult<()> {
        let mut items = lock(arr.as_list()?)?;
        let i = checked(idx, items.len())?;
        items.remove(i);
        Ok(())
    }

    fn clear(&self, arr: &Val) -> RtResult<()> {
        lock(arr.as_list()?)?.clear();
        Ok(())
    }
}

/// Arrays stored as a host vector of `T`, converting at the boundary.
pub struct TypedArray<T>(PhantomData<fn() -> T>);

impl<T> Default for TypedArray<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: NativeValue + Clone> TypedArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(arr: &Val) -> RtResult<&Mutex<Vec<T>>> {
        arr.as_native()?
            .downcast_ref::<Mutex<Vec<T>>>()
            .ok_or_else(|| RuntimeError::TypeMismatch {
                expected: "typed array",
                found: std::any::type_name::<T>().to_string(),
            })
    }
}

impl<T: NativeValue + Clone> ArrayBackend for TypedArray<T> {
    fn create(&self) -> Val {
        Val::Native(Arc::new(Mutex::new(Vec::<T>::new())))
    }

    fn count(&self, arr: &Val) -> RtResult<usize> {
        Ok(lock(Self::items(arr)?)?.len())
    }

    fn add(&self, arr: &Val, item: Val) -> RtResult<()> {
        let item = T::from_val(&item)?;
        lock(Self::items(arr)?)?.push(item);
        Ok(())
    }

    fn at(&self, arr: &Val, idx: i64) -> RtResult<Val> {
        let items = lock(Self::items(arr)?)?;
        let i = checked(idx, items.len())?;
        Ok(items[i].clone().into_val())
    }

    fn set_at(&self, arr: &Val, idx: i64, item: Val) -> RtResult<()> {
        let item = T::from_val(&item)?;
        let mut items = lock(Self::items(arr)?)?;
        let i = checked(idx, items.len())?;
        items[i] = item;
        Ok(())
    }

    fn remove_at(&self, arr: &Val, idx: i64) -> RtResult<()> {
        let mut items = lock(Self::items(arr)?)?;
        let i = checked(idx, items.len())?;
        items.remove(i);
        Ok(())
    }

    fn clear(&self, arr: &Val) -> RtResult<()> {
        lock(Self::items(arr)?)?.clear();
        Ok(())
    }

    fn accepts(&self, item: &Val) -> RtResult<()> {
        T::from_val(item).map(|_| ())
    }
}

struct CountAccessor {
    backend: Arc<dyn ArrayBackend>,
}

impl FieldAccessor for CountAccessor {
    fn get(&self, ctx: &Val) -> RtResult<Val> {
        Ok(Val::Num(self.backend.count(ctx)? as f64))
    }
}

/// `Add(o)`: pops the item, then the array. A rejected item leaves the
/// stack untouched.
fn add(backend: Arc<dyn ArrayBackend>) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let stack = frame.stack();
        backend.accepts(stack.peek()?)?;
        let item = stack.pop()?;
        let arr = stack.pop()?;
        backend.add(&arr, item)?;
        Ok(CallStatus::Done)
    })
}

/// `$AddInplace(o)`: pops the item and leaves the array on the stack.
fn add_inplace(backend: Arc<dyn ArrayBackend>) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let stack = frame.stack();
        backend.accepts(stack.peek()?)?;
        let item = stack.pop()?;
        backend.add(stack.peek()?, item)?;
        Ok(CallStatus::Done)
    })
}

/// `At(idx)`: pops the index, then the array; pushes the item.
fn at(backend: Arc<dyn ArrayBackend>) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let stack = frame.stack();
        let idx = stack.pop()?.as_index()?;
        let arr = stack.pop()?;
        let item = backend.at(&arr, idx)?;
        stack.push(item);
        Ok(CallStatus::Done)
    })
}

/// `SetAt(idx, o)`: pops the index, then the array, then the item.
fn set_at(backend: Arc<dyn ArrayBackend>) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let stack = frame.stack();
        backend.accepts(stack.peek_at(2)?)?;
        let idx = stack.pop()?.as_index()?;
        let arr = stack.pop()?;
        let item = stack.pop()?;
        backend.set_at(&arr, idx, item)?;
        Ok(CallStatus::Done)
    })
}

/// `RemoveAt(idx)`: pops the index, then the array.
fn remove_at(backend: Arc<dyn ArrayBackend>) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let stack = frame.stack();
        let idx = stack.pop()?.as_index()?;
        let arr = stack.pop()?;
        backend.remove_at(&arr, idx)?;
        Ok(CallStatus::Done)
    })
}

/// `Clear()`: pops the array.
fn clear(backend: Arc<dyn ArrayBackend>) -> Arc<dyn NativeCallable> {
    Arc::new(move |frame: &mut dyn NativeFrame, _args: FuncArgsInfo| -> RtResult<CallStatus> {
        let arr = frame.stack().pop()?;
        backend.clear(&arr)?;
        Ok(CallStatus::Done)
    })
}

/// Defines the array members on `class` in their fixed slot order:
/// `Add`, `At`, `SetAt`, `RemoveAt`, `Clear`, `Count`, `$AddInplace`.
pub(crate) fn install_members(
    ts: &TypeSystem,
    class: SymbolId,
    item: &TypeRef,
    backend: Arc<dyn ArrayBackend>,
) -> Result<()> {
    let int = ts.type_ref("int")?;
    let void = ts.type_ref("void")?;
    let arg = |name: &str, tr: &TypeRef| ts.new_arg(name, tr.clone(), false, None);

    let creator_backend = backend.clone();
    ts.set_class_creator(
        class,
        Some(Arc::new(move |_frame: &mut dyn NativeFrame| -> RtResult<Val> {
            Ok(creator_backend.create())
        })),
    )?;

    let methods = [
        ts.new_native_func("Add", void.clone(), 0, add(backend.clone()), &[arg("o", item)])?,
        ts.new_native_func("At", item.clone(), 0, at(backend.clone()), &[arg("idx", &int)])?,
        ts.new_native_func(
            "SetAt",
            void.clone(),
            0,
            set_at(backend.clone()),
            &[arg("idx", &int), arg("o", item)],
        )?,
        ts.new_native_func("RemoveAt", void.clone(), 0, remove_at(backend.clone()), &[arg("idx", &int)])?,
        ts.new_native_func("Clear", void.clone(), 0, clear(backend.clone()), &[])?,
    ];
    for method in methods {
        ts.define_in(class, method)?;
    }

    let count = ts.new_native_field("Count", int, Arc::new(CountAccessor { backend: backend.clone() }));
    ts.define_in(class, count)?;

    let inplace = ts.new_native_func("$AddInplace", void, 0, add_inplace(backend), &[arg("o", item)])?;
    ts.define_in(class, inplace)
}

/// Pre-registers the typed arrays of the primitive types.
pub(crate) fn install_specializations(ts: &TypeSystem) -> Result<()> {
    ts.register_array_type("int", Arc::new(TypedArray::<i64>::new()))?;
    ts.register_array_type("float", Arc::new(TypedArray::<f64>::new()))?;
    ts.register_array_type("bool", Arc::new(TypedArray::<bool>::new()))?;
    ts.register_array_type("string", Arc::new(TypedArray::<String>::new()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use bhl_runtime::StackFrame;

    fn call(ts: &TypeSystem, class: SymbolId, method: &str, frame: &mut StackFrame) -> RtResult<CallStatus> {
        let func = ts.resolve_member(class, method).unwrap().unwrap();
        let cb = ts.native_callable(func).unwrap();
        cb.call(frame, FuncArgsInfo::default())
    }

    fn class_of(tr: &TypeRef) -> SymbolId {
        tr.try_get().and_then(Type::as_class).unwrap()
    }

    #[test]
    fn test_member_slots_are_fixed() {
        let ts = TypeSystem::new().unwrap();
        let arr = class_of(&ts.type_arr("int").unwrap());
        let names: Vec<String> = ts.members(arr).unwrap().keys().map(String::from).collect();
        assert_eq!(
            names,
            ["Add", "At", "SetAt", "RemoveAt", "Clear", "Count", "$AddInplace"]
        );
    }

    #[test]
    fn test_generic_array_stack_contract() {
        let ts = TypeSystem::new().unwrap();
        let class_ty = ts.new_class("Foo", None, crate::symbol::ClassFlavor::Script, None).unwrap();
        ts.define(class_ty).unwrap();
        let arr_type = ts.type_arr("Foo").unwrap();
        let class = class_of(&arr_type);
        assert_eq!(ts.class_type(class).unwrap(), crate::natives::GENERIC_ARRAY);

        let mut frame = StackFrame::new();
        let arr = ts.instantiate(class, &mut frame).unwrap();

        frame.stack.push(arr.clone());
        frame.stack.push(Val::str("a"));
        call(&ts, class, "Add", &mut frame).unwrap();
        assert!(frame.stack.is_empty());

        frame.stack.push(arr.clone());
        frame.stack.push(Val::str("b"));
        call(&ts, class, "$AddInplace", &mut frame).unwrap();
        assert_eq!(frame.stack.pop().unwrap(), arr);

        frame.stack.push(Val::str("c"));
        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(0.0));
        call(&ts, class, "SetAt", &mut frame).unwrap();

        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(0.0));
        call(&ts, class, "At", &mut frame).unwrap();
        assert_eq!(frame.stack.pop().unwrap(), Val::str("c"));

        let count = ts.resolve_member(class, "Count").unwrap().unwrap();
        let accessor = ts.field_accessor(count).unwrap();
        assert_eq!(accessor.get(&arr).unwrap(), Val::Num(2.0));
        assert!(accessor.set(&arr, Val::Num(0.0)).is_err());

        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(1.0));
        call(&ts, class, "RemoveAt", &mut frame).unwrap();
        assert_eq!(accessor.get(&arr).unwrap(), Val::Num(1.0));

        frame.stack.push(arr.clone());
        call(&ts, class, "Clear", &mut frame).unwrap();
        assert_eq!(accessor.get(&arr).unwrap(), Val::Num(0.0));
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn test_typed_array_converts_items() {
        let ts = TypeSystem::new().unwrap();
        let class = class_of(&ts.type_arr("int").unwrap());
        assert_eq!(ts.class_type(class).unwrap(), "int[]");

        let mut frame = StackFrame::new();
        let arr = ts.instantiate(class, &mut frame).unwrap();
        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(7.0));
        call(&ts, class, "Add", &mut frame).unwrap();

        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(3.0));
        let err = call(&ts, class, "At", &mut frame).unwrap_err();
        assert_eq!(err, RuntimeError::IndexOutOfRange { idx: 3, len: 1 });

        frame.stack.clear();
        frame.stack.push(arr.clone());
        frame.stack.push(Val::str("nope"));
        assert!(call(&ts, class, "Add", &mut frame).is_err());
        assert_eq!(frame.stack.len(), 2);
        assert!(call(&ts, class, "$AddInplace", &mut frame).is_err());
        assert_eq!(frame.stack.len(), 2);
    }

    #[test]
    fn test_rejected_item_keeps_operands() {
        let ts = TypeSystem::new().unwrap();
        let class = class_of(&ts.type_arr("float").unwrap());
        let mut frame = StackFrame::new();
        let arr = ts.instantiate(class, &mut frame).unwrap();
        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(1.5));
        call(&ts, class, "Add", &mut frame).unwrap();

        frame.stack.push(Val::Bool(true));
        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(0.0));
        assert!(call(&ts, class, "SetAt", &mut frame).is_err());
        assert_eq!(frame.stack.pop().unwrap(), Val::Num(0.0));
        assert_eq!(frame.stack.pop().unwrap(), arr);
        assert_eq!(frame.stack.pop().unwrap(), Val::Bool(true));

        frame.stack.push(arr.clone());
        frame.stack.push(Val::Num(0.0));
        call(&ts, class, "At", &mut frame).unwrap();
        assert_eq!(frame.stack.pop().unwrap(), Val::Num(1.5));
    }
}
