//! Script values as the VM stores them.
//!
//! Cloning a [`Val`] retains the underlying object and dropping it releases
//! it; containers are shared through `Arc`, so a list popped off the stack
//! and mutated in place is the same list every other holder sees.

use crate::error::{Result, RuntimeError};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

pub type ValList = Arc<Mutex<Vec<Val>>>;
pub type ValMap = Arc<Mutex<IndexMap<MapKey, Val>>>;

#[derive(Clone, Default)]
pub enum Val {
    #[default]
    Null,
    Bool(bool),
    Num(f64),
    Str(Arc<str>),
    List(ValList),
    Map(ValMap),
    /// Pointer to a compiled function, by index in the VM's function table.
    Func(u32),
    /// Host-owned storage, e.g. the backing vector of a typed array.
    Native(Arc<dyn Any + Send + Sync>),
}

impl Val {
    pub fn new_list() -> Self {
        Val::List(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn new_map() -> Self {
        Val::Map(Arc::new(Mutex::new(IndexMap::new())))
    }

    pub fn str(s: &str) -> Self {
        Val::Str(Arc::from(s))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Num(_) => "num",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Map(_) => "map",
            Val::Func(_) => "func",
            Val::Native(_) => "native",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn as_num(&self) -> Result<f64> {
        match self {
            Val::Num(n) => Ok(*n),
            other => Err(mismatch("num", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Val::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Val::Str(s) => Ok(s),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn as_list(&self) -> Result<&ValList> {
        match self {
            Val::List(l) => Ok(l),
            other => Err(mismatch("list", other)),
        }
    }

    pub fn as_map(&self) -> Result<&ValMap> {
        match self {
            Val::Map(m) => Ok(m),
            other => Err(mismatch("map", other)),
        }
    }

    pub fn as_native(&self) -> Result<&Arc<dyn Any + Send + Sync>> {
        match self {
            Val::Native(n) => Ok(n),
            other => Err(mismatch("native", other)),
        }
    }

    /// Reads a numeric operand as a container index.
    pub fn as_index(&self) -> Result<i64> {
        Ok(self.as_num()? as i64)
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Null, Val::Null) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Num(a), Val::Num(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::List(a), Val::List(b)) => Arc::ptr_eq(a, b),
            (Val::Map(a), Val::Map(b)) => Arc::ptr_eq(a, b),
            (Val::Func(a), Val::Func(b)) => a == b,
            (Val::Native(a), Val::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Num(n) => write!(f, "{n}"),
            Val::Str(s) => write!(f, "{s:?}"),
            Val::List(l) => write!(f, "list@{:p}", Arc::as_ptr(l)),
            Val::Map(m) => write!(f, "map@{:p}", Arc::as_ptr(m)),
            Val::Func(idx) => write!(f, "func#{idx}"),
            Val::Native(_) => write!(f, "native"),
        }
    }
}

fn mismatch(expected: &'static str, found: &Val) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected,
        found: found.type_name().to_string(),
    }
}

/// Locks value storage, surfacing poisoning as a runtime error.
pub fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock().map_err(|_| RuntimeError::Poisoned)
}

/// Hashable projection of the values allowed as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Num(u64),
    Str(Arc<str>),
}

impl MapKey {
    pub fn from_val(v: &Val) -> Result<Self> {
        match v {
            Val::Bool(b) => Ok(MapKey::Bool(*b)),
            Val::Num(n) => Ok(MapKey::Num(n.to_bits())),
            Val::Str(s) => Ok(MapKey::Str(s.clone())),
            other => Err(mismatch("map key", other)),
        }
    }

    pub fn to_val(&self) -> Val {
        match self {
            MapKey::Bool(b) => Val::Bool(*b),
            MapKey::Num(bits) => Val::Num(f64::from_bits(*bits)),
            MapKey::Str(s) => Val::Str(s.clone()),
        }
    }
}

/// Host types that can back a typed array without boxing every item.
pub trait NativeValue: Sized + Send + 'static {
    fn from_val(v: &Val) -> Result<Self>;
    fn into_val(self) -> Val;
}

impl NativeValue for i64 {
    fn from_val(v: &Val) -> Result<Self> {
        Ok(v.as_num()? as i64)
    }

    fn into_val(self) -> Val {
        Val::Num(self as f64)
    }
}

impl NativeValue for f64 {
    fn from_val(v: &Val) -> Result<Self> {
        v.as_num()
    }

    fn into_val(self) -> Val {
        Val::Num(self)
    }
}

impl NativeValue for bool {
    fn from_val(v: &Val) -> Result<Self> {
        v.as_bool()
    }

    fn into_val(self) -> Val {
        Val::Bool(self)
    }
}

impl NativeValue for String {
    fn from_val(v: &Val) -> Result<Self> {
        Ok(v.as_str()?.to_string())
    }

    fn into_val(self) -> Val {
        Val::Str(Arc::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_clone_shares_storage() {
        let a = Val::new_list();
        let b = a.clone();
        lock(a.as_list().unwrap()).unwrap().push(Val::Num(1.0));
        assert_eq!(lock(b.as_list().unwrap()).unwrap().len(), 1);
        assert_eq!(a, b);
        assert_ne!(a, Val::new_list());
    }

    #[test]
    fn test_map_key_round_trips_numbers() {
        let key = MapKey::from_val(&Val::Num(2.5)).unwrap();
        assert_eq!(key.to_val(), Val::Num(2.5));
        assert!(MapKey::from_val(&Val::Null).is_err());
    }

    #[test]
    fn test_accessors_report_mismatch() {
        let err = Val::str("x").as_num().unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeMismatch {
                expected: "num",
                found: "string".to_string()
            }
        );
        assert_eq!(i64::from_val(&Val::Num(3.9)).unwrap(), 3);
    }
}
