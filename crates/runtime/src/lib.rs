//! Runtime value layer shared by the semantic core and the virtual machine.
//!
//! Native bindings produced by the type system (array and map methods,
//! built-in functions, field accessors) only ever see the types in this
//! crate: a value stack, the values on it, and the frame capability that
//! hands them out. The concrete VM lives elsewhere and implements
//! [`NativeFrame`].

pub mod error;
pub mod native;
pub mod stack;
pub mod value;

pub use error::{Result, RuntimeError};
pub use native::{CallStatus, FieldAccessor, FuncArgsInfo, NativeCallable, NativeFrame, StackFrame};
pub use stack::ValStack;
pub use value::{MapKey, NativeValue, Val, ValList, ValMap};
