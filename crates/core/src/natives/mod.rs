//! Native bindings the type system attaches to built-in and structural types.
//!
//! Every callback follows a fixed stack-effect contract, documented on the
//! function that builds it: which operands it pops and in what order, and
//! what it pushes back. The compiler emits calls relying on exactly that.

pub mod array;
pub mod builtins;
pub mod map;

pub use array::{ArrayBackend, GenericArray, TypedArray};

/// Runtime class name shared by every generic array.
pub const GENERIC_ARRAY: &str = "[]";
