//! Capabilities handed to native code.
//!
//! A native callback never sees the VM: it receives a [`NativeFrame`], works
//! on the frame's [`ValStack`] following the stack-effect contract documented
//! on the binding, and reports how the call ended through [`CallStatus`].

use crate::error::{Result, RuntimeError};
use crate::stack::ValStack;
use crate::value::Val;

/// How a native call left the calling fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Done,
    Failure,
    /// Park the fiber until it is explicitly resumed.
    Suspend,
    /// Give other fibers one tick, then continue.
    Yield,
}

/// Number of arguments actually passed plus a bitmask of the default
/// arguments the caller relied on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncArgsInfo {
    pub args_num: u8,
    pub defaults_mask: u32,
}

impl FuncArgsInfo {
    pub fn new(args_num: u8) -> Self {
        Self {
            args_num,
            defaults_mask: 0,
        }
    }

    pub fn uses_default(&self, idx: usize) -> bool {
        idx < 32 && self.defaults_mask & (1 << idx) != 0
    }
}

/// The frame a native callback executes in.
pub trait NativeFrame {
    fn stack(&mut self) -> &mut ValStack;

    /// Starts a new fiber running `func`, returning its id.
    fn start_fiber(&mut self, _func: Val) -> Result<i64> {
        Err(RuntimeError::Unsupported("fibers".to_string()))
    }

    fn stop_fiber(&mut self, _fiber_id: i64) -> Result<()> {
        Err(RuntimeError::Unsupported("fibers".to_string()))
    }
}

/// A function implemented by the host.
pub trait NativeCallable: Send + Sync {
    fn call(&self, frame: &mut dyn NativeFrame, args: FuncArgsInfo) -> Result<CallStatus>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut dyn NativeFrame, FuncArgsInfo) -> Result<CallStatus> + Send + Sync,
{
    fn call(&self, frame: &mut dyn NativeFrame, args: FuncArgsInfo) -> Result<CallStatus> {
        self(frame, args)
    }
}

/// Reads and writes one field of an object value.
pub trait FieldAccessor: Send + Sync {
    fn get(&self, ctx: &Val) -> Result<Val>;

    fn set(&self, _ctx: &Val, _v: Val) -> Result<()> {
        Err(RuntimeError::Unsupported("field is read-only".to_string()))
    }
}

/// A bare frame with no fiber support; enough for host-side calls and tests.
#[derive(Debug, Default)]
pub struct StackFrame {
    pub stack: ValStack,
}

impl StackFrame {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativeFrame for StackFrame {
    fn stack(&mut self) -> &mut ValStack {
        &mut self.stack
    }
}
