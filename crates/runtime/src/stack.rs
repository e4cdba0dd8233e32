use crate::error::{Result, RuntimeError};
use crate::value::Val;

/// The operand stack a frame exposes to native code.
#[derive(Debug, Default, Clone)]
pub struct ValStack {
    vals: Vec<Val>,
}

impl ValStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    pub fn push(&mut self, v: Val) {
        self.vals.push(v);
    }

    /// Pops the top value; the caller owns (and eventually releases) it.
    pub fn pop(&mut self) -> Result<Val> {
        self.vals.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pops a numeric operand, releasing the popped value immediately.
    pub fn pop_num(&mut self) -> Result<f64> {
        self.pop()?.as_num()
    }

    pub fn peek(&self) -> Result<&Val> {
        self.vals.last().ok_or(RuntimeError::StackUnderflow)
    }

    /// The value `depth` slots below the top; `peek_at(0)` is `peek()`.
    pub fn peek_at(&self, depth: usize) -> Result<&Val> {
        self.vals
            .len()
            .checked_sub(depth + 1)
            .map(|i| &self.vals[i])
            .ok_or(RuntimeError::StackUnderflow)
    }

    pub fn clear(&mut self) {
        self.vals.clear();
    }
}
