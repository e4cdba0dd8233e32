use super::{SymbolId, SymbolNode};
use crate::error::{CompileError, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Arena of every symbol known to one type system.
///
/// Accessors run a closure under the entry guard and never call back into
/// the table, so no guard is ever held across another table operation.
#[derive(Debug)]
pub struct SymbolTable {
    nodes: DashMap<SymbolId, SymbolNode>,
    next_id: AtomicU32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn alloc(&self, node: SymbolNode) -> SymbolId {
        let id = SymbolId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.nodes.insert(id, node);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn read<R>(&self, id: SymbolId, f: impl FnOnce(&SymbolNode) -> R) -> Result<R> {
        let node = self.nodes.get(&id).ok_or(CompileError::DanglingSymbol(id.0))?;
        Ok(f(&node))
    }

    pub fn write<R>(&self, id: SymbolId, f: impl FnOnce(&mut SymbolNode) -> R) -> Result<R> {
        let mut node = self
            .nodes
            .get_mut(&id)
            .ok_or(CompileError::DanglingSymbol(id.0))?;
        Ok(f(&mut node))
    }

    /// Snapshot of a node.
    pub fn get(&self, id: SymbolId) -> Result<SymbolNode> {
        self.read(id, SymbolNode::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;

    #[test]
    fn test_ids_are_unique_and_stable() {
        let table = SymbolTable::new();
        let a = table.alloc(SymbolNode::new("a", SymbolKind::Variable));
        let b = table.alloc(SymbolNode::new("b", SymbolKind::Variable));
        assert_ne!(a, b);
        assert_eq!(table.read(a, |n| n.name.clone()).unwrap(), "a");
        table.write(b, |n| n.out_of_scope = true).unwrap();
        assert!(table.get(b).unwrap().out_of_scope);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let table = SymbolTable::new();
        let err = table.read(SymbolId(99), |_| ()).unwrap_err();
        assert!(matches!(err, CompileError::DanglingSymbol(99)));
    }
}
