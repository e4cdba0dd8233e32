use super::SymbolId;
use indexmap::IndexMap;

/// Name-indexed, insertion-ordered member list of a scope.
///
/// Position in the dictionary is definition order. There is deliberately no
/// positional removal: it would shift the slots of every later symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolsDictionary {
    entries: IndexMap<String, SymbolId>,
}

impl SymbolsDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.entries.get(name).copied()
    }

    /// Symbol at position `idx`.
    ///
    /// # Panics
    /// Panics if `idx` is out of range; use [`Self::try_at`] otherwise.
    pub fn at(&self, idx: usize) -> SymbolId {
        self.entries[idx]
    }

    pub fn try_at(&self, idx: usize) -> Option<SymbolId> {
        self.entries.get_index(idx).map(|(_, id)| *id)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    /// Appends `id` under `name` and returns its position, or hands back
    /// the id already registered under that name.
    pub fn add(&mut self, name: &str, id: SymbolId) -> Result<usize, SymbolId> {
        if let Some(existing) = self.find(name) {
            return Err(existing);
        }
        let (idx, _) = self.entries.insert_full(name.to_string(), id);
        Ok(idx)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.entries.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
