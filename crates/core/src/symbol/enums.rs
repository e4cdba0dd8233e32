use super::{SymbolId, SymbolKind, SymbolNode};
use crate::error::{CompileError, Result};
use crate::location::SourceLocation;
use crate::type_system::TypeSystem;
use crate::types::{Type, TypeRef};

impl TypeSystem {
    pub fn new_enum(&self, name: &str, location: Option<SourceLocation>) -> SymbolId {
        self.symbols()
            .alloc(SymbolNode::new(name, SymbolKind::Enum).at(location))
    }

    /// Adds `name = value` to `owner`.
    ///
    /// Existing items are checked in order; for each, a clashing value is
    /// reported before a clashing name.
    pub fn try_add_item(
        &self,
        owner: SymbolId,
        name: &str,
        value: i32,
        location: Option<SourceLocation>,
    ) -> Result<SymbolId> {
        let (enum_name, items) = self
            .symbols()
            .read(owner, |n| (n.name.clone(), n.members.iter().map(|(k, id)| (k.to_string(), id)).collect::<Vec<_>>()))?;
        let at = crate::location::describe(location.as_ref(), name);

        for (item_name, item) in items {
            if self.item_value(item)? == value {
                return Err(CompileError::DuplicateEnumValue {
                    at,
                    owner: enum_name,
                    value,
                });
            }
            if item_name == name {
                return Err(CompileError::DuplicateEnumKey {
                    at,
                    owner: enum_name,
                    name: name.to_string(),
                });
            }
        }

        let node = SymbolNode::new(name, SymbolKind::EnumItem { owner, value })
            .with_type(TypeRef::resolved(enum_name.as_str(), Type::Enum(owner)))
            .at(location);
        let item = self.symbols().alloc(node);
        self.attach(owner, item)?;
        Ok(item)
    }

    pub fn find_value(&self, owner: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        let Some(id) = self.resolve_local(owner, name)? else {
            return Ok(None);
        };
        let is_item = self
            .symbols()
            .read(id, |n| matches!(n.kind, SymbolKind::EnumItem { .. }))?;
        Ok(is_item.then_some(id))
    }

    pub fn item_value(&self, item: SymbolId) -> Result<i32> {
        self.symbols().read(item, |n| match n.kind {
            SymbolKind::EnumItem { value, .. } => Ok(value),
            _ => Err(CompileError::Internal(format!("'{}' is not an enum item", n.name))),
        })?
    }
}
