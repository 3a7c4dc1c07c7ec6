//! ProductTypeId and ProductRegistry for nominal product typing.
//!
//! Every product type has a unique [`ProductTypeId`] providing O(1) identity
//! comparison. Planner requirements, promises, and the requirement solver all
//! work over ids; the [`ProductRegistry`] resolves ids back to names for
//! diagnostics.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Unique identifier for a product type.
///
/// The inner value is an index into the [`ProductRegistry`]'s name vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTypeId(pub u32);

impl fmt::Display for ProductTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProductTypeId({})", self.0)
    }
}

/// Registry of all product types known to a planning session.
///
/// Built once before planner registration; planners and subjects refer to
/// products exclusively by [`ProductTypeId`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductRegistry {
    /// Names indexed by ProductTypeId.0
    names: Vec<String>,
    /// Reverse lookup from name to id.
    by_name: HashMap<String, ProductTypeId>,
}

impl ProductRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ProductRegistry::default()
    }

    /// Registers a product type name and returns its new [`ProductTypeId`].
    ///
    /// Returns [`CoreError::DuplicateProductType`] if the name already exists.
    pub fn register(&mut self, name: &str) -> Result<ProductTypeId, CoreError> {
        if self.by_name.contains_key(name) {
            return Err(CoreError::DuplicateProductType {
                name: name.to_string(),
            });
        }
        let id = ProductTypeId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a product type's name by id.
    pub fn name(&self, id: ProductTypeId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Looks up a product type id by name.
    pub fn id(&self, name: &str) -> Option<ProductTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the registered name for diagnostics, falling back to the raw
    /// id for types the registry does not know.
    pub fn display_name(&self, id: ProductTypeId) -> String {
        match self.name(id) {
            Some(name) => name.to_string(),
            None => id.to_string(),
        }
    }

    /// Returns the number of registered product types.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no product types are registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_returns_sequential_ids() {
        let mut registry = ProductRegistry::new();
        let sources = registry.register("Sources").unwrap();
        let classes = registry.register("Classes").unwrap();

        assert_eq!(sources, ProductTypeId(0));
        assert_eq!(classes, ProductTypeId(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_name_returns_error() {
        let mut registry = ProductRegistry::new();
        registry.register("Sources").unwrap();

        match registry.register("Sources") {
            Err(CoreError::DuplicateProductType { name }) => assert_eq!(name, "Sources"),
            other => panic!("expected DuplicateProductType, got {:?}", other),
        }
    }

    #[test]
    fn name_and_id_roundtrip() {
        let mut registry = ProductRegistry::new();
        let classes = registry.register("Classes").unwrap();

        assert_eq!(registry.name(classes), Some("Classes"));
        assert_eq!(registry.id("Classes"), Some(classes));
        assert_eq!(registry.id("Docs"), None);
    }

    #[test]
    fn display_name_falls_back_to_raw_id() {
        let registry = ProductRegistry::new();
        assert_eq!(registry.display_name(ProductTypeId(7)), "ProductTypeId(7)");
    }

    #[test]
    fn serde_roundtrip() {
        let mut registry = ProductRegistry::new();
        registry.register("Sources").unwrap();

        let json = serde_json::to_string(&registry).unwrap();
        let back: ProductRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id("Sources"), Some(ProductTypeId(0)));
    }
}
