//! Addressable items and their configurations.
//!
//! An [`Item`] is the serializable object an address resolves to: it is what
//! subjects wrap and what plans produce products for. Its [`Configuration`]s
//! serve two roles at once:
//! - each configuration is an *instance of a product type*, so the set of
//!   configuration types is the item's native products;
//! - a configuration may declare dependencies on other addresses, which
//!   planners walk to request products recursively.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::product::ProductTypeId;
use crate::value::Value;

/// A configuration attached to an item.
///
/// Configurations are selected by name with an `@config-name` address suffix
/// and matched by planners through their product type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    /// Selection name, if this configuration can be addressed with `@name`.
    pub name: Option<String>,
    /// The product type this configuration is an instance of.
    pub product_type: ProductTypeId,
    /// Addresses this configuration depends on, possibly carrying their own
    /// `@config-name` selectors.
    pub dependencies: Vec<Address>,
    /// Opaque payload, e.g. a file list for a sources configuration.
    pub data: Value,
}

impl Configuration {
    /// Creates an anonymous configuration of the given product type with no
    /// dependencies and a null payload.
    pub fn new(product_type: ProductTypeId) -> Self {
        Configuration {
            name: None,
            product_type,
            dependencies: Vec::new(),
            data: Value::Null,
        }
    }

    /// Sets the selection name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the dependency addresses.
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Address>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Sets the payload.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }
}

/// An addressable, serializable object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// The address this item was registered under.
    pub address: Address,
    /// Configurations in declaration order.
    pub configurations: Vec<Configuration>,
}

impl Item {
    /// Creates an item with no configurations.
    pub fn new(address: impl Into<Address>) -> Self {
        Item {
            address: address.into(),
            configurations: Vec::new(),
        }
    }

    /// Sets the configurations.
    pub fn with_configurations(
        mut self,
        configurations: impl IntoIterator<Item = Configuration>,
    ) -> Self {
        self.configurations = configurations.into_iter().collect();
        self
    }

    /// Iterates the product types of this item's configurations, in
    /// declaration order. Duplicates are possible; subjects dedup.
    pub fn products(&self) -> impl Iterator<Item = ProductTypeId> + '_ {
        self.configurations.iter().map(|c| c.product_type)
    }

    /// Finds a configuration by selection name.
    pub fn select_configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }

    /// Finds the first configuration carrying the given product type.
    pub fn native(&self, product_type: ProductTypeId) -> Option<&Configuration> {
        self.configurations
            .iter()
            .find(|c| c.product_type == product_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: ProductTypeId = ProductTypeId(0);
    const CLASSES: ProductTypeId = ProductTypeId(1);

    #[test]
    fn products_follow_declaration_order() {
        let item = Item::new("lib").with_configurations([
            Configuration::new(CLASSES),
            Configuration::new(SOURCES),
        ]);
        let products: Vec<_> = item.products().collect();
        assert_eq!(products, vec![CLASSES, SOURCES]);
    }

    #[test]
    fn select_configuration_matches_by_name() {
        let item = Item::new("lib").with_configurations([
            Configuration::new(SOURCES).named("debug"),
            Configuration::new(SOURCES).named("release"),
        ]);

        let debug = item.select_configuration("debug").unwrap();
        assert_eq!(debug.name.as_deref(), Some("debug"));
        assert!(item.select_configuration("profile").is_none());
    }

    #[test]
    fn anonymous_configurations_are_not_selectable() {
        let item = Item::new("lib").with_configurations([Configuration::new(SOURCES)]);
        assert!(item.select_configuration("").is_none());
    }

    #[test]
    fn native_returns_first_matching_configuration() {
        let first = Configuration::new(SOURCES).with_data("first");
        let second = Configuration::new(SOURCES).with_data("second");
        let item = Item::new("lib").with_configurations([first.clone(), second]);

        assert_eq!(item.native(SOURCES), Some(&first));
        assert!(item.native(CLASSES).is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let item = Item::new("lib").with_configurations([Configuration::new(SOURCES)
            .named("debug")
            .with_dependencies([Address::new("dep@release")])
            .with_data("payload")]);

        let json = serde_json::to_string(&item).unwrap();
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}
