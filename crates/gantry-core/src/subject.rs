//! Subjects: the identity a product is produced for.
//!
//! A [`Subject`] pairs a primary item with an optional alternate suggested by
//! some other plan. Identity is deliberately NOT expressed through
//! `PartialEq`/`Hash` impls: callers pick [`Subject::identity_key`] (primary
//! only -- this is what promises and plan identity use) or
//! [`Subject::full_key`] (primary plus alternate, for diagnostics), so the
//! alternate can never leak into consumer-side identity by accident.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::address::Address;
use crate::item::{Configuration, Item};
use crate::product::ProductTypeId;

/// The subject of a production plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    primary: Item,
    alternate: Option<Item>,
}

impl Subject {
    /// Creates a subject with only a primary item.
    pub fn new(primary: Item) -> Self {
        Subject {
            primary,
            alternate: None,
        }
    }

    /// Creates a subject with a primary and an alternate item.
    pub fn with_alternate(primary: Item, alternate: Item) -> Self {
        Subject {
            primary,
            alternate: Some(alternate),
        }
    }

    /// Returns the primary item.
    pub fn primary(&self) -> &Item {
        &self.primary
    }

    /// Returns the alternate item, if any.
    pub fn alternate(&self) -> Option<&Item> {
        self.alternate.as_ref()
    }

    /// The key driving promise and plan identity: the primary address only.
    pub fn identity_key(&self) -> &Address {
        &self.primary.address
    }

    /// The full identity, including the alternate, for diagnostics.
    pub fn full_key(&self) -> (&Address, Option<&Address>) {
        (
            &self.primary.address,
            self.alternate.as_ref().map(|a| &a.address),
        )
    }

    /// Iterates all derivations of this subject: the primary first, then the
    /// alternate if present.
    pub fn derivations(&self) -> SmallVec<[&Item; 2]> {
        let mut derivations = SmallVec::new();
        derivations.push(&self.primary);
        if let Some(alternate) = &self.alternate {
            derivations.push(alternate);
        }
        derivations
    }

    /// Returns the native product types carried by this subject's
    /// derivations, deduplicated, in first-seen order.
    pub fn products(&self) -> IndexSet<ProductTypeId> {
        let mut products = IndexSet::new();
        for derivation in self.derivations() {
            products.extend(derivation.products());
        }
        products
    }

    /// Finds the configuration carrying the given native product type,
    /// searching the primary before the alternate.
    pub fn native(&self, product_type: ProductTypeId) -> Option<&Configuration> {
        self.derivations()
            .into_iter()
            .find_map(|derivation| derivation.native(product_type))
    }
}

impl From<Item> for Subject {
    fn from(item: Item) -> Self {
        Subject::new(item)
    }
}

/// Argument type for scheduler calls: anything a subject can be lifted from.
///
/// Addresses are resolved through the scheduler's graph; items and subjects
/// pass through.
#[derive(Debug, Clone)]
pub enum SubjectRef {
    Subject(Subject),
    Address(Address),
}

impl From<Subject> for SubjectRef {
    fn from(subject: Subject) -> Self {
        SubjectRef::Subject(subject)
    }
}

impl From<Item> for SubjectRef {
    fn from(item: Item) -> Self {
        SubjectRef::Subject(Subject::new(item))
    }
}

impl From<Address> for SubjectRef {
    fn from(address: Address) -> Self {
        SubjectRef::Address(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Configuration;

    const SOURCES: ProductTypeId = ProductTypeId(0);
    const CLASSES: ProductTypeId = ProductTypeId(1);

    fn item(address: &str, products: &[ProductTypeId]) -> Item {
        Item::new(address)
            .with_configurations(products.iter().map(|p| Configuration::new(*p)))
    }

    #[test]
    fn identity_key_ignores_alternate() {
        let with = Subject::with_alternate(item("lib", &[]), item("lib-alt", &[]));
        let without = Subject::new(item("lib", &[]));
        assert_eq!(with.identity_key(), without.identity_key());
    }

    #[test]
    fn full_key_includes_alternate() {
        let subject = Subject::with_alternate(item("lib", &[]), item("lib-alt", &[]));
        let (primary, alternate) = subject.full_key();
        assert_eq!(primary, &Address::new("lib"));
        assert_eq!(alternate, Some(&Address::new("lib-alt")));
    }

    #[test]
    fn derivations_yield_primary_first() {
        let subject = Subject::with_alternate(item("a", &[]), item("b", &[]));
        let addresses: Vec<_> = subject
            .derivations()
            .into_iter()
            .map(|d| d.address.clone())
            .collect();
        assert_eq!(addresses, vec![Address::new("a"), Address::new("b")]);
    }

    #[test]
    fn products_dedup_across_derivations() {
        let subject = Subject::with_alternate(
            item("a", &[SOURCES, CLASSES]),
            item("b", &[CLASSES]),
        );
        let products: Vec<_> = subject.products().into_iter().collect();
        assert_eq!(products, vec![SOURCES, CLASSES]);
    }

    #[test]
    fn native_prefers_primary_derivation() {
        let primary = item("a", &[]).with_configurations([
            Configuration::new(SOURCES).with_data("primary"),
        ]);
        let alternate = item("b", &[]).with_configurations([
            Configuration::new(SOURCES).with_data("alternate"),
        ]);
        let subject = Subject::with_alternate(primary, alternate);

        let found = subject.native(SOURCES).unwrap();
        assert_eq!(found.data, crate::value::Value::from("primary"));
    }

    #[test]
    fn native_falls_back_to_alternate() {
        let subject = Subject::with_alternate(item("a", &[SOURCES]), item("b", &[CLASSES]));
        assert!(subject.native(CLASSES).is_some());
    }
}
