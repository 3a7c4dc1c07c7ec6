//! Promises: handles to products some plan will produce.
//!
//! A [`Promise`] identifies "product P for subject S under configuration C".
//! Its equality and hash key is `(product_type, subject.identity_key(),
//! configuration)` -- the subject's alternate is deliberately excluded so
//! that consumer-side identity stays stable whichever plan suggested the
//! alternate.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::item::Configuration;
use crate::product::ProductTypeId;
use crate::subject::Subject;

/// A promise to produce a given product type for a given subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promise {
    product_type: ProductTypeId,
    subject: Subject,
    configuration: Option<Configuration>,
}

impl Promise {
    /// Creates a promise for the given product type, subject, and optional
    /// requested configuration.
    pub fn new(
        product_type: ProductTypeId,
        subject: Subject,
        configuration: Option<Configuration>,
    ) -> Self {
        Promise {
            product_type,
            subject,
            configuration,
        }
    }

    /// Returns the promised product type.
    pub fn product_type(&self) -> ProductTypeId {
        self.product_type
    }

    /// Returns the subject the product will be produced for.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Returns the requested configuration, if any.
    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    /// Returns a version of this promise bound to a new subject, keeping the
    /// product type and configuration.
    pub fn rebind(&self, subject: Subject) -> Promise {
        Promise {
            product_type: self.product_type,
            subject,
            configuration: self.configuration.clone(),
        }
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        self.product_type == other.product_type
            && self.subject.identity_key() == other.subject.identity_key()
            && self.configuration == other.configuration
    }
}

impl Eq for Promise {}

impl Hash for Promise {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.product_type.hash(state);
        self.subject.identity_key().hash(state);
        self.configuration.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    use std::collections::hash_map::DefaultHasher;

    const CLASSES: ProductTypeId = ProductTypeId(0);
    const SOURCES: ProductTypeId = ProductTypeId(1);

    fn hash_of(promise: &Promise) -> u64 {
        let mut hasher = DefaultHasher::new();
        promise.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equality_ignores_alternate_subject() {
        let a = Promise::new(
            CLASSES,
            Subject::with_alternate(Item::new("lib"), Item::new("alt-1")),
            None,
        );
        let b = Promise::new(
            CLASSES,
            Subject::with_alternate(Item::new("lib"), Item::new("alt-2")),
            None,
        );
        let c = Promise::new(CLASSES, Subject::new(Item::new("lib")), None);

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn product_type_distinguishes() {
        let subject = Subject::new(Item::new("lib"));
        let a = Promise::new(CLASSES, subject.clone(), None);
        let b = Promise::new(SOURCES, subject, None);
        assert_ne!(a, b);
    }

    #[test]
    fn configuration_distinguishes() {
        let subject = Subject::new(Item::new("lib"));
        let config = Configuration::new(SOURCES).named("debug");

        let bare = Promise::new(CLASSES, subject.clone(), None);
        let configured = Promise::new(CLASSES, subject, Some(config));
        assert_ne!(bare, configured);
    }

    #[test]
    fn rebind_keeps_product_type_and_configuration() {
        let config = Configuration::new(SOURCES).named("debug");
        let promise = Promise::new(
            CLASSES,
            Subject::new(Item::new("lib")),
            Some(config.clone()),
        );

        let rebound = promise.rebind(Subject::new(Item::new("other")));
        assert_eq!(rebound.product_type(), CLASSES);
        assert_eq!(rebound.subject().identity_key().as_str(), "other");
        assert_eq!(rebound.configuration(), Some(&config));
        assert_ne!(promise, rebound);
    }

    proptest::proptest! {
        /// Promises for the same primary compare equal whatever the
        /// alternates are.
        #[test]
        fn primary_drives_identity(
            primary in "[a-z]{1,8}",
            alt_a in proptest::option::of("[a-z]{1,8}"),
            alt_b in proptest::option::of("[a-z]{1,8}"),
        ) {
            let subject = |alt: &Option<String>| match alt {
                Some(alt) => Subject::with_alternate(Item::new(primary.clone()), Item::new(alt.clone())),
                None => Subject::new(Item::new(primary.clone())),
            };
            let a = Promise::new(CLASSES, subject(&alt_a), None);
            let b = Promise::new(CLASSES, subject(&alt_b), None);
            proptest::prop_assert_eq!(&a, &b);
            proptest::prop_assert_eq!(hash_of(&a), hash_of(&b));
        }
    }
}
