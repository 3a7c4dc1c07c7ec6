//! The product mapper: promises to the plans that will satisfy them.
//!
//! Plans are interned by structural identity, so a planner returning the
//! same work for several subjects (or several planning paths reaching
//! structurally equal work) stores one plan reachable through many promise
//! keys. Registration indexes a plan under *every* subject it covers, which
//! is what lets dependents consume products from chunking tasks -- even
//! tasks that act globally.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use thiserror::Error;

use gantry_core::{Address, Configuration, Plan, ProductTypeId, Promise, Subject};

/// Registration of a plan that does not cover the expected primary subject.
#[derive(Debug, Clone, Error)]
#[error("the subject {subject} is not part of the registered plan")]
pub struct InvalidRegistrationError {
    pub subject: Address,
}

/// Stores the mapping from promises to the plans whose execution will
/// satisfy them.
#[derive(Debug, Default)]
pub struct ProductMapper {
    promises: HashMap<Promise, Arc<Plan>>,
    /// Interning pool; structural identity deduplicates.
    plans: IndexSet<Arc<Plan>>,
}

impl ProductMapper {
    /// Creates an empty mapper.
    pub fn new() -> Self {
        ProductMapper::default()
    }

    fn intern(&mut self, plan: Plan) -> Arc<Plan> {
        if let Some(existing) = self.plans.get(&plan) {
            return Arc::clone(existing);
        }
        let plan = Arc::new(plan);
        self.plans.insert(Arc::clone(&plan));
        plan
    }

    /// Registers the promises the given plan will satisfy when executed:
    /// one per subject the plan covers.
    ///
    /// Returns the interned plan. Used by the finalization pass, which has
    /// no primary-subject constraint.
    pub fn register(
        &mut self,
        product_type: ProductTypeId,
        plan: Plan,
        configuration: Option<&Configuration>,
    ) -> Arc<Plan> {
        let plan = self.intern(plan);
        for subject in plan.subjects() {
            let promise = Promise::new(product_type, subject.clone(), configuration.cloned());
            self.promises.insert(promise, Arc::clone(&plan));
        }
        plan
    }

    /// Registers the plan's promises and returns the one for the primary
    /// subject.
    ///
    /// Returns [`InvalidRegistrationError`] if the primary subject is not a
    /// member of the plan's subjects. Promises for the other subjects are
    /// indexed either way.
    pub fn register_for(
        &mut self,
        product_type: ProductTypeId,
        plan: Plan,
        primary_subject: &Subject,
        configuration: Option<&Configuration>,
    ) -> Result<(Promise, Arc<Plan>), InvalidRegistrationError> {
        let plan = self.intern(plan);
        let mut primary_promise = None;
        for subject in plan.subjects() {
            let promise = Promise::new(product_type, subject.clone(), configuration.cloned());
            if subject.identity_key() == primary_subject.identity_key() {
                primary_promise = Some(promise.clone());
            }
            self.promises.insert(promise, Arc::clone(&plan));
        }
        match primary_promise {
            Some(promise) => Ok((promise, plan)),
            None => Err(InvalidRegistrationError {
                subject: primary_subject.identity_key().clone(),
            }),
        }
    }

    /// Returns the plan that was promised, or `None` for "not yet planned".
    pub fn promised(&self, promise: &Promise) -> Option<Arc<Plan>> {
        self.promises.get(promise).cloned()
    }

    /// Returns the number of distinct plans registered.
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    /// Returns the number of promise keys registered.
    pub fn promise_count(&self) -> usize {
        self.promises.len()
    }
}
