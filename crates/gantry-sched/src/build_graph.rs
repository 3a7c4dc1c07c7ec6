//! The addressable-object graph contract.
//!
//! The planner consumes the graph through the single-operation
//! [`AddressGraph`] trait; how addresses come to exist (BUILD files, globs,
//! a database) is someone else's problem. [`InMemoryGraph`] is the bundled
//! implementation backing tests and embedders that assemble items directly.

use indexmap::IndexMap;
use thiserror::Error;

use gantry_core::{Address, Item};

/// Errors produced while resolving addresses.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The address does not name a registered item.
    #[error("no addressable object at {address}")]
    AddressNotFound { address: Address },
}

/// Resolves addresses to the serializable items they point to.
///
/// Read-only during planning. Resolution ignores any `@config-name` selector
/// on the address; selectors are applied by the caller against the resolved
/// item's configurations.
pub trait AddressGraph {
    /// Resolves an address to its item.
    fn resolve(&self, address: &Address) -> Result<Item, ResolveError>;
}

/// An address graph held entirely in memory, keyed by bare spec.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    items: IndexMap<String, Item>,
}

impl InMemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        InMemoryGraph::default()
    }

    /// Creates a graph from the given items.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut graph = InMemoryGraph::new();
        for item in items {
            graph.insert(item);
        }
        graph
    }

    /// Registers an item under the bare spec of its address, replacing any
    /// previous item there.
    pub fn insert(&mut self, item: Item) {
        self.items.insert(item.address.base().to_string(), item);
    }

    /// Returns the number of registered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the graph holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl AddressGraph for InMemoryGraph {
    fn resolve(&self, address: &Address) -> Result<Item, ResolveError> {
        self.items
            .get(address.base())
            .cloned()
            .ok_or_else(|| ResolveError::AddressNotFound {
                address: address.clone(),
            })
    }
}
