//! Addresses identifying objects in the addressable graph.
//!
//! An [`Address`] is an opaque spec string. A spec may carry a trailing
//! `@config-name` selector which names a configuration on the addressed
//! object; [`Address::config_selector`] extracts it and [`Address::base`]
//! strips it, so resolution and identity always work on the bare spec.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An address in the addressable-object graph, e.g. `src/java/hello` or
/// `src/java/hello@debug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Creates an address from a spec string.
    pub fn new(spec: impl Into<String>) -> Self {
        Address(spec.into())
    }

    /// Returns the full spec, including any `@config-name` selector.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the spec without any configuration selector.
    pub fn base(&self) -> &str {
        match self.0.find('@') {
            Some(at) => &self.0[..at],
            None => &self.0,
        }
    }

    /// Returns the configuration name selected by an `@config-name` suffix,
    /// if present.
    pub fn config_selector(&self) -> Option<&str> {
        self.0.find('@').map(|at| &self.0[at + 1..])
    }

    /// Returns a copy of this address with any selector stripped.
    pub fn without_selector(&self) -> Address {
        Address(self.base().to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(spec: &str) -> Self {
        Address::new(spec)
    }
}

impl From<String> for Address {
    fn from(spec: String) -> Self {
        Address::new(spec)
    }
}
