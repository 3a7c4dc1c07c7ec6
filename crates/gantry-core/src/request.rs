//! The user-requested build.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Describes a build: the goals to run and the addresses to run them for.
///
/// Both lists are ordered; the scheduler processes goals and roots in the
/// order given here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Goal names, in command-line order.
    pub goals: Vec<String>,
    /// Root addresses, in command-line order.
    pub addressable_roots: Vec<Address>,
}

impl BuildRequest {
    /// Creates a build request.
    pub fn new(
        goals: impl IntoIterator<Item = impl Into<String>>,
        addressable_roots: impl IntoIterator<Item = impl Into<Address>>,
    ) -> Self {
        BuildRequest {
            goals: goals.into_iter().map(Into::into).collect(),
            addressable_roots: addressable_roots.into_iter().map(Into::into).collect(),
        }
    }
}
