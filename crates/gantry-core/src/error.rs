//! Core error types for the gantry data model.
//!
//! Uses `thiserror` for structured, matchable error variants. Scheduling
//! errors live in the scheduler crate; these cover the data model itself.

use thiserror::Error;

use crate::promise::Promise;

/// Errors produced by the gantry-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Attempting to register a product type name that already exists.
    #[error("duplicate product type name: '{name}'")]
    DuplicateProductType { name: String },

    /// Binding a plan whose promise has no delivered product.
    #[error("no product supplied for promise {promise:?}")]
    UnboundPromise { promise: Promise },
}
