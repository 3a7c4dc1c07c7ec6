//! Scheduling error types.
//!
//! Every failure here is fatal to the planning session; there is no local
//! recovery. Messages are built to be diagnostic: they carry the resolved
//! product name, the subject's address, and (for partial consumption) the
//! full requirement breakdown showing which missing input would have
//! unblocked which planner.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use gantry_core::Address;

use crate::build_graph::ResolveError;
use crate::mapper::InvalidRegistrationError;
use crate::planner::PlannerError;

/// The partial-consumption breakdown, resolved to names:
/// consumed product -> planner -> the inputs that planner still needed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialBreakdown(pub IndexMap<String, IndexMap<String, Vec<String>>>);

impl fmt::Display for PartialBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (consumed, planners) in &self.0 {
            writeln!(f, "  to consume {consumed}:")?;
            for (planner, needed) in planners {
                writeln!(f, "    {planner} needed ({})", needed.join(" OR "))?;
            }
        }
        Ok(())
    }
}

/// Errors raised while formulating an execution graph.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// No planner and no native product could produce the requested type.
    #[error("no plans to generate {product_type} for {subject} could be made")]
    NoProducers {
        product_type: String,
        subject: Address,
    },

    /// More than one producer volunteered a plan for the same promise.
    #[error(
        "multiple producers for {product_type} from {subject}: {}",
        .planners.join(", ")
    )]
    ConflictingProducers {
        product_type: String,
        subject: Address,
        planners: Vec<String>,
    },

    /// An input product was consumed by some planner's clause but never
    /// fully consumed by any planner.
    #[error(
        "while attempting to produce {output} for {subject}, \
         some products could not be consumed:\n{breakdown}"
    )]
    PartiallyConsumedInputs {
        output: String,
        subject: Address,
        breakdown: PartialBreakdown,
    },

    /// A planner produced a plan whose subjects do not cover the subject it
    /// was planning for.
    #[error("the plan produced for {subject} by {planner} does not cover {subject}")]
    Registration {
        subject: Address,
        planner: String,
        #[source]
        source: InvalidRegistrationError,
    },

    /// A promise reachable from the execution graph has no registered plan.
    #[error("no plan registered for the promise of {product_type} for {subject}")]
    UnfulfilledPromise {
        product_type: String,
        subject: Address,
    },

    /// A planner failed while producing a plan.
    #[error(transparent)]
    Planner(#[from] PlannerError),

    /// An address failed to resolve through the graph.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
