//! The requirement solver: can an output be produced from a subject's
//! native products?
//!
//! The solver evaluates DNF requirement formulas recursively: a required
//! product type is producible if the subject carries it natively, or if some
//! planner registered for it has a clause whose members are all themselves
//! producible. Two accumulators are threaded through the whole session:
//! - `fully_consumed`: product types consumed by some fully-satisfied
//!   clause;
//! - `partial`: for each producible-but-stranded input, which planner wanted
//!   it and which other inputs that planner was still missing.
//!
//! Termination: the product-type set is finite and an in-progress set marks
//! types currently being resolved as not-yet-producible, so cyclic
//! requirement formulas bottom out instead of recursing forever.

use indexmap::{IndexMap, IndexSet};

use gantry_core::ProductTypeId;

use crate::planner::Requirements;
use crate::registry::{PlannerId, Planners};

/// Partial-consumption accumulator:
/// consumed product -> planner -> unproducible requirements of the clause.
pub(crate) type PartialTable =
    IndexMap<ProductTypeId, IndexMap<PlannerId, IndexSet<ProductTypeId>>>;

/// A requirement-resolution session over one subject's native products.
pub(crate) struct Solver<'a> {
    registry: &'a Planners,
    native: &'a IndexSet<ProductTypeId>,
    /// Shared across every output attempted in the session.
    pub(crate) partial: PartialTable,
    /// Types currently being resolved; treated as not-yet-producible.
    resolving: IndexSet<ProductTypeId>,
}

impl<'a> Solver<'a> {
    pub(crate) fn new(registry: &'a Planners, native: &'a IndexSet<ProductTypeId>) -> Self {
        Solver {
            registry,
            native,
            partial: PartialTable::default(),
            resolving: IndexSet::new(),
        }
    }

    /// Evaluates one planner's formula.
    ///
    /// Returns `true` as soon as a clause is fully satisfied, extending
    /// `fully_consumed` with that clause's members. Clauses that are only
    /// partially satisfied record their producible members in the partial
    /// table before the next clause is tried.
    pub(crate) fn clauses_satisfiable(
        &mut self,
        planner: PlannerId,
        formula: &Requirements,
        fully_consumed: &mut IndexSet<ProductTypeId>,
    ) -> bool {
        for clause in formula.clauses() {
            let matched: Vec<bool> = clause
                .iter()
                .map(|requirement| self.producible(*requirement, fully_consumed))
                .collect();
            let matched_count = matched.iter().filter(|m| **m).count();

            if matched_count == clause.len() {
                fully_consumed.extend(clause.iter().copied());
                return true;
            }
            if matched_count > 0 {
                let unconsumed: IndexSet<ProductTypeId> = clause
                    .iter()
                    .zip(&matched)
                    .filter(|(_, consumed)| !**consumed)
                    .map(|(requirement, _)| *requirement)
                    .collect();
                for (requirement, consumed) in clause.iter().zip(&matched) {
                    if *consumed {
                        self.partial
                            .entry(*requirement)
                            .or_default()
                            .entry(planner)
                            .or_default()
                            .extend(unconsumed.iter().copied());
                    }
                }
            }
        }
        false
    }

    /// Determines whether `output` can be produced from the native products.
    ///
    /// Every planner registered for the output is evaluated, even after one
    /// matches, so the accumulators see the complete picture.
    pub(crate) fn producible(
        &mut self,
        output: ProductTypeId,
        fully_consumed: &mut IndexSet<ProductTypeId>,
    ) -> bool {
        if self.native.contains(&output) {
            // Requirement is directly satisfied.
            return true;
        }
        if !self.registry.is_output(output) {
            // Requirement can't be satisfied.
            return false;
        }
        if !self.resolving.insert(output) {
            // Already resolving this type further up the stack.
            return false;
        }

        let registry = self.registry;
        let mut matched = false;
        if let Some(requirements) = registry.requirements_for(output) {
            for (planner, formula) in requirements {
                matched |= self.clauses_satisfiable(*planner, formula, fully_consumed);
            }
        }

        self.resolving.swap_remove(&output);
        matched
    }
}
