//! The planner contract: what a task brings to the planning session.
//!
//! A [`Planner`] attaches to one goal, declares which product types it can
//! emit and what inputs each needs (a [`Requirements`] formula in
//! disjunctive normal form), and produces [`Plan`]s on demand. Planners may
//! call back into the [`Scheduler`] for promises covering any inputs they
//! cannot supply themselves.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use gantry_core::{Address, Configuration, Item, Plan, ProductTypeId, Subject};

use crate::error::SchedulingError;
use crate::scheduler::Scheduler;

/// One AND-clause of a requirements formula: every member must be producible
/// for the clause to hold. Clauses are short; stored inline.
pub type Clause = SmallVec<[ProductTypeId; 4]>;

/// Input requirements for one output product type, in disjunctive normal
/// form: the outer clauses are ORed, the product types inside a clause are
/// ANDed.
///
/// An empty clause holds vacuously, so [`Requirements::unconditional`] is
/// the formula for outputs needing no inputs. A formula with no clauses at
/// all can never be satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    clauses: Vec<Clause>,
}

impl Requirements {
    /// A formula that always holds: one empty clause.
    pub fn unconditional() -> Self {
        Requirements {
            clauses: vec![Clause::new()],
        }
    }

    /// A formula with a single AND-clause.
    pub fn single(clause: impl IntoIterator<Item = ProductTypeId>) -> Self {
        Requirements {
            clauses: vec![clause.into_iter().collect()],
        }
    }

    /// A formula with the given OR-ed clauses, in order.
    pub fn any<C>(clauses: impl IntoIterator<Item = C>) -> Self
    where
        C: IntoIterator<Item = ProductTypeId>,
    {
        Requirements {
            clauses: clauses
                .into_iter()
                .map(|clause| clause.into_iter().collect())
                .collect(),
        }
    }

    /// Returns the clauses, in declaration order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

/// Errors a planner raises while producing a plan.
///
/// These propagate out of the scheduling session unchanged.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    /// A dependency address selected a configuration, but the dependency has
    /// no configurations at all.
    #[error(
        "the dependency of {dependee} on {dependency} selects configuration \
         '{selector}' but {dependency} has no configurations"
    )]
    MissingConfigurations {
        dependee: Address,
        dependency: Address,
        selector: String,
    },

    /// A dependency address selected a configuration name the dependency
    /// does not define.
    #[error("{dependency} has no configuration named '{selector}' (selected by {dependee})")]
    UnknownConfiguration {
        dependee: Address,
        dependency: Address,
        selector: String,
    },
}

/// Produces plans to control execution of a paired task.
pub trait Planner: Send + Sync {
    /// Diagnostic name, used in conflict and partial-consumption reports.
    fn name(&self) -> &str;

    /// The goal this planner's task runs from.
    fn goal_name(&self) -> &str;

    /// Output product types mapped to their input requirements.
    fn product_types(&self) -> IndexMap<ProductTypeId, Requirements>;

    /// Produces a plan for the given product type and subject, or `None` if
    /// this planner has nothing to offer for the subject.
    ///
    /// The scheduler supplies promises for any inputs the planner cannot
    /// provide to its task on its own.
    fn plan(
        &self,
        scheduler: &mut dyn Scheduler,
        product_type: ProductTypeId,
        subject: &Subject,
        configuration: Option<&Configuration>,
    ) -> Result<Option<Plan>, SchedulingError>;

    /// Called once per output type after all per-subject planning has
    /// completed, with every plan this planner emitted for that output.
    ///
    /// Returning `None` keeps the plans as they are. Returning
    /// `Some(replacements)` re-registers the replacements in place of the
    /// originals -- the union of subjects across the replacements must equal
    /// the union across the originals, or promises for the missing subjects
    /// keep resolving to the superseded per-subject plans.
    fn finalize_plans(&self, plans: &[Arc<Plan>]) -> Option<Vec<Plan>> {
        let _ = plans;
        None
    }
}

/// Walks a subject's configured dependencies.
///
/// For every dependency address declared by a configuration on any
/// derivation of `subject`, resolves the dependency and applies the
/// address's `@config-name` selector against the dependency's own
/// configurations. Yields `(dependency, selected_configuration)` pairs,
/// where the configuration is `None` for unselected dependencies.
pub fn iter_configured_dependencies(
    scheduler: &dyn Scheduler,
    subject: &Subject,
) -> Result<Vec<(Item, Option<Configuration>)>, SchedulingError> {
    let mut dependencies = Vec::new();
    for derivation in subject.derivations() {
        for config in &derivation.configurations {
            for dependency_address in &config.dependencies {
                let dependency = scheduler.resolve(dependency_address)?;
                let configuration = match dependency_address.config_selector() {
                    None => None,
                    Some(selector) => {
                        if dependency.configurations.is_empty() {
                            return Err(PlannerError::MissingConfigurations {
                                dependee: derivation.address.clone(),
                                dependency: dependency.address.clone(),
                                selector: selector.to_string(),
                            }
                            .into());
                        }
                        match dependency.select_configuration(selector) {
                            Some(configuration) => Some(configuration.clone()),
                            None => {
                                return Err(PlannerError::UnknownConfiguration {
                                    dependee: derivation.address.clone(),
                                    dependency: dependency.address.clone(),
                                    selector: selector.to_string(),
                                }
                                .into())
                            }
                        }
                    }
                };
                dependencies.push((dependency, configuration));
            }
        }
    }
    Ok(dependencies)
}
