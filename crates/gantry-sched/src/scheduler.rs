//! The local scheduler: the top-level planning driver.
//!
//! [`LocalScheduler::execution_graph`] turns a [`BuildRequest`] into an
//! [`ExecutionGraph`]: for each goal, each root subject, and each producible
//! output type, it issues a promise; planners recurse back through
//! [`Scheduler::promise`] for their inputs, plans register in the
//! [`ProductMapper`], and a finalization pass lets planners aggregate before
//! the graph is handed back. The scheduler is single-threaded, synchronous,
//! and one-shot -- `execution_graph` consumes it.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use gantry_core::{
    Address, BuildRequest, Configuration, Input, Item, Plan, ProductTypeId, Promise, Subject,
    SubjectRef, LIFT_NATIVE_PRODUCT,
};

use crate::build_graph::AddressGraph;
use crate::error::SchedulingError;
use crate::execution::ExecutionGraph;
use crate::mapper::ProductMapper;
use crate::registry::{PlannerId, Planners};

/// Schedules the creation of products.
///
/// This is the surface planners see: they request promises for inputs they
/// cannot supply themselves, and resolve addresses when walking configured
/// dependencies.
pub trait Scheduler {
    /// Returns a promise for a product of the given type for the subject.
    ///
    /// An [`Address`] subject is resolved through the graph first. If a
    /// configuration is supplied, the promise is for the product in that
    /// configuration. Fails if no production plan can be made.
    fn promise(
        &mut self,
        subject: SubjectRef,
        product_type: ProductTypeId,
        configuration: Option<&Configuration>,
    ) -> Result<Promise, SchedulingError>;

    /// Resolves an address to its item.
    fn resolve(&self, address: &Address) -> Result<Item, SchedulingError>;
}

/// A scheduler that formulates an execution graph locally.
pub struct LocalScheduler {
    graph: Box<dyn AddressGraph>,
    planners: Planners,
    product_mapper: ProductMapper,
    /// Plans per planner per output type, in emission order, feeding the
    /// finalization pass. The `None` key holds synthetic native-lift plans,
    /// which are never finalized.
    plans: IndexMap<Option<PlannerId>, IndexMap<ProductTypeId, IndexSet<Arc<Plan>>>>,
}

impl LocalScheduler {
    /// Creates a scheduler over the given address graph and planner
    /// registry.
    pub fn new(graph: Box<dyn AddressGraph>, planners: Planners) -> Self {
        LocalScheduler {
            graph,
            planners,
            product_mapper: ProductMapper::new(),
            plans: IndexMap::new(),
        }
    }

    /// Creates an execution graph that can satisfy the given build request.
    ///
    /// Goals are processed in request order; within a goal, subjects in
    /// addressable-root order; within a subject, output types in planner
    /// registration order. Root promises land in the graph in exactly the
    /// order they were issued. Consumes the scheduler: planning sessions are
    /// one-shot.
    pub fn execution_graph(
        mut self,
        build_request: &BuildRequest,
    ) -> Result<ExecutionGraph, SchedulingError> {
        let mut subjects = Vec::with_capacity(build_request.addressable_roots.len());
        for address in &build_request.addressable_roots {
            subjects.push(Subject::new(self.graph.resolve(address)?));
        }

        let mut root_promises = Vec::new();
        for goal in &build_request.goals {
            let goal_planners = self.planners.for_goal(goal).to_vec();
            let mut output_types = IndexSet::new();
            for planner_id in &goal_planners {
                output_types.extend(self.planners.planner(*planner_id).product_types().keys());
            }
            let output_types: Vec<ProductTypeId> = output_types.into_iter().collect();
            trace!(%goal, outputs = output_types.len(), "planning goal");

            for subject in &subjects {
                let producible = self
                    .planners
                    .produced_types_for_subject(subject, &output_types)?;
                for product_type in producible {
                    root_promises.push(self.promise(subject.clone().into(), product_type, None)?);
                }
            }
        }

        self.finalize();
        debug!(
            roots = root_promises.len(),
            plans = self.product_mapper.plan_count(),
            "planning session complete"
        );

        Ok(ExecutionGraph::new(
            root_promises,
            self.product_mapper,
            Arc::clone(self.planners.products()),
        ))
    }

    /// Gives aggregating planners a chance to replace their plans.
    ///
    /// Replacements are re-registered with no primary-subject constraint and
    /// no configuration; promises for subjects present in a replacement pick
    /// up the new mapping.
    fn finalize(&mut self) {
        for (planner_id, by_output) in &self.plans {
            let Some(planner_id) = *planner_id else {
                continue;
            };
            let planner = Arc::clone(self.planners.planner(planner_id));
            for (output_type, plans) in by_output {
                let emitted: Vec<Arc<Plan>> = plans.iter().cloned().collect();
                if let Some(replacements) = planner.finalize_plans(&emitted) {
                    debug!(
                        planner = planner.name(),
                        emitted = emitted.len(),
                        replacements = replacements.len(),
                        "finalization replaced plans"
                    );
                    for plan in replacements {
                        self.product_mapper.register(*output_type, plan, None);
                    }
                }
            }
        }
    }

    fn as_subject(&self, subject: SubjectRef) -> Result<Subject, SchedulingError> {
        match subject {
            SubjectRef::Subject(subject) => Ok(subject),
            SubjectRef::Address(address) => Ok(Subject::new(self.graph.resolve(&address)?)),
        }
    }

    fn product_name(&self, product_type: ProductTypeId) -> String {
        self.planners.products().display_name(product_type)
    }

    /// The synthetic plan that lifts a product already carried by the
    /// subject.
    fn native_lift_plan(subject: &Subject, product_type: ProductTypeId) -> Plan {
        Plan::new(
            LIFT_NATIVE_PRODUCT,
            [subject.clone()],
            [
                ("subject", Input::Subject(subject.clone())),
                ("product_type", Input::ProductType(product_type)),
            ],
        )
    }
}

impl Scheduler for LocalScheduler {
    fn promise(
        &mut self,
        subject: SubjectRef,
        product_type: ProductTypeId,
        configuration: Option<&Configuration>,
    ) -> Result<Promise, SchedulingError> {
        let subject = self.as_subject(subject)?;

        let promise = Promise::new(product_type, subject.clone(), configuration.cloned());
        if self.product_mapper.promised(&promise).is_some() {
            trace!(
                subject = %subject.identity_key(),
                product = %self.product_name(product_type),
                "promise already planned"
            );
            return Ok(promise);
        }

        let mut candidates: Vec<(Option<PlannerId>, Plan)> = Vec::new();
        for planner_id in self
            .planners
            .planners_for(product_type, &subject, configuration)
        {
            let planner = Arc::clone(self.planners.planner(planner_id));
            if let Some(plan) = planner.plan(self, product_type, &subject, configuration)? {
                candidates.push((Some(planner_id), plan));
            }
        }
        // A product the subject already carries natively is lifted off the
        // subject by a synthetic plan.
        if subject.products().contains(&product_type) {
            candidates.push((None, Self::native_lift_plan(&subject, product_type)));
        }

        // TODO: multiple plans should be legal for mergeable products like
        // classpaths; merge instead of rejecting.
        if candidates.len() > 1 {
            let planners = candidates
                .iter()
                .map(|(id, _)| self.planners.planner_name(*id).to_string())
                .collect();
            return Err(SchedulingError::ConflictingProducers {
                product_type: self.product_name(product_type),
                subject: subject.identity_key().clone(),
                planners,
            });
        }
        let Some((planner_id, plan)) = candidates.pop() else {
            return Err(SchedulingError::NoProducers {
                product_type: self.product_name(product_type),
                subject: subject.identity_key().clone(),
            });
        };

        match self
            .product_mapper
            .register_for(product_type, plan, &subject, configuration)
        {
            Ok((primary_promise, plan)) => {
                debug!(
                    subject = %subject.identity_key(),
                    product = %self.product_name(product_type),
                    planner = self.planners.planner_name(planner_id),
                    "planned"
                );
                self.plans
                    .entry(planner_id)
                    .or_default()
                    .entry(product_type)
                    .or_default()
                    .insert(plan);
                Ok(primary_promise)
            }
            Err(source) => Err(SchedulingError::Registration {
                subject: subject.identity_key().clone(),
                planner: self.planners.planner_name(planner_id).to_string(),
                source,
            }),
        }
    }

    fn resolve(&self, address: &Address) -> Result<Item, SchedulingError> {
        Ok(self.graph.resolve(address)?)
    }
}
