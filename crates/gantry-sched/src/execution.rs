//! The execution graph: the plan DAG a planning session produced.
//!
//! [`ExecutionGraph::walk`] materializes the plans reachable from the root
//! promises as a petgraph `DiGraph` -- one node per distinct plan, edges
//! pointing at dependencies -- and yields a depth-first post-order over it:
//! every plan exactly once, dependencies before dependents, which is
//! precisely an executable order.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use gantry_core::{Plan, ProductRegistry, Promise};

use crate::error::SchedulingError;
use crate::mapper::ProductMapper;

/// A DAG of execution plans where edges represent data dependencies.
#[derive(Debug)]
pub struct ExecutionGraph {
    root_promises: Vec<Promise>,
    product_mapper: ProductMapper,
    products: Arc<ProductRegistry>,
}

impl ExecutionGraph {
    pub(crate) fn new(
        root_promises: Vec<Promise>,
        product_mapper: ProductMapper,
        products: Arc<ProductRegistry>,
    ) -> Self {
        ExecutionGraph {
            root_promises,
            product_mapper,
            products,
        }
    }

    /// Returns the root promises: the final products the build request
    /// asked for, in issue order.
    pub fn root_promises(&self) -> &[Promise] {
        &self.root_promises
    }

    /// Returns the plan registered for a promise, or `None`.
    pub fn plan_for(&self, promise: &Promise) -> Option<Arc<Plan>> {
        self.product_mapper.promised(promise)
    }

    /// Performs a depth-first post-order walk of the plan DAG.
    ///
    /// Each plan is visited exactly once, after every plan it depends on,
    /// paired with the promise it was first reached through. Fails with
    /// [`SchedulingError::UnfulfilledPromise`] if any reachable promise has
    /// no registered plan.
    pub fn walk(&self) -> Result<Vec<(Promise, Arc<Plan>)>, SchedulingError> {
        let mut dag: DiGraph<(Promise, Arc<Plan>), ()> = DiGraph::new();
        let mut indices: HashMap<Arc<Plan>, NodeIndex> = HashMap::new();

        let mut roots = Vec::with_capacity(self.root_promises.len());
        for promise in &self.root_promises {
            roots.push(self.add_plan(promise, &mut dag, &mut indices)?);
        }

        let mut order = Vec::with_capacity(dag.node_count());
        let mut dfs = DfsPostOrder::empty(&dag);
        for root in roots {
            // Restart from each root, keeping the finished set so plans
            // shared between roots are yielded once.
            dfs.move_to(root);
            while let Some(node) = dfs.next(&dag) {
                let (promise, plan) = &dag[node];
                order.push((promise.clone(), Arc::clone(plan)));
            }
        }
        Ok(order)
    }

    fn add_plan(
        &self,
        promise: &Promise,
        dag: &mut DiGraph<(Promise, Arc<Plan>), ()>,
        indices: &mut HashMap<Arc<Plan>, NodeIndex>,
    ) -> Result<NodeIndex, SchedulingError> {
        let Some(plan) = self.product_mapper.promised(promise) else {
            return Err(SchedulingError::UnfulfilledPromise {
                product_type: self.products.display_name(promise.product_type()),
                subject: promise.subject().identity_key().clone(),
            });
        };
        if let Some(&index) = indices.get(&plan) {
            return Ok(index);
        }

        let index = dag.add_node((promise.clone(), Arc::clone(&plan)));
        indices.insert(Arc::clone(&plan), index);

        let dependencies: Vec<Promise> = plan.promises().into_iter().cloned().collect();
        for dependency in &dependencies {
            let child = self.add_plan(dependency, dag, indices)?;
            dag.add_edge(index, child, ());
        }
        Ok(index)
    }
}
