//! The planner registry: a closed-world index of installed planners.
//!
//! Built once from the set of installed planners; after construction the
//! tables are immutable. Indexes by goal name and by output product type,
//! and holds each planner's DNF input requirements for the solver.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use gantry_core::{Configuration, ProductRegistry, ProductTypeId, Subject};

use crate::error::{PartialBreakdown, SchedulingError};
use crate::planner::{Planner, Requirements};
use crate::solver::{PartialTable, Solver};

/// Dense handle for a registered planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlannerId(pub usize);

impl fmt::Display for PlannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registry of task planners indexed by both product type and goal name.
pub struct Planners {
    products: Arc<ProductRegistry>,
    planners: Vec<Arc<dyn Planner>>,
    /// Goal name -> planners, in registration order.
    by_goal: IndexMap<String, Vec<PlannerId>>,
    /// Output product -> planner -> DNF input requirements.
    requirements: IndexMap<ProductTypeId, IndexMap<PlannerId, Requirements>>,
    /// Every product type some planner can emit.
    output_products: IndexSet<ProductTypeId>,
}

impl Planners {
    /// Builds the registry from all planners installed in the system.
    pub fn new(products: Arc<ProductRegistry>, planners: Vec<Arc<dyn Planner>>) -> Self {
        let mut by_goal: IndexMap<String, Vec<PlannerId>> = IndexMap::new();
        let mut requirements: IndexMap<ProductTypeId, IndexMap<PlannerId, Requirements>> =
            IndexMap::new();
        let mut output_products = IndexSet::new();

        for (index, planner) in planners.iter().enumerate() {
            let id = PlannerId(index);
            by_goal
                .entry(planner.goal_name().to_string())
                .or_default()
                .push(id);
            for (output, formula) in planner.product_types() {
                requirements.entry(output).or_default().insert(id, formula);
                output_products.insert(output);
            }
        }

        Planners {
            products,
            planners,
            by_goal,
            requirements,
            output_products,
        }
    }

    /// Returns the product registry used for diagnostics.
    pub fn products(&self) -> &Arc<ProductRegistry> {
        &self.products
    }

    /// Returns the planner behind a handle.
    pub fn planner(&self, id: PlannerId) -> &Arc<dyn Planner> {
        &self.planners[id.0]
    }

    /// Returns the diagnostic name for a planner handle; `None` is the
    /// synthetic native-lift producer.
    pub fn planner_name(&self, id: Option<PlannerId>) -> &str {
        match id {
            Some(id) => self.planners[id.0].name(),
            None => "NoPlanner",
        }
    }

    /// Returns the planners installed in the given goal, in registration
    /// order.
    pub fn for_goal(&self, goal_name: &str) -> &[PlannerId] {
        self.by_goal
            .get(goal_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns every product type some planner can emit.
    pub fn output_products(&self) -> &IndexSet<ProductTypeId> {
        &self.output_products
    }

    pub(crate) fn is_output(&self, product_type: ProductTypeId) -> bool {
        self.output_products.contains(&product_type)
    }

    pub(crate) fn requirements_for(
        &self,
        output: ProductTypeId,
    ) -> Option<&IndexMap<PlannerId, Requirements>> {
        self.requirements.get(&output)
    }

    /// Returns the planners able to produce `product_type` for the subject.
    ///
    /// Each planner's formula is solved against the subject's native
    /// products with a fresh fully-consumed set. If a configuration is
    /// requested, only planners whose satisfied set contains the
    /// configuration's product type are returned.
    // TODO: selectors are by-name at the address layer but this filter
    // matches by type; convert config selectors to configuration mergers.
    pub fn planners_for(
        &self,
        product_type: ProductTypeId,
        subject: &Subject,
        configuration: Option<&Configuration>,
    ) -> Vec<PlannerId> {
        let native = subject.products();
        let mut solver = Solver::new(self, &native);
        let mut found = Vec::new();

        let Some(requirements) = self.requirements.get(&product_type) else {
            return found;
        };
        for (planner, formula) in requirements {
            let mut fully_consumed = IndexSet::new();
            if !solver.clauses_satisfiable(*planner, formula, &mut fully_consumed) {
                continue;
            }
            // Only yield planners whose chain consumed the configuration.
            match configuration {
                Some(configuration) if !fully_consumed.contains(&configuration.product_type) => {}
                _ => found.push(*planner),
            }
        }
        found
    }

    /// Filters candidate outputs down to the ones actually producible for
    /// the subject.
    ///
    /// Additionally validates that no input product was partially consumed:
    /// a product some planner's clause would consume, where that planner's
    /// remaining requirements can never be met and no other planner fully
    /// consumes the product either. Such a product is reported as a
    /// [`SchedulingError::PartiallyConsumedInputs`] carrying the full
    /// breakdown.
    pub fn produced_types_for_subject(
        &self,
        subject: &Subject,
        output_product_types: &[ProductTypeId],
    ) -> Result<Vec<ProductTypeId>, SchedulingError> {
        let native = subject.products();
        let mut solver = Solver::new(self, &native);
        let mut fully_consumed = IndexSet::new();

        let mut producible = Vec::new();
        let mut last_attempted = None;
        for &output in output_product_types {
            last_attempted = Some(output);
            if solver.producible(output, &mut fully_consumed) {
                producible.push(output);
            }
        }

        let stranded: PartialTable = solver
            .partial
            .into_iter()
            .filter(|(product, _)| !fully_consumed.contains(product))
            .collect();
        if let (Some(output), false) = (last_attempted, stranded.is_empty()) {
            return Err(SchedulingError::PartiallyConsumedInputs {
                output: self.products.display_name(output),
                subject: subject.identity_key().clone(),
                breakdown: self.breakdown(stranded),
            });
        }

        Ok(producible)
    }

    /// Resolves a partial-consumption table to names for diagnostics.
    fn breakdown(&self, table: PartialTable) -> PartialBreakdown {
        let mut named = IndexMap::new();
        for (product, planners) in table {
            let mut by_planner = IndexMap::new();
            for (planner, needed) in planners {
                by_planner.insert(
                    self.planner_name(Some(planner)).to_string(),
                    needed
                        .into_iter()
                        .map(|id| self.products.display_name(id))
                        .collect(),
                );
            }
            named.insert(self.products.display_name(product), by_planner);
        }
        PartialBreakdown(named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;

    use gantry_core::{Item, Plan};

    // A planner that only declares requirements; `plan` is never reached in
    // these tests.
    struct Declares {
        name: &'static str,
        goal: &'static str,
        outputs: Vec<(ProductTypeId, Requirements)>,
    }

    impl Planner for Declares {
        fn name(&self) -> &str {
            self.name
        }

        fn goal_name(&self) -> &str {
            self.goal
        }

        fn product_types(&self) -> IndexMap<ProductTypeId, Requirements> {
            self.outputs.iter().cloned().collect()
        }

        fn plan(
            &self,
            _scheduler: &mut dyn Scheduler,
            _product_type: ProductTypeId,
            _subject: &Subject,
            _configuration: Option<&Configuration>,
        ) -> Result<Option<Plan>, SchedulingError> {
            Ok(None)
        }
    }

    fn registry_with(
        names: &[&str],
        planners: Vec<Arc<dyn Planner>>,
    ) -> (Planners, Vec<ProductTypeId>) {
        let mut products = ProductRegistry::new();
        let ids = names
            .iter()
            .map(|name| products.register(name).unwrap())
            .collect();
        (Planners::new(Arc::new(products), planners), ids)
    }

    fn subject_with(products: &[ProductTypeId]) -> Subject {
        Subject::new(
            Item::new("lib")
                .with_configurations(products.iter().map(|p| Configuration::new(*p))),
        )
    }

    #[test]
    fn native_products_are_producible_without_planners() {
        let (registry, ids) = registry_with(&["Sources"], Vec::new());
        let subject = subject_with(&[ids[0]]);

        let produced = registry
            .produced_types_for_subject(&subject, &[ids[0]])
            .unwrap();
        assert_eq!(produced, vec![ids[0]]);
    }

    #[test]
    fn unknown_outputs_are_filtered_not_errors() {
        let (registry, ids) = registry_with(&["Docs"], Vec::new());
        let subject = subject_with(&[]);

        let produced = registry
            .produced_types_for_subject(&subject, &[ids[0]])
            .unwrap();
        assert!(produced.is_empty());
    }

    #[test]
    fn requirements_recurse_through_producers() {
        // Jar <- Classes <- Sources, subject carries only Sources.
        let (registry, ids) = registry_with(
            &["Sources", "Classes", "Jar"],
            vec![
                Arc::new(Declares {
                    name: "Compiler",
                    goal: "compile",
                    outputs: vec![(ProductTypeId(1), Requirements::single([ProductTypeId(0)]))],
                }),
                Arc::new(Declares {
                    name: "Jarrer",
                    goal: "jar",
                    outputs: vec![(ProductTypeId(2), Requirements::single([ProductTypeId(1)]))],
                }),
            ],
        );
        let subject = subject_with(&[ids[0]]);

        let produced = registry
            .produced_types_for_subject(&subject, &[ids[2]])
            .unwrap();
        assert_eq!(produced, vec![ids[2]]);
    }

    #[test]
    fn alternative_clause_satisfies_without_partial_error() {
        // Classes <- (Sources AND Deps) OR (PrecompiledClasses); subject has
        // only PrecompiledClasses. The first clause matches nothing at all,
        // so nothing is partially consumed.
        let (registry, ids) = registry_with(
            &["Sources", "Deps", "PrecompiledClasses", "Classes"],
            vec![Arc::new(Declares {
                name: "Compiler",
                goal: "compile",
                outputs: vec![(
                    ProductTypeId(3),
                    Requirements::any([
                        vec![ProductTypeId(0), ProductTypeId(1)],
                        vec![ProductTypeId(2)],
                    ]),
                )],
            })],
        );
        let subject = subject_with(&[ids[2]]);

        let produced = registry
            .produced_types_for_subject(&subject, &[ids[3]])
            .unwrap();
        assert_eq!(produced, vec![ids[3]]);
    }

    #[test]
    fn stranded_partial_consumption_is_an_error() {
        // Classes <- (Sources AND Flags); subject has Sources, nothing
        // produces Flags.
        let (registry, ids) = registry_with(
            &["Sources", "Flags", "Classes"],
            vec![Arc::new(Declares {
                name: "Compiler",
                goal: "compile",
                outputs: vec![(
                    ProductTypeId(2),
                    Requirements::single([ProductTypeId(0), ProductTypeId(1)]),
                )],
            })],
        );
        let subject = subject_with(&[ids[0]]);

        match registry.produced_types_for_subject(&subject, &[ids[2]]) {
            Err(SchedulingError::PartiallyConsumedInputs {
                output, breakdown, ..
            }) => {
                assert_eq!(output, "Classes");
                let planners = breakdown.0.get("Sources").expect("Sources stranded");
                assert_eq!(planners["Compiler"], vec!["Flags".to_string()]);
            }
            other => panic!("expected PartiallyConsumedInputs, got {:?}", other),
        }
    }

    #[test]
    fn partial_consumption_rescued_by_other_output_is_fine() {
        // Sources is partially consumed by the (Sources AND Flags) clause,
        // but fully consumed by the Reports planner, so no error.
        let (registry, ids) = registry_with(
            &["Sources", "Flags", "Classes", "Reports"],
            vec![
                Arc::new(Declares {
                    name: "Compiler",
                    goal: "compile",
                    outputs: vec![(
                        ProductTypeId(2),
                        Requirements::single([ProductTypeId(0), ProductTypeId(1)]),
                    )],
                }),
                Arc::new(Declares {
                    name: "Reporter",
                    goal: "report",
                    outputs: vec![(ProductTypeId(3), Requirements::single([ProductTypeId(0)]))],
                }),
            ],
        );
        let subject = subject_with(&[ids[0]]);

        let produced = registry
            .produced_types_for_subject(&subject, &[ids[2], ids[3]])
            .unwrap();
        assert_eq!(produced, vec![ids[3]]);
    }

    #[test]
    fn cyclic_requirements_terminate_unproducible() {
        // A requires B, B requires A; neither is native.
        let (registry, ids) = registry_with(
            &["A", "B"],
            vec![
                Arc::new(Declares {
                    name: "MakesA",
                    goal: "g",
                    outputs: vec![(ProductTypeId(0), Requirements::single([ProductTypeId(1)]))],
                }),
                Arc::new(Declares {
                    name: "MakesB",
                    goal: "g",
                    outputs: vec![(ProductTypeId(1), Requirements::single([ProductTypeId(0)]))],
                }),
            ],
        );
        let subject = subject_with(&[]);

        let produced = registry
            .produced_types_for_subject(&subject, &[ids[0]])
            .unwrap();
        assert!(produced.is_empty());
    }

    #[test]
    fn planners_for_filters_by_configuration_type() {
        let (registry, ids) = registry_with(
            &["Sources", "Deps", "Classes"],
            vec![Arc::new(Declares {
                name: "Compiler",
                goal: "compile",
                outputs: vec![(
                    ProductTypeId(2),
                    Requirements::single([ProductTypeId(0)]),
                )],
            })],
        );
        let subject = subject_with(&[ids[0], ids[1]]);

        // Unconfigured request: the planner qualifies.
        assert_eq!(registry.planners_for(ids[2], &subject, None).len(), 1);

        // A configuration whose type the planner consumes: qualifies.
        let sources_config = Configuration::new(ids[0]);
        assert_eq!(
            registry
                .planners_for(ids[2], &subject, Some(&sources_config))
                .len(),
            1
        );

        // A configuration whose type is never consumed: filtered.
        let deps_config = Configuration::new(ids[1]);
        assert!(registry
            .planners_for(ids[2], &subject, Some(&deps_config))
            .is_empty());
    }

    #[test]
    fn for_goal_preserves_registration_order() {
        let (registry, _) = registry_with(
            &["X"],
            vec![
                Arc::new(Declares {
                    name: "First",
                    goal: "g",
                    outputs: vec![(ProductTypeId(0), Requirements::unconditional())],
                }),
                Arc::new(Declares {
                    name: "Second",
                    goal: "g",
                    outputs: vec![(ProductTypeId(0), Requirements::unconditional())],
                }),
            ],
        );

        let ids = registry.for_goal("g");
        assert_eq!(ids, &[PlannerId(0), PlannerId(1)]);
        assert!(registry.for_goal("missing").is_empty());
    }
}
