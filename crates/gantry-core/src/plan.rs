//! Plans: serializable, task-bound invocation records.
//!
//! A [`Plan`] pairs a task with a frozen subject set and a tree of named
//! inputs. Input trees are the tagged [`Input`] variant: data leaves,
//! promises (pending dependencies on other plans), mappings, and sequences.
//! Two derived operations drive scheduling:
//! - [`Plan::promises`] -- the promise leaves reachable in the input tree,
//!   i.e. the plan's outgoing dependency edges;
//! - [`Plan::bind`] -- replace every promise leaf with its delivered product,
//!   yielding an executable [`Binding`].
//!
//! Plans have *structural* identity: equality and hash cover the task, the
//! subject set (by identity key, order-independent), and the inputs with
//! mapping entries canonicalized by key. Structural identity is what lets
//! the product mapper store a plan once however many promise keys reach it.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::error::CoreError;
use crate::product::ProductTypeId;
use crate::promise::Promise;
use crate::subject::Subject;
use crate::task::{TaskCategorization, TaskError};
use crate::value::Value;

/// A node in a plan's input tree.
///
/// Strings are data leaves (inside [`Value`]), never sequences.
#[derive(Debug, Clone, Serialize)]
pub enum Input {
    /// Opaque payload shipped verbatim to the task.
    Data(Value),
    /// A subject reference, compared by identity key.
    Subject(Subject),
    /// A product type reference.
    ProductType(ProductTypeId),
    /// A pending dependency on another plan's output.
    Promise(Promise),
    /// Named sub-inputs; canonicalized by key for identity.
    Map(IndexMap<String, Input>),
    /// An ordered sequence of sub-inputs.
    Seq(Vec<Input>),
}

impl PartialEq for Input {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Input::Data(a), Input::Data(b)) => a == b,
            (Input::Subject(a), Input::Subject(b)) => a.identity_key() == b.identity_key(),
            (Input::ProductType(a), Input::ProductType(b)) => a == b,
            (Input::Promise(a), Input::Promise(b)) => a == b,
            (Input::Map(a), Input::Map(b)) => a == b,
            (Input::Seq(a), Input::Seq(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Input {}

impl Hash for Input {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Input::Data(value) => {
                0u8.hash(state);
                value.hash(state);
            }
            Input::Subject(subject) => {
                1u8.hash(state);
                subject.identity_key().hash(state);
            }
            Input::ProductType(product_type) => {
                2u8.hash(state);
                product_type.hash(state);
            }
            Input::Promise(promise) => {
                3u8.hash(state);
                promise.hash(state);
            }
            Input::Map(entries) => {
                4u8.hash(state);
                hash_entries(entries, state);
            }
            Input::Seq(items) => {
                5u8.hash(state);
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
        }
    }
}

/// Hashes mapping entries in key-sorted order so that insertion order never
/// affects structural identity.
fn hash_entries<H: Hasher>(entries: &IndexMap<String, Input>, state: &mut H) {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    entries.len().hash(state);
    for key in keys {
        key.hash(state);
        entries[key].hash(state);
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Data(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Data(Value::from(value))
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Data(Value::from(value))
    }
}

impl From<Promise> for Input {
    fn from(promise: Promise) -> Self {
        Input::Promise(promise)
    }
}

impl From<Vec<Input>> for Input {
    fn from(items: Vec<Input>) -> Self {
        Input::Seq(items)
    }
}

/// A node in a *bound* input tree: the promise-free shape handed to tasks.
#[derive(Debug, Clone, Serialize)]
pub enum BoundInput {
    Data(Value),
    Subject(Subject),
    ProductType(ProductTypeId),
    Map(IndexMap<String, BoundInput>),
    Seq(Vec<BoundInput>),
}

impl BoundInput {
    /// Returns the data payload, if this is a `Data` leaf.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            BoundInput::Data(value) => Some(value),
            _ => None,
        }
    }
}

/// The fully-bound inputs a task executes over.
pub type TaskInputs = IndexMap<String, BoundInput>;

/// A production plan that will yield a product type for one or more subjects.
///
/// A plan can be serialized and executed wherever its task and the products
/// for its promises are available.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    task: TaskCategorization,
    subjects: Vec<Subject>,
    inputs: IndexMap<String, Input>,
}

impl Plan {
    /// Creates a plan.
    ///
    /// Subjects are canonicalized into set form: sorted by identity key and
    /// deduplicated by identity key (the first occurrence wins, so a
    /// subject's alternate survives dedup).
    pub fn new<T, S, K, I>(task: T, subjects: S, inputs: I) -> Plan
    where
        T: Into<TaskCategorization>,
        S: IntoIterator<Item = Subject>,
        K: Into<String>,
        I: IntoIterator<Item = (K, Input)>,
    {
        let mut deduped: IndexMap<crate::address::Address, Subject> = IndexMap::new();
        for subject in subjects {
            deduped
                .entry(subject.identity_key().clone())
                .or_insert(subject);
        }
        deduped.sort_keys();
        let subjects = deduped.into_values().collect();

        Plan {
            task: task.into(),
            subjects,
            inputs: inputs
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    /// Returns the task that will execute this plan.
    pub fn task(&self) -> &TaskCategorization {
        &self.task
    }

    /// Returns the subjects this plan produces products for, in canonical
    /// (identity-key-sorted) order.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Returns the named input, if present.
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }

    /// Returns the full input mapping.
    pub fn inputs(&self) -> &IndexMap<String, Input> {
        &self.inputs
    }

    /// Returns the unique promises in this plan's inputs, in discovery
    /// order. A plan's promises are its dependency edges on other plans.
    pub fn promises(&self) -> Vec<&Promise> {
        let mut promises = IndexSet::new();
        for value in self.inputs.values() {
            collect_promises(value, &mut promises);
        }
        promises.into_iter().collect()
    }

    /// Binds this plan's inputs to the given delivered products.
    ///
    /// Every promise leaf is replaced by its product; other leaves pass
    /// through untouched. Returns [`CoreError::UnboundPromise`] if a promise
    /// has no product in the mapping.
    pub fn bind(&self, products: &HashMap<Promise, Value>) -> Result<Binding, CoreError> {
        let mut inputs = IndexMap::with_capacity(self.inputs.len());
        for (name, value) in &self.inputs {
            inputs.insert(name.clone(), bind_input(value, products)?);
        }
        Ok(Binding {
            task: self.task,
            inputs,
        })
    }
}

fn collect_promises<'a>(input: &'a Input, promises: &mut IndexSet<&'a Promise>) {
    match input {
        Input::Promise(promise) => {
            promises.insert(promise);
        }
        Input::Map(entries) => {
            for value in entries.values() {
                collect_promises(value, promises);
            }
        }
        Input::Seq(items) => {
            for item in items {
                collect_promises(item, promises);
            }
        }
        Input::Data(_) | Input::Subject(_) | Input::ProductType(_) => {}
    }
}

fn bind_input(input: &Input, products: &HashMap<Promise, Value>) -> Result<BoundInput, CoreError> {
    match input {
        Input::Promise(promise) => match products.get(promise) {
            Some(product) => Ok(BoundInput::Data(product.clone())),
            None => Err(CoreError::UnboundPromise {
                promise: promise.clone(),
            }),
        },
        Input::Data(value) => Ok(BoundInput::Data(value.clone())),
        Input::Subject(subject) => Ok(BoundInput::Subject(subject.clone())),
        Input::ProductType(product_type) => Ok(BoundInput::ProductType(*product_type)),
        Input::Map(entries) => {
            let mut bound = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                bound.insert(key.clone(), bind_input(value, products)?);
            }
            Ok(BoundInput::Map(bound))
        }
        Input::Seq(items) => Ok(BoundInput::Seq(
            items
                .iter()
                .map(|item| bind_input(item, products))
                .collect::<Result<_, _>>()?,
        )),
    }
}

impl PartialEq for Plan {
    fn eq(&self, other: &Self) -> bool {
        self.task == other.task
            && self
                .subjects
                .iter()
                .map(Subject::identity_key)
                .eq(other.subjects.iter().map(Subject::identity_key))
            && self.inputs == other.inputs
    }
}

impl Eq for Plan {}

impl Hash for Plan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.task.hash(state);
        self.subjects.len().hash(state);
        for subject in &self.subjects {
            subject.identity_key().hash(state);
        }
        hash_entries(&self.inputs, state);
    }
}

/// A plan whose promises have all been satisfied, ready to execute.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    task: TaskCategorization,
    inputs: TaskInputs,
}

impl Binding {
    /// Returns the task this binding will execute.
    pub fn task(&self) -> &TaskCategorization {
        &self.task
    }

    /// Returns the fully-bound inputs.
    pub fn inputs(&self) -> &TaskInputs {
        &self.inputs
    }

    /// Executes the task with the bound inputs and returns its product.
    pub fn execute(&self) -> Result<Value, TaskError> {
        self.task.execute(&self.inputs)
    }
}
