//! The task model: the executable side of a plan.
//!
//! A plan's task is a [`TaskCategorization`] -- either a named free function
//! or a named task type constructed fresh at execution time. Both shapes are
//! identified by name, which is what gets serialized; a [`TaskRegistry`]
//! resolves names back to categorizations when plans are rehydrated on
//! another worker.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::{Serialize, Serializer};
use thiserror::Error;

use crate::plan::{BoundInput, TaskInputs};
use crate::value::Value;

/// Errors produced while categorizing, resolving, or executing tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A required input was not present in the bound inputs.
    #[error("missing input '{name}'")]
    MissingInput { name: String },

    /// A serialized plan named a task this registry does not know.
    #[error("unknown task: '{name}'")]
    UnknownTask { name: String },

    /// A task with the same name was already registered.
    #[error("task '{name}' already registered")]
    DuplicateTask { name: String },

    /// The task ran and failed.
    #[error("{message}")]
    Failed { message: String },
}

/// An executable task.
///
/// Tasks are the atoms of work plans bind to. Implementations are
/// zero-configuration: the scheduler serializes only the task's name, and
/// the execution side constructs a fresh instance per invocation.
pub trait Task {
    /// Executes this task over fully-bound inputs, returning the product.
    fn execute(&self, inputs: &TaskInputs) -> Result<Value, TaskError>;
}

/// A named pointer to a free task function.
#[derive(Clone, Copy)]
pub struct TaskFn {
    pub name: &'static str,
    pub call: fn(&TaskInputs) -> Result<Value, TaskError>,
}

impl fmt::Debug for TaskFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFn").field("name", &self.name).finish()
    }
}

/// A named constructor for a [`Task`] type.
#[derive(Clone, Copy)]
pub struct TaskConstructor {
    pub name: &'static str,
    pub new: fn() -> Box<dyn Task>,
}

impl fmt::Debug for TaskConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConstructor")
            .field("name", &self.name)
            .finish()
    }
}

/// An either type for a function or a [`Task`] type.
///
/// The split is made at construction, and "a task type must actually be a
/// task" is the trait bound on [`TaskConstructor::new`]. Identity is the
/// variant plus the name, which is also the serialized form.
#[derive(Debug, Clone, Copy)]
pub enum TaskCategorization {
    Func(TaskFn),
    TaskType(TaskConstructor),
}

impl TaskCategorization {
    /// Creates a categorization for a free function.
    pub fn of_func(func: TaskFn) -> Self {
        TaskCategorization::Func(func)
    }

    /// Creates a categorization for a task type.
    pub fn of_task_type(constructor: TaskConstructor) -> Self {
        TaskCategorization::TaskType(constructor)
    }

    /// Returns the name of the underlying function or task type.
    pub fn name(&self) -> &'static str {
        match self {
            TaskCategorization::Func(func) => func.name,
            TaskCategorization::TaskType(constructor) => constructor.name,
        }
    }

    /// Executes the categorized task over fully-bound inputs.
    ///
    /// Functions are called directly; task types are constructed fresh and
    /// then executed.
    pub fn execute(&self, inputs: &TaskInputs) -> Result<Value, TaskError> {
        match self {
            TaskCategorization::Func(func) => (func.call)(inputs),
            TaskCategorization::TaskType(constructor) => (constructor.new)().execute(inputs),
        }
    }
}

impl PartialEq for TaskCategorization {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TaskCategorization::Func(a), TaskCategorization::Func(b)) => a.name == b.name,
            (TaskCategorization::TaskType(a), TaskCategorization::TaskType(b)) => {
                a.name == b.name
            }
            _ => false,
        }
    }
}

impl Eq for TaskCategorization {}

impl Hash for TaskCategorization {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TaskCategorization::Func(func) => {
                0u8.hash(state);
                func.name.hash(state);
            }
            TaskCategorization::TaskType(constructor) => {
                1u8.hash(state);
                constructor.name.hash(state);
            }
        }
    }
}

impl Serialize for TaskCategorization {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TaskCategorization::Func(func) => {
                serializer.serialize_newtype_variant("TaskCategorization", 0, "func", func.name)
            }
            TaskCategorization::TaskType(constructor) => serializer.serialize_newtype_variant(
                "TaskCategorization",
                1,
                "task_type",
                constructor.name,
            ),
        }
    }
}

impl From<TaskFn> for TaskCategorization {
    fn from(func: TaskFn) -> Self {
        TaskCategorization::Func(func)
    }
}

impl From<TaskConstructor> for TaskCategorization {
    fn from(constructor: TaskConstructor) -> Self {
        TaskCategorization::TaskType(constructor)
    }
}

/// Registry resolving task names back to categorizations.
///
/// The execution side of the deserialization contract: a plan shipped to
/// another worker carries only task names, and the worker's registry must
/// know them all.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    by_name: HashMap<&'static str, TaskCategorization>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    /// Registers a function or task type under its name.
    ///
    /// Returns [`TaskError::DuplicateTask`] if the name is taken.
    pub fn register(
        &mut self,
        categorization: impl Into<TaskCategorization>,
    ) -> Result<(), TaskError> {
        let categorization = categorization.into();
        let name = categorization.name();
        if self.by_name.contains_key(name) {
            return Err(TaskError::DuplicateTask {
                name: name.to_string(),
            });
        }
        self.by_name.insert(name, categorization);
        Ok(())
    }

    /// Resolves a serialized task name.
    pub fn resolve(&self, name: &str) -> Result<TaskCategorization, TaskError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TaskError::UnknownTask {
                name: name.to_string(),
            })
    }
}

/// Task function that lifts a product already carried by the subject.
///
/// Inputs: `subject` and `product_type`. The output is the payload of the
/// subject's configuration carrying that product type.
pub fn lift_native_product(inputs: &TaskInputs) -> Result<Value, TaskError> {
    let subject = match inputs.get("subject") {
        Some(BoundInput::Subject(subject)) => subject,
        Some(_) => {
            return Err(TaskError::Failed {
                message: "input 'subject' is not a subject".to_string(),
            })
        }
        None => {
            return Err(TaskError::MissingInput {
                name: "subject".to_string(),
            })
        }
    };
    let product_type = match inputs.get("product_type") {
        Some(BoundInput::ProductType(product_type)) => *product_type,
        Some(_) => {
            return Err(TaskError::Failed {
                message: "input 'product_type' is not a product type".to_string(),
            })
        }
        None => {
            return Err(TaskError::MissingInput {
                name: "product_type".to_string(),
            })
        }
    };
    match subject.native(product_type) {
        Some(configuration) => Ok(configuration.data.clone()),
        None => Err(TaskError::Failed {
            message: format!(
                "subject {} carries no native product {}",
                subject.identity_key(),
                product_type
            ),
        }),
    }
}

/// The categorization for [`lift_native_product`], used by the scheduler's
/// synthetic native-lift plans.
pub const LIFT_NATIVE_PRODUCT: TaskFn = TaskFn {
    name: "lift_native_product",
    call: lift_native_product,
};
