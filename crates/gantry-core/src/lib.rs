pub mod address;
pub mod error;
pub mod item;
pub mod plan;
pub mod product;
pub mod promise;
pub mod request;
pub mod subject;
pub mod task;
pub mod value;

// Re-export commonly used types
pub use address::Address;
pub use error::CoreError;
pub use item::{Configuration, Item};
pub use plan::{Binding, BoundInput, Input, Plan, TaskInputs};
pub use product::{ProductRegistry, ProductTypeId};
pub use promise::Promise;
pub use request::BuildRequest;
pub use subject::{Subject, SubjectRef};
pub use task::{
    lift_native_product, Task, TaskCategorization, TaskConstructor, TaskError, TaskFn,
    TaskRegistry, LIFT_NATIVE_PRODUCT,
};
pub use value::Value;
