//! Constructor selection and instance creation.

mod args;
mod builder;
mod provider;
mod resolver;

pub use args::Arg;
pub use builder::InstanceBuilder;
pub use provider::{DependencyKey, DependencyProvider, StaticProvider};
pub use resolver::{resolve_constructor, ConstructionPlan, ParamSource};
