//! Type identity, member declarations and merged type descriptors.

mod descriptor;
mod key;
mod member;
mod message;
mod spec;

pub use descriptor::{hierarchy_depth, TypeDescriptor};
pub use key::TypeKey;
pub use member::{
    BuildFn, CallArg, CallArgs, ConstructorDef, CtorArgs, Dependency, FieldDef, MemberMarkers,
    MethodBody, MethodDef, MutFn, ParamDef, ParamMarkers, Qualifiers, RefFn, Returned, SetFn,
};
pub use message::Message;
pub use spec::{ConstructorBuilder, Describe, MethodBuilder, TypeSpec};

pub(crate) use key::coerce;
pub(crate) use member::CtorSlot;
