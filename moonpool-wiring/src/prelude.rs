//! Common imports for describing types and driving the engine.

pub use crate::args;
pub use crate::construct::{Arg, DependencyKey, DependencyProvider, StaticProvider};
pub use crate::context::{ActorId, ReceiveContext};
pub use crate::dispatch::{Dispatched, UnhandledSink, Validator, Violation};
pub use crate::error::{
    ConstructionError, DiscoveryError, DispatchError, InvokeError, ResolveError, ShardKeyError,
};
pub use crate::shard::KeyValue;
pub use crate::types::{CallArgs, CtorArgs, Describe, MemberMarkers, Message, TypeKey, TypeSpec};
pub use crate::{Wiring, WiringBuilder, WiringConfig};

pub use std::sync::Arc;
