//! # moonpool-wiring
//!
//! Dispatch-and-construction engine for virtual actors.
//!
//! Types describe themselves once (handlers, constructors, injection points,
//! lifecycle callbacks, routing keys); the engine turns those descriptions
//! into immutable per-type tables and uses them to route messages, build
//! instances and compute shard placement.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Wiring (facade)                                              │
//! ├───────────────┬──────────────────┬───────────────────────────┤
//! │ Dispatcher    │ InstanceBuilder  │ ShardKeyExtractor         │
//! │ validate →    │ resolve ctor →   │ key member → hash →       │
//! │ handler |     │ bind → build →   │ |hash| mod cardinality    │
//! │ fallback      │ inject → init    │                           │
//! ├───────────────┴──────────────────┴───────────────────────────┤
//! │ Registry (append-only, compute-if-absent)                    │
//! │ descriptors · dispatch tables · lifecycles · routing keys    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ discovery: handlers, fallback, lifecycle, injection points   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ types: Describe → TypeSpec → TypeDescriptor (merged, cached) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use moonpool_wiring::prelude::*;
//!
//! #[derive(Default)]
//! struct Counter { total: i64 }
//!
//! impl Describe for Counter {
//!     fn describe(spec: &mut TypeSpec<Self>) {
//!         spec.handler::<i64, _>("on_add", |c, n| { c.total += n; Ok(()) });
//!         spec.constructor().build(|_| Ok(Counter::default()));
//!     }
//! }
//!
//! let wiring = Wiring::builder().build()?;
//! let mut counter: Counter = wiring.create(args![])?;
//! wiring.dispatch(&mut counter, &5_i64, &ReceiveContext::detached())?;
//! ```
//!
//! ## Modules
//!
//! - [`types`] - type identity, member declarations, descriptors
//! - [`discovery`] - handler, fallback and lifecycle discovery
//! - [`dispatch`] - dispatch tables and the dispatcher
//! - [`construct`] - constructor resolution and instance creation
//! - [`shard`] - shard id and entity id extraction

#![deny(missing_docs)]

pub mod config;
pub mod construct;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod shard;
pub mod types;
mod wiring;

pub use config::WiringConfig;
pub use construct::{Arg, DependencyKey, DependencyProvider, InstanceBuilder, StaticProvider};
pub use context::{ActorId, ReceiveContext};
pub use dispatch::{DispatchTable, Dispatched, Dispatcher, UnhandledSink, Validator, Violation};
pub use error::{
    ActorIdError, ConfigError, ConstructionError, DiscoveryError, DispatchError, InvokeError,
    KeyRole, ResolveError, ShardKeyError,
};
pub use registry::Registry;
pub use shard::{AccessorConvention, KeyValue, ShardKeyExtractor};
pub use types::{Describe, Message, TypeDescriptor, TypeKey, TypeSpec};
pub use wiring::{Wiring, WiringBuilder};
