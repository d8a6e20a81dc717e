//! Discovery of handlers, lifecycle callbacks and injection points.
//!
//! Everything here reads a [`TypeDescriptor`](crate::types::TypeDescriptor)
//! and fails at registration time, before any instance of the type exists.

mod handlers;
mod lifecycle;

pub use handlers::{
    discover_fallback, discover_handlers, FallbackBinding, HandlerBinding, HandlerFlags,
    HandlerParam,
};
pub use lifecycle::{discover_lifecycle, InjectionPoint, Lifecycle, LifecycleCallback};
