//! Process-wide, append-only store of everything derived from type descriptions.
//!
//! # Publication
//!
//! ```text
//! get(key)
//!   ├─ present → return published value
//!   └─ absent  → build (no lock held)
//!                entry(key).or_insert(built)   ← first writer wins
//!                return whatever is published
//! ```
//!
//! Two threads registering the same type may both build; exactly one value
//! is published and both callers get it. Values are never evicted.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::discovery::{discover_fallback, discover_handlers, discover_lifecycle, Lifecycle};
use crate::dispatch::DispatchTable;
use crate::error::DiscoveryError;
use crate::shard::{AccessorConvention, RoutingKeys, ShardKeyBinding};
use crate::types::{Describe, TypeDescriptor, TypeKey};

type Erased = Arc<dyn Any + Send + Sync>;

/// Shared registry of descriptors, dispatch tables, lifecycles and routing keys.
pub struct Registry {
    boundaries: Vec<TypeKey>,
    convention: AccessorConvention,
    descriptors: DashMap<TypeKey, Erased>,
    tables: DashMap<TypeKey, Erased>,
    lifecycles: DashMap<TypeKey, Erased>,
    routing: DashMap<TypeKey, Arc<dyn RoutingKeys>>,
}

impl Registry {
    /// Registry without stop boundaries, using the default accessor convention.
    pub fn new() -> Self {
        Self::with_settings(Vec::new(), AccessorConvention::default())
    }

    /// Registry that stops hierarchy walks at `boundaries`.
    pub fn with_settings(boundaries: Vec<TypeKey>, convention: AccessorConvention) -> Self {
        Self {
            boundaries,
            convention,
            descriptors: DashMap::new(),
            tables: DashMap::new(),
            lifecycles: DashMap::new(),
            routing: DashMap::new(),
        }
    }

    /// Stop boundaries applied to every walk.
    pub fn boundaries(&self) -> &[TypeKey] {
        &self.boundaries
    }

    /// Register `T`: discover its handlers and lifecycle, publish its table.
    ///
    /// Idempotent; later calls return the published table.
    pub fn register<T: Describe>(&self) -> Result<Arc<DispatchTable<T>>, DiscoveryError> {
        self.lifecycle::<T>()?;
        self.dispatch_table::<T>()
    }

    /// Merged descriptor of `T`.
    pub fn descriptor<T: Describe>(&self) -> Arc<TypeDescriptor<T>> {
        let built = publish(&self.descriptors, TypeKey::of::<T>(), || {
            Ok::<_, Infallible>(TypeDescriptor::<T>::build(&self.boundaries))
        });
        match built {
            Ok(descriptor) => descriptor,
            Err(never) => match never {},
        }
    }

    /// Dispatch table of `T`, built on first use.
    pub fn dispatch_table<T: Describe>(&self) -> Result<Arc<DispatchTable<T>>, DiscoveryError> {
        publish(&self.tables, TypeKey::of::<T>(), || {
            let descriptor = self.descriptor::<T>();
            let table = DispatchTable::build(
                descriptor.key(),
                discover_handlers(&descriptor)?,
                discover_fallback(&descriptor)?,
            );
            tracing::debug!(
                actor = %table.owner(),
                entries = table.len(),
                fallback = %table.fallback(),
                "dispatch table built"
            );
            Ok::<_, DiscoveryError>(table)
        })
    }

    /// Lifecycle callbacks and injection points of `T`.
    pub fn lifecycle<T: Describe>(&self) -> Result<Arc<Lifecycle<T>>, DiscoveryError> {
        publish(&self.lifecycles, TypeKey::of::<T>(), || {
            discover_lifecycle(&self.descriptor::<T>())
        })
    }

    pub(crate) fn routing_keys<M: Describe>(&self) -> Result<Arc<dyn RoutingKeys>, DiscoveryError> {
        let key = TypeKey::of::<M>();
        if let Some(existing) = self.routing.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }
        let built: Arc<dyn RoutingKeys> =
            Arc::new(ShardKeyBinding::bind(&self.descriptor::<M>(), self.convention)?);
        Ok(Arc::clone(self.routing.entry(key).or_insert(built).value()))
    }

    pub(crate) fn routing_keys_for(&self, key: TypeKey) -> Option<Arc<dyn RoutingKeys>> {
        self.routing.get(&key).map(|entry| Arc::clone(entry.value()))
    }
}

fn publish<V, E, F>(map: &DashMap<TypeKey, Erased>, key: TypeKey, build: F) -> Result<Arc<V>, E>
where
    V: Any + Send + Sync,
    F: FnOnce() -> Result<V, E>,
{
    let existing = map
        .get(&key)
        .and_then(|entry| Arc::clone(entry.value()).downcast::<V>().ok());
    if let Some(existing) = existing {
        return Ok(existing);
    }

    let built = Arc::new(build()?);
    let erased: Erased = built.clone();
    let published = Arc::clone(map.entry(key).or_insert(erased).value());
    Ok(published.downcast::<V>().unwrap_or(built))
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("boundaries", &self.boundaries)
            .field("convention", &self.convention)
            .field("descriptors", &self.descriptors.len())
            .field("tables", &self.tables.len())
            .field("routing", &self.routing.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSpec;

    #[derive(Debug)]
    struct Event;

    #[derive(Debug)]
    struct Created {
        event: Event,
    }

    impl Describe for Event {
        fn describe(_spec: &mut TypeSpec<Self>) {}
    }

    impl AsRef<Event> for Created {
        fn as_ref(&self) -> &Event {
            &self.event
        }
    }

    impl AsMut<Event> for Created {
        fn as_mut(&mut self) -> &mut Event {
            &mut self.event
        }
    }

    impl Describe for Created {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.extends::<Event>();
        }
    }

    struct Journal;

    impl Describe for Journal {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.described_handler::<Created, _>("on_created", |_, _| Ok(()));
            spec.handler::<u64, _>("on_tick", |_, _| Ok(()));
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = Registry::new();
        let first = registry.register::<Journal>().expect("valid actor");
        let second = registry.register::<Journal>().expect("valid actor");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(
            &registry.descriptor::<Journal>(),
            &registry.descriptor::<Journal>()
        ));
    }

    #[test]
    fn test_described_message_depth_orders_entries() {
        let registry = Registry::new();
        let table = registry.dispatch_table::<Journal>().expect("valid actor");
        let order: Vec<&str> = table.entries().iter().map(|b| b.method()).collect();
        assert_eq!(order, vec!["on_tick", "on_created"]);
        assert_eq!(table.entries()[1].message_depth(), 1);
    }

    #[test]
    fn test_table_independent_of_message_descriptor_order() {
        let described_first = Registry::new();
        assert_eq!(described_first.descriptor::<Created>().depth(), 1);
        let early = described_first.register::<Journal>().expect("valid actor");

        let registered_first = Registry::new();
        let late = registered_first.register::<Journal>().expect("valid actor");
        assert_eq!(registered_first.descriptor::<Created>().depth(), 1);

        assert_eq!(*early, *late);
        assert!(Arc::ptr_eq(
            &late,
            &registered_first.register::<Journal>().expect("valid actor")
        ));
    }

    #[test]
    fn test_boundaries_are_applied() {
        let registry =
            Registry::with_settings(vec![TypeKey::of::<Event>()], AccessorConvention::JavaBean);
        let descriptor = registry.descriptor::<Created>();
        assert_eq!(descriptor.hierarchy(), &[TypeKey::of::<Created>()]);
        assert_eq!(registry.boundaries(), &[TypeKey::of::<Event>()]);
    }
}
