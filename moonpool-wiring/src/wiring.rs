//! The facade tying registry, dispatcher, instance builder and extractor together.

use std::sync::Arc;

use crate::config::WiringConfig;
use crate::construct::{Arg, DependencyProvider, InstanceBuilder, StaticProvider};
use crate::context::ReceiveContext;
use crate::dispatch::{
    AcceptAll, DispatchTable, Dispatched, Dispatcher, LoggingSink, UnhandledSink, Validator,
};
use crate::error::{ConfigError, ConstructionError, DiscoveryError, DispatchError, ShardKeyError};
use crate::registry::Registry;
use crate::shard::ShardKeyExtractor;
use crate::types::{Describe, Message, TypeKey};

/// One engine instance: shared registry plus its consumers.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```rust,ignore
/// let wiring = Wiring::builder()
///     .provider(StaticProvider::new().bind(Ledger::default()))
///     .build()?;
///
/// let mut account: Account = wiring.create(args![5_i64])?;
/// wiring.dispatch(&mut account, &Deposit { amount: 10 }, &ReceiveContext::detached())?;
/// ```
pub struct Wiring {
    config: WiringConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    instances: InstanceBuilder,
    extractor: ShardKeyExtractor,
}

impl Wiring {
    /// Start configuring an engine.
    pub fn builder() -> WiringBuilder {
        WiringBuilder::new()
    }

    /// Active configuration.
    pub fn config(&self) -> &WiringConfig {
        &self.config
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The instance builder.
    pub fn instances(&self) -> &InstanceBuilder {
        &self.instances
    }

    /// The routing key extractor.
    pub fn extractor(&self) -> &ShardKeyExtractor {
        &self.extractor
    }

    /// Discover `T` and publish its dispatch table. Idempotent.
    pub fn register<T: Describe>(&self) -> Result<Arc<DispatchTable<T>>, DiscoveryError> {
        let table = self.registry.register::<T>()?;
        tracing::debug!(actor = %table.owner(), entries = table.len(), "registered");
        Ok(table)
    }

    /// Bind the routing keys of message type `M` for [`shard_id`](Self::shard_id)
    /// and [`entity_id`](Self::entity_id). Messages that are never routed by
    /// a type-erased reference need no registration.
    ///
    /// # Errors
    ///
    /// `MissingKeyMember` when `M` declares no entity key.
    pub fn register_message<M: Describe + Message>(&self) -> Result<(), DiscoveryError> {
        self.extractor.register::<M>()
    }

    /// Deliver `message` to `actor`.
    pub fn dispatch<T: Describe>(
        &self,
        actor: &mut T,
        message: &dyn Message,
        ctx: &ReceiveContext,
    ) -> Result<Dispatched, DispatchError> {
        self.dispatcher.dispatch(actor, message, ctx)
    }

    /// Create, inject and initialise an instance of `T`.
    pub fn create<T: Describe>(&self, args: Vec<Arg>) -> Result<T, ConstructionError> {
        self.instances.create(args)
    }

    /// Run the pre-destroy callbacks of `actor`.
    pub fn dispose<T: Describe>(&self, actor: &mut T) -> Result<(), ConstructionError> {
        self.instances.dispose(actor)
    }

    /// Shard id of a message whose type was registered.
    pub fn shard_id(&self, message: &dyn Message) -> Result<String, ShardKeyError> {
        self.extractor.shard_id(message)
    }

    /// Entity id of a message whose type was registered.
    pub fn entity_id(&self, message: &dyn Message) -> Result<String, ShardKeyError> {
        self.extractor.entity_id(message)
    }

    /// Shard id of `message`, binding `M` on first use.
    pub fn shard_id_of<M: Describe + Message>(&self, message: &M) -> Result<String, ShardKeyError> {
        self.extractor.shard_id_of(message)
    }

    /// Entity id of `message`, binding `M` on first use.
    pub fn entity_id_of<M: Describe + Message>(&self, message: &M) -> Result<String, ShardKeyError> {
        self.extractor.entity_id_of(message)
    }
}

impl std::fmt::Debug for Wiring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wiring")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Wiring`] with a fluent API.
///
/// Defaults: [`WiringConfig::default`], no stop boundaries, an empty
/// [`StaticProvider`], [`AcceptAll`] validation and the [`LoggingSink`].
pub struct WiringBuilder {
    config: WiringConfig,
    boundaries: Vec<TypeKey>,
    provider: Arc<dyn DependencyProvider>,
    validator: Arc<dyn Validator>,
    sink: Arc<dyn UnhandledSink>,
}

impl WiringBuilder {
    /// Builder with defaults.
    pub fn new() -> Self {
        Self {
            config: WiringConfig::default(),
            boundaries: Vec::new(),
            provider: Arc::new(StaticProvider::new()),
            validator: Arc::new(AcceptAll),
            sink: Arc::new(LoggingSink),
        }
    }

    /// Use `config`.
    pub fn config(mut self, config: WiringConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of shard groups.
    pub fn shard_cardinality(mut self, cardinality: u32) -> Self {
        self.config.shard_cardinality = cardinality;
        self
    }

    /// Stop hierarchy walks at `B`; `B` and everything above it are ignored.
    pub fn stop_at<B: ?Sized + 'static>(mut self) -> Self {
        self.boundaries.push(TypeKey::of::<B>());
        self
    }

    /// Resolve dependencies through `provider`.
    pub fn provider(mut self, provider: impl DependencyProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Validate messages with `validator`.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Report unhandled messages to `sink`.
    pub fn unhandled_sink(mut self, sink: impl UnhandledSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCardinality` for a zero cardinality.
    pub fn build(self) -> Result<Wiring, ConfigError> {
        self.config.validate()?;

        let registry = Arc::new(Registry::with_settings(
            self.boundaries,
            self.config.accessor_convention,
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&self.provider),
            self.validator,
            self.sink,
        );
        let instances = InstanceBuilder::new(Arc::clone(&registry), self.provider);
        let extractor = ShardKeyExtractor::new(Arc::clone(&registry), self.config.shard_cardinality)?;

        tracing::debug!(
            shard_cardinality = self.config.shard_cardinality,
            boundaries = registry.boundaries().len(),
            "wiring built"
        );

        Ok(Wiring {
            config: self.config,
            registry,
            dispatcher,
            instances,
            extractor,
        })
    }
}

impl Default for WiringBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSpec;

    #[test]
    fn test_builder_rejects_zero_cardinality() {
        assert!(matches!(
            Wiring::builder().shard_cardinality(0).build(),
            Err(ConfigError::InvalidCardinality(0))
        ));
    }

    #[test]
    fn test_builder_applies_settings() {
        struct Base;
        let wiring = Wiring::builder()
            .shard_cardinality(16)
            .stop_at::<Base>()
            .build()
            .expect("valid settings");
        assert_eq!(wiring.config().shard_cardinality, 16);
        assert_eq!(wiring.extractor().cardinality(), 16);
        assert_eq!(wiring.registry().boundaries(), &[TypeKey::of::<Base>()]);
    }

    #[derive(Debug, Default)]
    struct Heartbeat;

    impl Describe for Heartbeat {
        fn describe(_: &mut TypeSpec<Self>) {}
    }

    #[derive(Default)]
    struct Monitor {
        beats: u32,
    }

    impl Describe for Monitor {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.described_handler::<Heartbeat, _>("on_heartbeat", |m, _| {
                m.beats += 1;
                Ok(())
            });
        }
    }

    #[test]
    fn test_keyless_event_dispatches_without_registration() {
        let wiring = Wiring::builder().build().expect("default settings");
        let mut monitor = Monitor::default();
        let outcome = wiring
            .dispatch(&mut monitor, &Heartbeat, &ReceiveContext::detached())
            .expect("dispatched");
        assert!(matches!(outcome, Dispatched::Handled { .. }));
        assert_eq!(monitor.beats, 1);

        assert!(matches!(
            wiring.register_message::<Heartbeat>(),
            Err(DiscoveryError::MissingKeyMember { .. })
        ));
    }
}
