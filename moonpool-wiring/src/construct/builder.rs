//! Instance creation.
//!
//! # Steps
//!
//! ```text
//! create::<T>(args)
//!   1. register T                  discovery errors abort
//!   2. select constructor, plan    NoSuitableConstructor / WrongArgumentCount
//!   3. abstract?                   AbstractType
//!   4. bind parameters             positional (count, type, boxing) | provider
//!   5. run constructor body        InstantiationFailed
//!   6. inject fields, root-first   UnresolvedDependency
//!   7. post-construct, root-first  LifecycleFailed
//! ```

use std::sync::Arc;

use crate::construct::{resolve_constructor, Arg, ConstructionPlan, DependencyProvider, ParamSource};
use crate::error::{ConstructionError, InvokeError};
use crate::registry::Registry;
use crate::types::{coerce, CtorArgs, CtorSlot, Describe, TypeKey};

/// Creates fully initialised instances.
pub struct InstanceBuilder {
    registry: Arc<Registry>,
    provider: Arc<dyn DependencyProvider>,
}

impl InstanceBuilder {
    /// Builder over `registry`, resolving dependencies through `provider`.
    pub fn new(registry: Arc<Registry>, provider: Arc<dyn DependencyProvider>) -> Self {
        Self { registry, provider }
    }

    /// Create an instance of `T` from caller-supplied positional arguments.
    pub fn create<T: Describe>(&self, args: Vec<Arg>) -> Result<T, ConstructionError> {
        self.registry.register::<T>()?;
        let lifecycle = self.registry.lifecycle::<T>()?;
        let descriptor = self.registry.descriptor::<T>();
        let ty = descriptor.key();

        let arg_types: Vec<TypeKey> = args.iter().map(Arg::key).collect();
        let plan = resolve_constructor(&descriptor, &arg_types)?;
        if descriptor.is_abstract() {
            return Err(ConstructionError::AbstractType(ty));
        }

        let mut ctor_args = self.bind(&plan, args)?;
        let mut instance = (plan.constructor().build)(&mut ctor_args)
            .map_err(|source| ConstructionError::InstantiationFailed { ty, source })?;

        for point in lifecycle.injections() {
            let value = self.provider.resolve(point.key()).map_err(|source| {
                ConstructionError::UnresolvedDependency {
                    member: point.to_string(),
                    source,
                }
            })?;
            point
                .inject(&mut instance, value)
                .map_err(|source| ConstructionError::InstantiationFailed { ty, source })?;
        }

        for callback in lifecycle.post_construct() {
            callback
                .invoke(&mut instance)
                .map_err(|source| ConstructionError::LifecycleFailed {
                    method: callback.to_string(),
                    source,
                })?;
        }

        tracing::debug!(
            ty = %ty,
            constructor = %plan.constructor(),
            injected = lifecycle.injections().len(),
            "instance created"
        );
        Ok(instance)
    }

    /// Run the pre-destroy callbacks of `instance`, concrete type first.
    pub fn dispose<T: Describe>(&self, instance: &mut T) -> Result<(), ConstructionError> {
        let lifecycle = self.registry.lifecycle::<T>()?;
        for callback in lifecycle.pre_destroy() {
            callback
                .invoke(instance)
                .map_err(|source| ConstructionError::LifecycleFailed {
                    method: callback.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn bind<T>(
        &self,
        plan: &ConstructionPlan<'_, T>,
        args: Vec<Arg>,
    ) -> Result<CtorArgs, ConstructionError> {
        let constructor = plan.constructor();
        let ty = constructor.owner;
        let failed = |source| ConstructionError::InstantiationFailed { ty, source };

        // Wired plans already checked the assisted count.
        if !constructor.is_wired() && args.len() > constructor.params().len() {
            return Err(failed(InvokeError::ExtraArguments {
                expected: constructor.params().len(),
                provided: args.len(),
            }));
        }

        let mut positional: Vec<Option<Arg>> = args.into_iter().map(Some).collect();
        let mut slots = Vec::with_capacity(plan.sources().len());

        for (index, (source, param)) in plan.sources().iter().zip(constructor.params()).enumerate() {
            match source {
                ParamSource::Positional(position) => {
                    let arg = positional
                        .get_mut(*position)
                        .and_then(Option::take)
                        .ok_or_else(|| failed(InvokeError::MissingArgument { index }))?;
                    let mismatch = || {
                        failed(InvokeError::ArgumentType {
                            index,
                            expected: param.ty().name(),
                        })
                    };
                    let from = arg.key();
                    if !param.ty().accepts(from) {
                        return Err(mismatch());
                    }
                    let value = arg.into_value();
                    let value = if from == param.ty() {
                        value
                    } else {
                        // `None` cannot become a plain primitive.
                        coerce(value, param.ty()).map_err(|_| mismatch())?
                    };
                    slots.push(CtorSlot::Owned(value));
                }
                ParamSource::Resolved(key) => {
                    let dependency = self.provider.resolve(key).map_err(|source| {
                        ConstructionError::UnresolvedDependency {
                            member: format!("{constructor} parameter {index}"),
                            source,
                        }
                    })?;
                    slots.push(CtorSlot::Shared(dependency));
                }
            }
        }

        Ok(CtorArgs::new(slots))
    }
}

impl std::fmt::Debug for InstanceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceBuilder")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
