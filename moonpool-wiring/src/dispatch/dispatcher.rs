//! The dispatch hot path.
//!
//! # Flow
//!
//! ```text
//! dispatch(actor, message, ctx)
//!   │
//!   ├─ table = registry.dispatch_table::<T>()     (built once, then shared)
//!   ├─ binding = table.lookup(message.type)       (exact type)
//!   │
//!   ├─ found:
//!   │    ├─ validate? ── violations ──▶ Rejected (handler skipped)
//!   │    ├─ resolve injectable parameters
//!   │    └─ invoke ──────────────────▶ Handled
//!   │
//!   └─ not found:
//!        └─ fallback (declared or sink), exactly once ──▶ Unhandled
//! ```
//!
//! The caller guarantees that one instance never sees two dispatches at the
//! same time. Nothing here takes a lock on the hot path.

use std::borrow::Cow;
use std::sync::Arc;

use crate::context::ReceiveContext;
use crate::construct::DependencyProvider;
use crate::discovery::{HandlerBinding, HandlerParam};
use crate::dispatch::{Fallback, Validator, Violation};
use crate::error::DispatchError;
use crate::registry::Registry;
use crate::types::{CallArg, CallArgs, Describe, Message, TypeKey};

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A handler ran.
    Handled {
        /// Type declaring the handler.
        declaring: TypeKey,
        /// Handler name.
        method: Cow<'static, str>,
    },
    /// Validation failed; the handler did not run and the instance is unaffected.
    Rejected(Vec<Violation>),
    /// No handler matched; the fallback ran.
    Unhandled,
}

/// Receives messages for which neither a handler nor a declared fallback exists.
pub trait UnhandledSink: Send + Sync {
    /// Called once per unhandled message.
    fn unhandled(&self, owner: TypeKey, message: &dyn Message);
}

/// Sink that records unhandled messages in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl UnhandledSink for LoggingSink {
    fn unhandled(&self, owner: TypeKey, message: &dyn Message) {
        tracing::debug!(
            actor = %owner,
            message_type = %message.message_type(),
            ?message,
            "unhandled message"
        );
    }
}

/// Routes messages to handlers.
pub struct Dispatcher {
    registry: Arc<Registry>,
    provider: Arc<dyn DependencyProvider>,
    validator: Arc<dyn Validator>,
    sink: Arc<dyn UnhandledSink>,
}

impl Dispatcher {
    /// Dispatcher over `registry` and its collaborators.
    pub fn new(
        registry: Arc<Registry>,
        provider: Arc<dyn DependencyProvider>,
        validator: Arc<dyn Validator>,
        sink: Arc<dyn UnhandledSink>,
    ) -> Self {
        Self {
            registry,
            provider,
            validator,
            sink,
        }
    }

    /// Deliver `message` to `actor`.
    ///
    /// # Errors
    ///
    /// Only for broken contracts: discovery failure of `T`, a failing
    /// handler or fallback, an unresolvable handler dependency. A missing
    /// handler and a validation failure are outcomes, not errors.
    pub fn dispatch<T: Describe>(
        &self,
        actor: &mut T,
        message: &dyn Message,
        ctx: &ReceiveContext,
    ) -> Result<Dispatched, DispatchError> {
        let table = self.registry.dispatch_table::<T>()?;
        let message_type = message.message_type();

        let Some(binding) = table.lookup(message_type) else {
            match table.fallback() {
                Fallback::Declared(fallback) => {
                    let args = CallArgs::new(vec![CallArg::Message(message)], Some(ctx));
                    fallback
                        .invoke(actor, &args)
                        .map_err(|source| DispatchError::FallbackFailed {
                            method: fallback.to_string(),
                            source,
                        })?;
                }
                Fallback::Sink => self.sink.unhandled(table.owner(), message),
            }
            return Ok(Dispatched::Unhandled);
        };

        if binding.needs_validation() {
            let violations = self.validator.validate(message);
            if !violations.is_empty() {
                tracing::warn!(
                    handler = %binding,
                    violations = violations.len(),
                    "message rejected by validation"
                );
                return Ok(Dispatched::Rejected(violations));
            }
        }

        let args = self.handler_args(binding, message, ctx)?;
        binding
            .invoke(actor, &args)
            .map_err(|source| DispatchError::HandlerFailed {
                method: binding.to_string(),
                source,
            })?;

        Ok(Dispatched::Handled {
            declaring: binding.declaring(),
            method: binding.method_cow(),
        })
    }

    fn handler_args<'a, T: 'static>(
        &self,
        binding: &HandlerBinding<T>,
        message: &'a dyn Message,
        ctx: &'a ReceiveContext,
    ) -> Result<CallArgs<'a>, DispatchError> {
        let slots = binding
            .params()
            .iter()
            .map(|param| match param {
                HandlerParam::Message => Ok(CallArg::Message(message)),
                HandlerParam::Dependency(key) => self
                    .provider
                    .resolve(key)
                    .map(CallArg::Shared)
                    .map_err(|source| DispatchError::UnresolvedDependency {
                        method: binding.to_string(),
                        source,
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CallArgs::new(slots, Some(ctx)))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
