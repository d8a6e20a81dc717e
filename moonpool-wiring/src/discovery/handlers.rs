//! Message handler discovery.
//!
//! # Handler shape
//!
//! ```text
//! fn on_deposit(&mut self, #[receives] msg: Deposit)                  plain handler
//! #[inject] fn on_audit(&mut self, #[receives] msg: Audit, log: AuditLog)   injectable
//! ```
//!
//! Exactly one parameter receives the message and its declared type is the
//! dispatch key. Other parameters are only allowed on injectable handlers
//! and are resolved by the provider on every dispatch.
//!
//! When several handlers target the same message type, the first one in
//! scan order (concrete type first) shadows the others.

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;

use crate::construct::DependencyKey;
use crate::error::{DiscoveryError, InvokeError};
use crate::types::{
    CallArgs, MemberMarkers, MethodBody, MethodDef, ParamDef, Returned, TypeDescriptor, TypeKey,
};

bitflags! {
    /// Behaviour switches of a handler binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HandlerFlags: u8 {
        /// Run the validator before the handler.
        const NEEDS_VALIDATION = 1 << 0;

        /// The runtime should also deliver published events of this type.
        const EVENT_OBSERVED = 1 << 1;

        /// Extra parameters are resolved by the provider.
        const INJECTABLE = 1 << 2;
    }
}

/// Source of one handler argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerParam {
    /// The incoming message.
    Message,
    /// A provider-resolved dependency.
    Dependency(DependencyKey),
}

/// A handler bound to the message type it receives.
pub struct HandlerBinding<T> {
    declaring: TypeKey,
    method: Cow<'static, str>,
    message: TypeKey,
    depth: usize,
    flags: HandlerFlags,
    params: Vec<HandlerParam>,
    body: MethodBody<T>,
}

impl<T: 'static> HandlerBinding<T> {
    /// Bind a method marked as a handler.
    ///
    /// # Errors
    ///
    /// `AmbiguousOrMissingMessageParameter` unless exactly one parameter
    /// receives the message; `UnboundHandlerParameter` for any other
    /// parameter of a non-injectable handler.
    pub fn from_method(method: &MethodDef<T>) -> Result<Self, DiscoveryError> {
        let message = message_param(method)?;
        let injectable = method.markers().contains(MemberMarkers::INJECT);

        let params = method
            .params()
            .iter()
            .enumerate()
            .map(|(index, param)| {
                if param.receives() {
                    Ok(HandlerParam::Message)
                } else if injectable {
                    Ok(HandlerParam::Dependency(DependencyKey::new(
                        param.ty(),
                        param.qualifiers().clone(),
                    )))
                } else {
                    Err(DiscoveryError::UnboundHandlerParameter {
                        declaring: method.declaring(),
                        method: method.name().to_string(),
                        index,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut flags = HandlerFlags::empty();
        flags.set(
            HandlerFlags::NEEDS_VALIDATION,
            method.markers().contains(MemberMarkers::VALIDATE),
        );
        flags.set(
            HandlerFlags::EVENT_OBSERVED,
            method.markers().contains(MemberMarkers::EVENT),
        );
        flags.set(HandlerFlags::INJECTABLE, injectable);

        Ok(Self {
            declaring: method.declaring(),
            method: method.name.clone(),
            message: message.ty(),
            depth: message.depth(),
            flags,
            params,
            body: method.body.clone(),
        })
    }

    /// Type that declared the handler.
    pub fn declaring(&self) -> TypeKey {
        self.declaring
    }

    /// Handler name.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn method_cow(&self) -> Cow<'static, str> {
        self.method.clone()
    }

    /// Message type this handler receives.
    pub fn message(&self) -> TypeKey {
        self.message
    }

    /// Hierarchy depth of the message type as declared by the handler.
    pub fn message_depth(&self) -> usize {
        self.depth
    }

    /// Behaviour flags.
    pub fn flags(&self) -> HandlerFlags {
        self.flags
    }

    /// Whether the validator runs first.
    pub fn needs_validation(&self) -> bool {
        self.flags.contains(HandlerFlags::NEEDS_VALIDATION)
    }

    /// Whether the handler observes published events.
    pub fn is_event_observed(&self) -> bool {
        self.flags.contains(HandlerFlags::EVENT_OBSERVED)
    }

    /// Argument sources, in parameter order.
    pub fn params(&self) -> &[HandlerParam] {
        &self.params
    }

    pub(crate) fn invoke(
        &self,
        target: &mut T,
        args: &CallArgs<'_>,
    ) -> Result<Option<Returned>, InvokeError> {
        self.body.call_mut(target, args)
    }
}

impl<T> fmt::Display for HandlerBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}({})", self.declaring, self.method, self.message)
    }
}

impl<T> fmt::Debug for HandlerBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("declaring", &self.declaring)
            .field("method", &self.method)
            .field("message", &self.message)
            .field("depth", &self.depth)
            .field("flags", &self.flags)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// Bodies are closures; two bindings are equal when their metadata is.
impl<T> PartialEq for HandlerBinding<T> {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring
            && self.method == other.method
            && self.message == other.message
            && self.depth == other.depth
            && self.flags == other.flags
            && self.params == other.params
    }
}

/// Collect the handlers of a type, one per message type.
pub fn discover_handlers<T: 'static>(
    descriptor: &TypeDescriptor<T>,
) -> Result<Vec<HandlerBinding<T>>, DiscoveryError> {
    let mut bindings: Vec<HandlerBinding<T>> = Vec::new();
    for method in descriptor
        .methods()
        .iter()
        .filter(|m| m.markers().contains(MemberMarkers::HANDLER))
    {
        let binding = HandlerBinding::from_method(method)?;
        if let Some(winner) = bindings.iter().find(|b| b.message == binding.message) {
            tracing::trace!(
                ty = %descriptor.key(),
                kept = %winner,
                shadowed = %binding,
                "handler shadowed"
            );
            continue;
        }
        bindings.push(binding);
    }
    Ok(bindings)
}

/// A declared fallback receiving unmatched messages.
pub struct FallbackBinding<T> {
    declaring: TypeKey,
    method: Cow<'static, str>,
    body: MethodBody<T>,
}

impl<T: 'static> FallbackBinding<T> {
    /// Type that declared the fallback.
    pub fn declaring(&self) -> TypeKey {
        self.declaring
    }

    /// Fallback name.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn invoke(
        &self,
        target: &mut T,
        args: &CallArgs<'_>,
    ) -> Result<Option<Returned>, InvokeError> {
        self.body.call_mut(target, args)
    }
}

impl<T> fmt::Display for FallbackBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring, self.method)
    }
}

/// The first fallback in scan order, if any.
///
/// A fallback takes the message and nothing else.
pub fn discover_fallback<T: 'static>(
    descriptor: &TypeDescriptor<T>,
) -> Result<Option<FallbackBinding<T>>, DiscoveryError> {
    let Some(method) = descriptor
        .methods()
        .iter()
        .find(|m| m.markers().contains(MemberMarkers::FALLBACK))
    else {
        return Ok(None);
    };

    message_param(method)?;
    if let Some(index) = method.params().iter().position(|p| !p.receives()) {
        return Err(DiscoveryError::UnboundHandlerParameter {
            declaring: method.declaring(),
            method: method.name().to_string(),
            index,
        });
    }

    Ok(Some(FallbackBinding {
        declaring: method.declaring(),
        method: method.name.clone(),
        body: method.body.clone(),
    }))
}

fn message_param<T: 'static>(method: &MethodDef<T>) -> Result<&ParamDef, DiscoveryError> {
    let mut receiving = method.params().iter().filter(|p| p.receives());
    match (receiving.next(), receiving.next()) {
        (Some(param), None) => Ok(param),
        _ => Err(DiscoveryError::AmbiguousOrMissingMessageParameter {
            declaring: method.declaring(),
            method: method.name().to_string(),
            found: method.params().iter().filter(|p| p.receives()).count(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Describe, ParamMarkers, TypeSpec};

    #[derive(Debug)]
    struct Audit;

    struct AuditLog;

    #[derive(Default)]
    struct Base {
        seen: Vec<String>,
    }

    impl Describe for Base {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.handler::<i32, _>("base_int", |b, n| {
                b.seen.push(format!("base {n}"));
                Ok(())
            });
            spec.handler::<u8, _>("base_byte", |b, n| {
                b.seen.push(format!("byte {n}"));
                Ok(())
            })
            .observed();
        }
    }

    struct Derived {
        base: Base,
    }

    impl AsRef<Base> for Derived {
        fn as_ref(&self) -> &Base {
            &self.base
        }
    }

    impl AsMut<Base> for Derived {
        fn as_mut(&mut self) -> &mut Base {
            &mut self.base
        }
    }

    impl Describe for Derived {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.extends::<Base>();
            spec.handler::<i32, _>("derived_int", |d, n| {
                d.base.seen.push(format!("derived {n}"));
                Ok(())
            })
            .validated();
            spec.method("on_audit")
                .receives::<Audit>()
                .param_named::<AuditLog>("primary")
                .injectable()
                .call_mut(|_, _| Ok(None));
        }
    }

    #[test]
    fn test_closest_handler_shadows_ancestor() {
        let descriptor = TypeDescriptor::<Derived>::build(&[]);
        let bindings = discover_handlers(&descriptor).expect("valid handlers");

        let names: Vec<&str> = bindings.iter().map(|b| b.method()).collect();
        assert_eq!(names, vec!["derived_int", "on_audit", "base_byte"]);

        let int = &bindings[0];
        assert_eq!(int.message(), TypeKey::of::<i32>());
        assert!(int.needs_validation());
        assert!(!int.is_event_observed());
        assert!(bindings[2].is_event_observed());
    }

    #[test]
    fn test_injectable_handler_params() {
        let descriptor = TypeDescriptor::<Derived>::build(&[]);
        let bindings = discover_handlers(&descriptor).expect("valid handlers");
        let audit = &bindings[1];
        assert!(audit.flags().contains(HandlerFlags::INJECTABLE));
        assert_eq!(
            audit.params(),
            &[
                HandlerParam::Message,
                HandlerParam::Dependency(DependencyKey::of::<AuditLog>().qualified("primary")),
            ]
        );
    }

    struct NoMessage;

    impl Describe for NoMessage {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.method("broken").handler().call_mut(|_, _| Ok(None));
        }
    }

    struct TwoMessages;

    impl Describe for TwoMessages {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.method("broken")
                .receives::<i32>()
                .receives::<String>()
                .call_mut(|_, _| Ok(None));
        }
    }

    struct ExtraParam;

    impl Describe for ExtraParam {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.method("broken")
                .receives::<i32>()
                .param::<String>()
                .call_mut(|_, _| Ok(None));
        }
    }

    #[test]
    fn test_message_parameter_must_be_unique() {
        let err = discover_handlers(&TypeDescriptor::<NoMessage>::build(&[]))
            .expect_err("no message parameter");
        assert!(matches!(
            err,
            DiscoveryError::AmbiguousOrMissingMessageParameter { found: 0, .. }
        ));

        let err = discover_handlers(&TypeDescriptor::<TwoMessages>::build(&[]))
            .expect_err("two message parameters");
        assert!(matches!(
            err,
            DiscoveryError::AmbiguousOrMissingMessageParameter { found: 2, .. }
        ));
    }

    #[test]
    fn test_extra_parameter_requires_inject() {
        let err = discover_handlers(&TypeDescriptor::<ExtraParam>::build(&[]))
            .expect_err("unbound parameter");
        assert!(matches!(
            err,
            DiscoveryError::UnboundHandlerParameter { index: 1, .. }
        ));
    }

    struct WithFallback;

    impl Describe for WithFallback {
        fn describe(spec: &mut TypeSpec<Self>) {
            spec.fallback("unhandled", |_, _| Ok(()));
            spec.method("second")
                .param_with::<dyn crate::types::Message>(ParamMarkers::RECEIVES)
                .marked(MemberMarkers::FALLBACK)
                .call_mut(|_, _| Ok(None));
        }
    }

    #[test]
    fn test_first_fallback_wins() {
        let descriptor = TypeDescriptor::<WithFallback>::build(&[]);
        let fallback = discover_fallback(&descriptor)
            .expect("valid fallback")
            .expect("declared fallback");
        assert_eq!(fallback.method(), "unhandled");
        assert!(discover_handlers(&descriptor).expect("no handlers").is_empty());
    }
}
