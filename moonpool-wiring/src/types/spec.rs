//! The describe capability and the builder it fills.
//!
//! Rust has no runtime reflection, so each participating type declares its
//! members explicitly. A `TypeSpec<T>` is one level of a hierarchy: the
//! members declared by one type, plus its interface levels and its parent
//! level. Parent members are lifted into `T` through `AsRef`/`AsMut`, which
//! is how composition stands in for inheritance.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Account { base: Entity, balance: i64 }
//!
//! impl Describe for Account {
//!     fn describe(spec: &mut TypeSpec<Self>) {
//!         spec.extends::<Entity>();
//!         spec.handler::<Deposit, _>("on_deposit", |acct, d| {
//!             acct.balance += d.amount;
//!             Ok(())
//!         })
//!         .validated();
//!         spec.constructor()
//!             .param::<i64>()
//!             .build(|args| Ok(Account { base: Entity::default(), balance: args.take(0)? }));
//!     }
//! }
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use super::member::{
    key_getter, mut_fn, set_fn, BuildFn, CallArgs, ConstructorDef, CtorArgs, Dependency,
    FieldDef, MemberMarkers, MethodBody, MethodDef, ParamDef, ParamMarkers, Qualifiers, Returned,
};
use super::{Message, TypeKey};
use crate::error::InvokeError;
use crate::shard::KeyValue;

/// Capability of a type to describe its members.
///
/// Implemented by actors (handlers, constructors, injection points,
/// lifecycle callbacks), by their ancestor types, and by messages that
/// carry routing keys.
pub trait Describe: Sized + 'static {
    /// Declare this type's own members, parent and interfaces.
    fn describe(spec: &mut TypeSpec<Self>);
}

/// One hierarchy level under construction.
pub struct TypeSpec<T> {
    pub(crate) key: TypeKey,
    pub(crate) is_abstract: bool,
    pub(crate) fields: Vec<FieldDef<T>>,
    pub(crate) methods: Vec<MethodDef<T>>,
    pub(crate) constructors: Vec<ConstructorDef<T>>,
    pub(crate) interfaces: Vec<TypeSpec<T>>,
    pub(crate) parent: Option<Box<TypeSpec<T>>>,
}

impl<T: 'static> TypeSpec<T> {
    /// Empty level for `T` itself.
    pub fn new() -> Self {
        Self::level(TypeKey::of::<T>())
    }

    fn level(key: TypeKey) -> Self {
        Self {
            key,
            is_abstract: false,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            interfaces: Vec::new(),
            parent: None,
        }
    }

    /// Key of the type declaring this level.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Declare the type abstract: it describes members but cannot be created.
    pub fn abstract_type(&mut self) -> &mut Self {
        self.is_abstract = true;
        self
    }

    /// Declare `P` as the parent type. `P`'s members (and its own ancestors
    /// and interfaces) are reached through `AsRef<P>`/`AsMut<P>`.
    ///
    /// A later call replaces an earlier one; constructors are never inherited.
    pub fn extends<P>(&mut self) -> &mut Self
    where
        P: Describe,
        T: AsRef<P> + AsMut<P>,
    {
        let mut parent = TypeSpec::<P>::new();
        P::describe(&mut parent);
        self.parent = Some(Box::new(parent.lift::<T>(
            <T as AsRef<P>>::as_ref,
            <T as AsMut<P>>::as_mut,
        )));
        self
    }

    /// Declare an interface level keyed by `I` (typically `dyn Trait`),
    /// whose members are declared by `describe` directly on `T`.
    pub fn implements<I: ?Sized + 'static>(&mut self, describe: fn(&mut TypeSpec<T>)) -> &mut Self {
        let mut level = TypeSpec::level(TypeKey::of::<I>());
        describe(&mut level);
        level.constructors.clear();
        self.interfaces.push(level);
        self
    }

    /// Start declaring a method.
    pub fn method(&mut self, name: impl Into<Cow<'static, str>>) -> MethodBuilder<'_, T> {
        MethodBuilder {
            spec: self,
            name: name.into(),
            params: Vec::new(),
            markers: MemberMarkers::empty(),
        }
    }

    /// Declare a handler for messages of type `M`.
    pub fn handler<M, F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut MethodDef<T>
    where
        M: Any,
        F: Fn(&mut T, &M) -> Result<(), InvokeError> + Send + Sync + 'static,
    {
        self.method(name)
            .receives::<M>()
            .call_mut(move |target, args| {
                f(target, args.message::<M>(0)?)?;
                Ok(None)
            })
    }

    /// Declare a handler for a message type that describes its own
    /// hierarchy. The message's depth orders the entry in dispatch tables.
    pub fn described_handler<M, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> &mut MethodDef<T>
    where
        M: Describe,
        F: Fn(&mut T, &M) -> Result<(), InvokeError> + Send + Sync + 'static,
    {
        self.method(name)
            .receives_described::<M>()
            .call_mut(move |target, args| {
                f(target, args.message::<M>(0)?)?;
                Ok(None)
            })
    }

    /// Declare the fallback receiving every message no handler matched.
    pub fn fallback<F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut MethodDef<T>
    where
        F: Fn(&mut T, &dyn Message) -> Result<(), InvokeError> + Send + Sync + 'static,
    {
        self.method(name)
            .param_with::<dyn Message>(ParamMarkers::RECEIVES)
            .marked(MemberMarkers::FALLBACK)
            .call_mut(move |target, args| {
                f(target, args.raw_message(0)?)?;
                Ok(None)
            })
    }

    /// Declare a zero-argument callback run after construction and injection.
    pub fn post_construct<F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut MethodDef<T>
    where
        F: Fn(&mut T) -> Result<(), InvokeError> + Send + Sync + 'static,
    {
        self.method(name)
            .marked(MemberMarkers::POST_CONSTRUCT)
            .call_mut(move |target, _args| {
                f(target)?;
                Ok(None)
            })
    }

    /// Declare a zero-argument callback run before the instance is disposed.
    pub fn pre_destroy<F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut MethodDef<T>
    where
        F: Fn(&mut T) -> Result<(), InvokeError> + Send + Sync + 'static,
    {
        self.method(name)
            .marked(MemberMarkers::PRE_DESTROY)
            .call_mut(move |target, _args| {
                f(target)?;
                Ok(None)
            })
    }

    /// Declare a read-only accessor whose value can serve as a routing key.
    /// Returning `None` means the key is absent.
    pub fn getter<V, F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut MethodDef<T>
    where
        V: Into<KeyValue> + 'static,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        let body = MethodBody::Ref(key_getter(f));
        self.push_method(name.into(), Vec::new(), MemberMarkers::empty(), body)
    }

    /// Declare a plain field of type `V`, for marker purposes.
    pub fn field<V: 'static>(&mut self, name: impl Into<Cow<'static, str>>) -> &mut FieldDef<T> {
        self.fields.push(FieldDef {
            declaring: self.key,
            name: name.into(),
            ty: TypeKey::of::<V>(),
            markers: MemberMarkers::empty(),
            qualifiers: Qualifiers::none(),
            setter: None,
        });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    /// Declare a field filled by the dependency provider after construction.
    pub fn inject<D, F>(&mut self, name: impl Into<Cow<'static, str>>, slot: F) -> &mut FieldDef<T>
    where
        D: Any + Send + Sync,
        F: Fn(&mut T) -> &mut Option<Arc<D>> + Send + Sync + 'static,
    {
        let name = name.into();
        let field_name = name.clone();
        let setter = set_fn(move |target: &mut T, dep: Dependency| {
            let value = dep.downcast::<D>().map_err(|_| {
                InvokeError::Failed(format!(
                    "dependency for field '{}' is not a {}",
                    field_name,
                    std::any::type_name::<D>()
                ))
            })?;
            *slot(target) = Some(value);
            Ok(())
        });
        self.fields.push(FieldDef {
            declaring: self.key,
            name,
            ty: TypeKey::of::<D>(),
            markers: MemberMarkers::INJECT,
            qualifiers: Qualifiers::none(),
            setter: Some(setter),
        });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    /// Start declaring a plain constructor (all parameters positional).
    pub fn constructor(&mut self) -> ConstructorBuilder<'_, T> {
        ConstructorBuilder {
            spec: self,
            params: Vec::new(),
            wired: false,
        }
    }

    /// Start declaring a wired constructor: non-assisted parameters are
    /// resolved by the provider, assisted ones come from the caller.
    pub fn wired_constructor(&mut self) -> ConstructorBuilder<'_, T> {
        ConstructorBuilder {
            spec: self,
            params: Vec::new(),
            wired: true,
        }
    }

    fn push_method(
        &mut self,
        name: Cow<'static, str>,
        params: Vec<ParamDef>,
        markers: MemberMarkers,
        body: MethodBody<T>,
    ) -> &mut MethodDef<T> {
        self.methods.push(MethodDef {
            declaring: self.key,
            name,
            params,
            markers,
            body,
        });
        let last = self.methods.len() - 1;
        &mut self.methods[last]
    }

    /// Re-express this level (and everything above it) in terms of `C`.
    fn lift<C: 'static>(self, up: fn(&C) -> &T, up_mut: fn(&mut C) -> &mut T) -> TypeSpec<C> {
        TypeSpec {
            key: self.key,
            is_abstract: self.is_abstract,
            fields: self.fields.into_iter().map(|f| f.lift(up_mut)).collect(),
            methods: self
                .methods
                .into_iter()
                .map(|m| m.lift(up, up_mut))
                .collect(),
            constructors: Vec::new(),
            interfaces: self
                .interfaces
                .into_iter()
                .map(|i| i.lift(up, up_mut))
                .collect(),
            parent: self.parent.map(|p| Box::new(p.lift(up, up_mut))),
        }
    }
}

impl<T: 'static> Default for TypeSpec<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent declaration of one method.
pub struct MethodBuilder<'s, T> {
    spec: &'s mut TypeSpec<T>,
    name: Cow<'static, str>,
    params: Vec<ParamDef>,
    markers: MemberMarkers,
}

impl<'s, T: 'static> MethodBuilder<'s, T> {
    /// Add the message parameter; also marks the method as a handler.
    pub fn receives<M: ?Sized + 'static>(mut self) -> Self {
        self.markers |= MemberMarkers::HANDLER;
        self.param_with::<M>(ParamMarkers::RECEIVES)
    }

    /// Add the message parameter for a described message type, recording
    /// its hierarchy depth; also marks the method as a handler.
    pub fn receives_described<M: Describe>(mut self) -> Self {
        let mut param = ParamDef::of::<M>();
        param.markers = ParamMarkers::RECEIVES;
        param.depth = super::hierarchy_depth::<M>();
        self.markers |= MemberMarkers::HANDLER;
        self.params.push(param);
        self
    }

    /// Add a plain parameter of type `V`.
    pub fn param<V: ?Sized + 'static>(self) -> Self {
        self.param_with::<V>(ParamMarkers::empty())
    }

    /// Add a provider-resolved parameter of type `V` with a qualifier.
    pub fn param_named<V: ?Sized + 'static>(mut self, qualifier: impl Into<String>) -> Self {
        let mut param = ParamDef::of::<V>();
        param.qualifiers = Qualifiers::named(qualifier);
        self.params.push(param);
        self
    }

    /// Add a parameter with explicit markers.
    pub fn param_with<V: ?Sized + 'static>(mut self, markers: ParamMarkers) -> Self {
        let mut param = ParamDef::of::<V>();
        param.markers = markers;
        self.params.push(param);
        self
    }

    /// Mark as a handler without adding a message parameter.
    pub fn handler(mut self) -> Self {
        self.markers |= MemberMarkers::HANDLER;
        self
    }

    /// Non-message parameters are resolved by the provider at dispatch.
    pub fn injectable(mut self) -> Self {
        self.markers |= MemberMarkers::INJECT;
        self
    }

    /// Validate messages before invoking.
    pub fn validated(mut self) -> Self {
        self.markers |= MemberMarkers::VALIDATE;
        self
    }

    /// Also observe published events.
    pub fn observed(mut self) -> Self {
        self.markers |= MemberMarkers::EVENT;
        self
    }

    /// Add arbitrary markers.
    pub fn marked(mut self, markers: MemberMarkers) -> Self {
        self.markers |= markers;
        self
    }

    /// Finish with a mutating body.
    pub fn call_mut<F>(self, f: F) -> &'s mut MethodDef<T>
    where
        F: Fn(&mut T, &CallArgs<'_>) -> Result<Option<Returned>, InvokeError>
            + Send
            + Sync
            + 'static,
    {
        let body = MethodBody::Mut(mut_fn(f));
        self.spec.push_method(self.name, self.params, self.markers, body)
    }

    /// Finish with a read-only body.
    pub fn call_ref<F>(self, f: F) -> &'s mut MethodDef<T>
    where
        F: Fn(&T, &CallArgs<'_>) -> Result<Option<Returned>, InvokeError> + Send + Sync + 'static,
    {
        let body = MethodBody::Ref(super::member::ref_fn(f));
        self.spec.push_method(self.name, self.params, self.markers, body)
    }
}

/// Fluent declaration of one constructor.
pub struct ConstructorBuilder<'s, T> {
    spec: &'s mut TypeSpec<T>,
    params: Vec<ParamDef>,
    wired: bool,
}

impl<'s, T: 'static> ConstructorBuilder<'s, T> {
    /// Positional parameter of a plain constructor.
    pub fn param<V: 'static>(mut self) -> Self {
        self.params.push(ParamDef::of::<V>());
        self
    }

    /// Caller-supplied parameter of a wired constructor.
    pub fn assisted<V: 'static>(mut self) -> Self {
        let mut param = ParamDef::of::<V>();
        param.markers = ParamMarkers::ASSISTED;
        self.params.push(param);
        self
    }

    /// Provider-resolved parameter of a wired constructor.
    pub fn dependency<D: Any + Send + Sync>(mut self) -> Self {
        self.params.push(ParamDef::of::<D>());
        self
    }

    /// Provider-resolved parameter narrowed by a qualifier.
    pub fn dependency_named<D: Any + Send + Sync>(mut self, qualifier: impl Into<String>) -> Self {
        let mut param = ParamDef::of::<D>();
        param.qualifiers = Qualifiers::named(qualifier);
        self.params.push(param);
        self
    }

    /// Finish with the body building the instance from its arguments.
    pub fn build<F>(self, f: F) -> &'s mut TypeSpec<T>
    where
        F: Fn(&mut CtorArgs) -> Result<T, InvokeError> + Send + Sync + 'static,
    {
        let build: BuildFn<T> = Arc::new(f);
        let owner = self.spec.key;
        self.spec.constructors.push(ConstructorDef {
            owner,
            params: self.params,
            wired: self.wired,
            build,
        });
        self.spec
    }
}
