//! Member declarations: markers, parameters, fields, methods and constructors.
//!
//! These are the building blocks a type's [`Describe`](super::Describe)
//! implementation emits. Every invocable member carries a typed closure
//! captured at description time; discovery later reads the markers and
//! parameter lists, and the dispatcher and instance builder call the
//! closures.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use super::{Message, TypeKey};
use crate::context::ReceiveContext;
use crate::error::InvokeError;
use crate::shard::KeyValue;

bitflags! {
    /// Declarative markers on fields and methods.
    ///
    /// - `HANDLER`: method receives messages (needs exactly one `RECEIVES` parameter)
    /// - `VALIDATE`: message is validated before the handler runs
    /// - `EVENT`: handler also observes published events of its message type
    /// - `INJECT`: field resolved by the provider, or handler with provider-resolved parameters
    /// - `POST_CONSTRUCT` / `PRE_DESTROY`: zero-argument lifecycle callbacks
    /// - `SHARD_KEY` / `ENTITY_KEY`: routing key members of a message
    /// - `FALLBACK`: receives messages no handler matched
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberMarkers: u16 {
        /// Message handler.
        const HANDLER = 1 << 0;

        /// Validate the message before invoking the handler.
        const VALIDATE = 1 << 1;

        /// Handler observes published events.
        const EVENT = 1 << 2;

        /// Provider-resolved member.
        const INJECT = 1 << 3;

        /// Runs once after construction and injection.
        const POST_CONSTRUCT = 1 << 4;

        /// Runs once before the instance is dropped.
        const PRE_DESTROY = 1 << 5;

        /// Carries the shard key.
        const SHARD_KEY = 1 << 6;

        /// Carries the entity key.
        const ENTITY_KEY = 1 << 7;

        /// Fallback sink for unmatched messages.
        const FALLBACK = 1 << 8;
    }
}

bitflags! {
    /// Markers on a single method or constructor parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParamMarkers: u8 {
        /// The parameter carries the incoming message.
        const RECEIVES = 1 << 0;

        /// The parameter is filled from caller-supplied positional arguments.
        const ASSISTED = 1 << 1;
    }
}

/// Qualifiers narrowing a dependency lookup (e.g. `"primary"`).
///
/// Kept sorted so that declaration order does not change identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Qualifiers(Vec<String>);

impl Qualifiers {
    /// No qualifiers.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single qualifier.
    pub fn named(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Add a qualifier.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.0.push(name.into());
        self.0.sort();
        self.0.dedup();
        self
    }

    /// Whether no qualifier is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over qualifier names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "@{q}")?;
        }
        Ok(())
    }
}

/// Declared parameter of a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDef {
    pub(crate) ty: TypeKey,
    pub(crate) markers: ParamMarkers,
    pub(crate) qualifiers: Qualifiers,
    pub(crate) depth: usize,
}

impl ParamDef {
    /// Plain parameter of type `V`.
    pub fn of<V: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeKey::of::<V>(),
            markers: ParamMarkers::empty(),
            qualifiers: Qualifiers::none(),
            depth: 0,
        }
    }

    /// Declared type.
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    /// Parameter markers.
    pub fn markers(&self) -> ParamMarkers {
        self.markers
    }

    /// Dependency qualifiers.
    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// Hierarchy depth of the declared type, 0 unless it was declared
    /// through a described message.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether this parameter carries the message.
    pub fn receives(&self) -> bool {
        self.markers.contains(ParamMarkers::RECEIVES)
    }

    /// Whether this parameter is caller-supplied.
    pub fn is_assisted(&self) -> bool {
        self.markers.contains(ParamMarkers::ASSISTED)
    }
}

impl fmt::Display for ParamDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assisted() {
            f.write_str("#[assisted] ")?;
        }
        if !self.qualifiers.is_empty() {
            write!(f, "{} ", self.qualifiers)?;
        }
        write!(f, "{}", self.ty)
    }
}

/// A resolved dependency as handed out by a provider.
pub type Dependency = Arc<dyn Any + Send + Sync>;

/// Value returned by a method; `None` stands for "no value".
pub type Returned = Box<dyn Any + Send>;

/// Read-only method body.
pub type RefFn<T> =
    Arc<dyn Fn(&T, &CallArgs<'_>) -> Result<Option<Returned>, InvokeError> + Send + Sync>;

/// Mutating method body.
pub type MutFn<T> =
    Arc<dyn Fn(&mut T, &CallArgs<'_>) -> Result<Option<Returned>, InvokeError> + Send + Sync>;

/// Field setter used by injection.
pub type SetFn<T> = Arc<dyn Fn(&mut T, Dependency) -> Result<(), InvokeError> + Send + Sync>;

/// Constructor body.
pub type BuildFn<T> = Arc<dyn Fn(&mut CtorArgs) -> Result<T, InvokeError> + Send + Sync>;

pub(crate) fn ref_fn<T, F>(f: F) -> RefFn<T>
where
    F: Fn(&T, &CallArgs<'_>) -> Result<Option<Returned>, InvokeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn mut_fn<T, F>(f: F) -> MutFn<T>
where
    F: Fn(&mut T, &CallArgs<'_>) -> Result<Option<Returned>, InvokeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn set_fn<T, F>(f: F) -> SetFn<T>
where
    F: Fn(&mut T, Dependency) -> Result<(), InvokeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Callable part of a method.
pub enum MethodBody<T> {
    /// Needs only `&T`; usable for key extraction.
    Ref(RefFn<T>),
    /// Needs `&mut T`.
    Mut(MutFn<T>),
}

impl<T> Clone for MethodBody<T> {
    fn clone(&self) -> Self {
        match self {
            MethodBody::Ref(f) => MethodBody::Ref(Arc::clone(f)),
            MethodBody::Mut(f) => MethodBody::Mut(Arc::clone(f)),
        }
    }
}

impl<T> MethodBody<T> {
    pub(crate) fn call_mut(
        &self,
        target: &mut T,
        args: &CallArgs<'_>,
    ) -> Result<Option<Returned>, InvokeError> {
        match self {
            MethodBody::Ref(f) => f(&*target, args),
            MethodBody::Mut(f) => f(target, args),
        }
    }

    pub(crate) fn as_ref_fn(&self) -> Option<&RefFn<T>> {
        match self {
            MethodBody::Ref(f) => Some(f),
            MethodBody::Mut(_) => None,
        }
    }

    fn lift<C: 'static>(self, up: fn(&C) -> &T, up_mut: fn(&mut C) -> &mut T) -> MethodBody<C>
    where
        T: 'static,
    {
        match self {
            MethodBody::Ref(f) => MethodBody::Ref(ref_fn(move |c: &C, args: &CallArgs<'_>| {
                f(up(c), args)
            })),
            MethodBody::Mut(f) => {
                MethodBody::Mut(mut_fn(move |c: &mut C, args: &CallArgs<'_>| {
                    f(up_mut(c), args)
                }))
            }
        }
    }
}

/// A declared field.
pub struct FieldDef<T> {
    pub(crate) declaring: TypeKey,
    pub(crate) name: Cow<'static, str>,
    pub(crate) ty: TypeKey,
    pub(crate) markers: MemberMarkers,
    pub(crate) qualifiers: Qualifiers,
    pub(crate) setter: Option<SetFn<T>>,
}

impl<T: 'static> FieldDef<T> {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type that declared the field.
    pub fn declaring(&self) -> TypeKey {
        self.declaring
    }

    /// Declared field type.
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    /// Field markers.
    pub fn markers(&self) -> MemberMarkers {
        self.markers
    }

    /// Dependency qualifiers (injectable fields).
    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// Mark as carrying the shard key.
    pub fn shard_key(&mut self) -> &mut Self {
        self.markers |= MemberMarkers::SHARD_KEY;
        self
    }

    /// Mark as carrying the entity key.
    pub fn entity_key(&mut self) -> &mut Self {
        self.markers |= MemberMarkers::ENTITY_KEY;
        self
    }

    /// Add a dependency qualifier.
    pub fn qualified(&mut self, name: impl Into<String>) -> &mut Self {
        self.qualifiers = std::mem::take(&mut self.qualifiers).with(name);
        self
    }

    pub(crate) fn lift<C: 'static>(
        self,
        up_mut: fn(&mut C) -> &mut T,
    ) -> FieldDef<C> {
        FieldDef {
            declaring: self.declaring,
            name: self.name,
            ty: self.ty,
            markers: self.markers,
            qualifiers: self.qualifiers,
            setter: self.setter.map(|set| {
                set_fn(move |c: &mut C, dep: Dependency| set(up_mut(c), dep))
            }),
        }
    }
}

/// A declared method.
pub struct MethodDef<T> {
    pub(crate) declaring: TypeKey,
    pub(crate) name: Cow<'static, str>,
    pub(crate) params: Vec<ParamDef>,
    pub(crate) markers: MemberMarkers,
    pub(crate) body: MethodBody<T>,
}

impl<T: 'static> MethodDef<T> {
    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type that declared the method.
    pub fn declaring(&self) -> TypeKey {
        self.declaring
    }

    /// Declared parameters.
    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    /// Method markers.
    pub fn markers(&self) -> MemberMarkers {
        self.markers
    }

    /// Name plus parameter types; two methods with equal signatures override.
    pub fn signature(&self) -> (&str, Vec<TypeKey>) {
        (&self.name, self.params.iter().map(|p| p.ty).collect())
    }

    /// Validate messages before this handler runs.
    pub fn validated(&mut self) -> &mut Self {
        self.markers |= MemberMarkers::VALIDATE;
        self
    }

    /// This handler also observes published events.
    pub fn observed(&mut self) -> &mut Self {
        self.markers |= MemberMarkers::EVENT;
        self
    }

    /// Mark as returning the shard key.
    pub fn shard_key(&mut self) -> &mut Self {
        self.markers |= MemberMarkers::SHARD_KEY;
        self
    }

    /// Mark as returning the entity key.
    pub fn entity_key(&mut self) -> &mut Self {
        self.markers |= MemberMarkers::ENTITY_KEY;
        self
    }

    pub(crate) fn lift<C: 'static>(
        self,
        up: fn(&C) -> &T,
        up_mut: fn(&mut C) -> &mut T,
    ) -> MethodDef<C> {
        MethodDef {
            declaring: self.declaring,
            name: self.name,
            params: self.params,
            markers: self.markers,
            body: self.body.lift(up, up_mut),
        }
    }
}

impl<T: 'static> fmt::Display for MethodDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.declaring, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

/// A declared constructor.
pub struct ConstructorDef<T> {
    pub(crate) owner: TypeKey,
    pub(crate) params: Vec<ParamDef>,
    pub(crate) wired: bool,
    pub(crate) build: BuildFn<T>,
}

impl<T> ConstructorDef<T> {
    /// Declared parameters, in order.
    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    /// Whether non-assisted parameters are resolved by the provider.
    pub fn is_wired(&self) -> bool {
        self.wired
    }

    /// Number of caller-supplied parameters of a wired constructor.
    pub fn assisted_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_assisted()).count()
    }
}

impl<T> fmt::Display for ConstructorDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wired {
            f.write_str("#[wired] ")?;
        }
        write!(f, "{}(", self.owner)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

/// One argument slot of a method call.
pub enum CallArg<'a> {
    /// The incoming message.
    Message(&'a dyn Message),
    /// A provider-resolved dependency.
    Shared(Dependency),
}

/// Arguments handed to a method body, positionally matching its parameters.
pub struct CallArgs<'a> {
    slots: Vec<CallArg<'a>>,
    context: Option<&'a ReceiveContext>,
}

impl<'a> CallArgs<'a> {
    /// No arguments, no context.
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            context: None,
        }
    }

    pub(crate) fn new(slots: Vec<CallArg<'a>>, context: Option<&'a ReceiveContext>) -> Self {
        Self { slots, context }
    }

    /// Number of argument slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no argument slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The message at `index`, downcast to `M`.
    pub fn message<M: Any>(&self, index: usize) -> Result<&'a M, InvokeError> {
        self.raw_message(index)?
            .as_any()
            .downcast_ref::<M>()
            .ok_or(InvokeError::ArgumentType {
                index,
                expected: std::any::type_name::<M>(),
            })
    }

    /// The message at `index`, still type-erased.
    pub fn raw_message(&self, index: usize) -> Result<&'a dyn Message, InvokeError> {
        match self.slots.get(index) {
            Some(CallArg::Message(message)) => Ok(*message),
            Some(CallArg::Shared(_)) => Err(InvokeError::ArgumentType {
                index,
                expected: "message",
            }),
            None => Err(InvokeError::MissingArgument { index }),
        }
    }

    /// The dependency at `index`, downcast to `D`.
    pub fn shared<D: Any + Send + Sync>(&self, index: usize) -> Result<Arc<D>, InvokeError> {
        match self.slots.get(index) {
            Some(CallArg::Shared(dep)) => {
                Arc::clone(dep)
                    .downcast::<D>()
                    .map_err(|_| InvokeError::ArgumentType {
                        index,
                        expected: std::any::type_name::<D>(),
                    })
            }
            Some(CallArg::Message(_)) => Err(InvokeError::ArgumentType {
                index,
                expected: std::any::type_name::<D>(),
            }),
            None => Err(InvokeError::MissingArgument { index }),
        }
    }

    /// Self/sender handles supplied by the runtime, when dispatching.
    pub fn context(&self) -> Option<&'a ReceiveContext> {
        self.context
    }
}

/// Arguments handed to a constructor body.
///
/// Each slot can be taken once; caller-supplied values are owned,
/// provider-resolved values are shared.
pub struct CtorArgs {
    slots: Vec<Option<CtorSlot>>,
}

pub(crate) enum CtorSlot {
    Owned(Box<dyn Any + Send>),
    Shared(Dependency),
}

impl CtorArgs {
    pub(crate) fn new(slots: Vec<CtorSlot>) -> Self {
        Self {
            slots: slots.into_iter().map(Some).collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Take the caller-supplied value at `index` as `V`.
    pub fn take<V: Any>(&mut self, index: usize) -> Result<V, InvokeError> {
        let slot = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(InvokeError::MissingArgument { index })?;
        match slot {
            CtorSlot::Owned(value) => value
                .downcast::<V>()
                .map(|v| *v)
                .map_err(|_| InvokeError::ArgumentType {
                    index,
                    expected: std::any::type_name::<V>(),
                }),
            CtorSlot::Shared(_) => Err(InvokeError::ArgumentType {
                index,
                expected: std::any::type_name::<V>(),
            }),
        }
    }

    /// Take the provider-resolved dependency at `index` as `Arc<D>`.
    pub fn shared<D: Any + Send + Sync>(&mut self, index: usize) -> Result<Arc<D>, InvokeError> {
        let slot = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(InvokeError::MissingArgument { index })?;
        let expected = std::any::type_name::<D>();
        match slot {
            CtorSlot::Shared(dep) => dep
                .downcast::<D>()
                .map_err(|_| InvokeError::ArgumentType { index, expected }),
            CtorSlot::Owned(_) => Err(InvokeError::ArgumentType { index, expected }),
        }
    }
}

/// Read-only accessor returning a routing key.
pub(crate) fn key_getter<T, V, F>(f: F) -> RefFn<T>
where
    T: 'static,
    V: Into<KeyValue>,
    F: Fn(&T) -> Option<V> + Send + Sync + 'static,
{
    ref_fn(move |target: &T, _args: &CallArgs<'_>| {
        Ok(f(target).map(|value| {
            let key: KeyValue = value.into();
            Box::new(key) as Returned
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifiers_are_order_independent() {
        let a = Qualifiers::named("primary").with("eu");
        let b = Qualifiers::named("eu").with("primary");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "@eu,@primary");
    }

    #[test]
    fn test_ctor_args_take_once() {
        let mut args = CtorArgs::new(vec![CtorSlot::Owned(Box::new(5_i32))]);
        assert_eq!(args.take::<i32>(0).expect("first take"), 5);
        assert!(matches!(
            args.take::<i32>(0),
            Err(InvokeError::MissingArgument { index: 0 })
        ));
    }

    #[test]
    fn test_ctor_args_type_mismatch() {
        let mut args = CtorArgs::new(vec![CtorSlot::Owned(Box::new("text"))]);
        assert!(matches!(
            args.take::<i32>(0),
            Err(InvokeError::ArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn test_call_args_message_and_shared() {
        let message = 42_i32;
        let dep: Dependency = Arc::new(String::from("db"));
        let args = CallArgs::new(vec![CallArg::Message(&message), CallArg::Shared(dep)], None);

        assert_eq!(*args.message::<i32>(0).expect("message"), 42);
        assert_eq!(args.shared::<String>(1).expect("shared").as_str(), "db");
        assert!(args.message::<String>(0).is_err());
        assert!(args.shared::<i32>(1).is_err());
        assert!(matches!(
            args.message::<i32>(2),
            Err(InvokeError::MissingArgument { index: 2 })
        ));
    }
}
