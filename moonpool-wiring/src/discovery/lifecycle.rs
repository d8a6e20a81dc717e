//! Lifecycle callbacks and injectable fields.
//!
//! Ordering:
//!
//! ```text
//! injection       root level first, declaration order within a level
//! post-construct  root level first, declaration order within a level
//! pre-destroy     concrete-first (scan order)
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::construct::DependencyKey;
use crate::error::{DiscoveryError, InvokeError};
use crate::types::{
    CallArgs, Dependency, MemberMarkers, MethodBody, MethodDef, SetFn, TypeDescriptor, TypeKey,
};

/// A zero-argument callback.
pub struct LifecycleCallback<T> {
    declaring: TypeKey,
    method: Cow<'static, str>,
    body: MethodBody<T>,
}

impl<T: 'static> LifecycleCallback<T> {
    fn from_method(method: &MethodDef<T>) -> Result<Self, DiscoveryError> {
        if !method.params().is_empty() {
            return Err(DiscoveryError::InvalidLifecycleCallback {
                declaring: method.declaring(),
                method: method.name().to_string(),
            });
        }
        Ok(Self {
            declaring: method.declaring(),
            method: method.name.clone(),
            body: method.body.clone(),
        })
    }

    /// Type that declared the callback.
    pub fn declaring(&self) -> TypeKey {
        self.declaring
    }

    /// Callback name.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn invoke(&self, target: &mut T) -> Result<(), InvokeError> {
        self.body.call_mut(target, &CallArgs::empty()).map(|_| ())
    }
}

impl<T> fmt::Display for LifecycleCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring, self.method)
    }
}

/// A field filled by the provider after construction.
pub struct InjectionPoint<T> {
    declaring: TypeKey,
    field: Cow<'static, str>,
    key: DependencyKey,
    setter: SetFn<T>,
}

impl<T> InjectionPoint<T> {
    /// Type that declared the field.
    pub fn declaring(&self) -> TypeKey {
        self.declaring
    }

    /// Field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// What the provider is asked for.
    pub fn key(&self) -> &DependencyKey {
        &self.key
    }

    pub(crate) fn inject(&self, target: &mut T, value: Dependency) -> Result<(), InvokeError> {
        (self.setter)(target, value)
    }
}

impl<T> fmt::Display for InjectionPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.field)
    }
}

/// Everything that runs around construction and disposal of an instance.
pub struct Lifecycle<T> {
    injections: Vec<InjectionPoint<T>>,
    post_construct: Vec<LifecycleCallback<T>>,
    pre_destroy: Vec<LifecycleCallback<T>>,
}

impl<T> Lifecycle<T> {
    /// Injectable fields, root-first.
    pub fn injections(&self) -> &[InjectionPoint<T>] {
        &self.injections
    }

    /// Post-construct callbacks, root-first.
    pub fn post_construct(&self) -> &[LifecycleCallback<T>] {
        &self.post_construct
    }

    /// Pre-destroy callbacks, concrete-first.
    pub fn pre_destroy(&self) -> &[LifecycleCallback<T>] {
        &self.pre_destroy
    }
}

/// Collect lifecycle callbacks and injection points of a type.
pub fn discover_lifecycle<T: 'static>(
    descriptor: &TypeDescriptor<T>,
) -> Result<Lifecycle<T>, DiscoveryError> {
    let callbacks = |marker: MemberMarkers| {
        descriptor
            .methods()
            .iter()
            .filter(|m| m.markers().contains(marker))
            .map(LifecycleCallback::from_method)
            .collect::<Result<Vec<_>, _>>()
    };

    let mut post_construct = callbacks(MemberMarkers::POST_CONSTRUCT)?;
    root_first(descriptor.hierarchy(), &mut post_construct, |c| c.declaring);
    let pre_destroy = callbacks(MemberMarkers::PRE_DESTROY)?;

    let mut injections: Vec<InjectionPoint<T>> = descriptor
        .fields()
        .iter()
        .filter(|f| f.markers().contains(MemberMarkers::INJECT))
        .filter_map(|f| {
            f.setter.as_ref().map(|setter| InjectionPoint {
                declaring: f.declaring(),
                field: f.name.clone(),
                key: DependencyKey::new(f.ty(), f.qualifiers().clone()),
                setter: setter.clone(),
            })
        })
        .collect();
    root_first(descriptor.hierarchy(), &mut injections, |p| p.declaring);

    Ok(Lifecycle {
        injections,
        post_construct,
        pre_destroy,
    })
}

// Stable, so declaration order is kept within a level.
fn root_first<M>(hierarchy: &[TypeKey], members: &mut [M], declaring: fn(&M) -> TypeKey) {
    members.sort_by_key(|m| {
        let level = hierarchy
            .iter()
            .position(|k| *k == declaring(m))
            .unwrap_or(0);
        std::cmp::Reverse(level)
    });
}
