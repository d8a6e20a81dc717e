//! The dependency provider seam.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::types::{Dependency, Qualifiers, TypeKey};

/// What a provider is asked for: a declared type narrowed by qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyKey {
    ty: TypeKey,
    qualifiers: Qualifiers,
}

impl DependencyKey {
    /// Key for `ty` with `qualifiers`.
    pub fn new(ty: TypeKey, qualifiers: Qualifiers) -> Self {
        Self { ty, qualifiers }
    }

    /// Unqualified key for `D`.
    pub fn of<D: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<D>(), Qualifiers::none())
    }

    /// Add a qualifier.
    pub fn qualified(mut self, name: impl Into<String>) -> Self {
        self.qualifiers = self.qualifiers.with(name);
        self
    }

    /// Declared type.
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    /// Qualifiers.
    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifiers.is_empty() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{} {}", self.qualifiers, self.ty)
        }
    }
}

/// External dependency container.
///
/// Called while constructing instances (wired constructor parameters,
/// injectable fields) and while dispatching to injectable handlers.
pub trait DependencyProvider: Send + Sync {
    /// Resolve `key` to a shared instance.
    ///
    /// # Errors
    ///
    /// `ResolveError::NotBound` when nothing matches.
    fn resolve(&self, key: &DependencyKey) -> Result<Dependency, ResolveError>;
}

/// In-memory provider with fixed bindings.
///
/// # Example
///
/// ```rust,ignore
/// let provider = StaticProvider::new()
///     .bind(Database::connect("primary"))
///     .bind_named("audit", Database::connect("audit"));
/// ```
#[derive(Default, Clone)]
pub struct StaticProvider {
    bindings: HashMap<DependencyKey, Dependency>,
}

impl StaticProvider {
    /// Provider without bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` as the unqualified instance of `D`.
    pub fn bind<D: Any + Send + Sync>(self, value: D) -> Self {
        self.bind_arc(Arc::new(value))
    }

    /// Bind a shared instance of `D`.
    pub fn bind_arc<D: Any + Send + Sync>(mut self, value: Arc<D>) -> Self {
        self.bindings.insert(DependencyKey::of::<D>(), value);
        self
    }

    /// Bind `value` as the instance of `D` qualified by `qualifier`.
    pub fn bind_named<D: Any + Send + Sync>(mut self, qualifier: impl Into<String>, value: D) -> Self {
        self.bindings
            .insert(DependencyKey::of::<D>().qualified(qualifier), Arc::new(value));
        self
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for StaticProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.bindings.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("StaticProvider").field("bindings", &keys).finish()
    }
}

impl DependencyProvider for StaticProvider {
    fn resolve(&self, key: &DependencyKey) -> Result<Dependency, ResolveError> {
        self.bindings
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::NotBound(key.clone()))
    }
}
