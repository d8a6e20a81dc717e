//! Type identity and the nullable-boxing equivalence table.
//!
//! `TypeKey` pairs a `TypeId` with the type's name so that descriptors,
//! dispatch tables and error messages can all refer to types without
//! holding a generic parameter.
//!
//! # Nullable boxing
//!
//! Positional constructor arguments are matched against parameter types
//! through a fixed equivalence table: each primitive is considered
//! assignable to and from its nullable box, `Option<P>`.
//!
//! ```text
//! bool  ⇄ Option<bool>     i8  ⇄ Option<i8>     i16 ⇄ Option<i16>
//! char  ⇄ Option<char>     i32 ⇄ Option<i32>    i64 ⇄ Option<i64>
//! f32   ⇄ Option<f32>      f64 ⇄ Option<f64>    ()  ⇄ Option<()>
//! ```

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a Rust type: its `TypeId` plus its name for diagnostics.
///
/// Equality, ordering of identity and hashing only look at the `TypeId`;
/// the name is carried along for logs and error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`. Unsized types such as `dyn Trait` are accepted, which is
    /// how interface levels are identified.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`my_crate::Deposit` → `Deposit`).
    ///
    /// Generic arguments are kept as-is: `core::option::Option<i32>` →
    /// `Option<i32>`.
    pub fn short_name(&self) -> &'static str {
        let head = self.name.split('<').next().unwrap_or(self.name);
        match head.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }

    /// Canonical key used for assignability checks: primitives map to their
    /// nullable box, everything else maps to itself.
    pub fn boxed(self) -> TypeKey {
        boxed(self)
    }

    /// Whether an argument of type `arg` may be bound to a parameter of
    /// type `self`.
    pub fn accepts(self, arg: TypeKey) -> bool {
        self == arg || boxed(self) == boxed(arg)
    }

    /// Whether this is `bool`, which selects the `is` accessor prefix.
    pub fn is_bool(&self) -> bool {
        self.id == TypeId::of::<bool>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    // Names first so iteration order is stable across builds.
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

macro_rules! boxing_table {
    ($($prim:ty),* $(,)?) => {
        fn boxed(key: TypeKey) -> TypeKey {
            $(
                if key == TypeKey::of::<$prim>() {
                    return TypeKey::of::<Option<$prim>>();
                }
            )*
            key
        }

        /// Convert an argument value into the representation expected by a
        /// parameter of type `target`, following the boxing table.
        ///
        /// Returns the value untouched (as `Err`) when no conversion applies,
        /// including `None` flowing into a non-optional primitive.
        pub(crate) fn coerce(
            value: Box<dyn Any + Send>,
            target: TypeKey,
        ) -> Result<Box<dyn Any + Send>, Box<dyn Any + Send>> {
            $(
                if target == TypeKey::of::<Option<$prim>>() {
                    return match value.downcast::<$prim>() {
                        Ok(inner) => Ok(Box::new(Some(*inner))),
                        Err(original) => Err(original),
                    };
                }
                if target == TypeKey::of::<$prim>() {
                    return match value.downcast::<Option<$prim>>() {
                        Ok(boxed) => match *boxed {
                            Some(inner) => Ok(Box::new(inner)),
                            None => Err(Box::new(None::<$prim>)),
                        },
                        Err(original) => Err(original),
                    };
                }
            )*
            Err(value)
        }
    };
}

boxing_table!(bool, i8, i16, char, i32, i64, f32, f64, ());

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {}

    #[test]
    fn test_short_name_strips_module_path() {
        assert_eq!(TypeKey::of::<String>().short_name(), "String");
        assert_eq!(TypeKey::of::<Option<i32>>().short_name(), "Option<i32>");
        assert_eq!(TypeKey::of::<i32>().short_name(), "i32");
        assert!(TypeKey::of::<dyn Greeter>().short_name().contains("Greeter"));
    }

    #[test]
    fn test_equality_uses_type_id() {
        assert_eq!(TypeKey::of::<i32>(), TypeKey::of::<i32>());
        assert_ne!(TypeKey::of::<i32>(), TypeKey::of::<i64>());
    }

    #[test]
    fn test_boxing_table_accepts_primitive_and_option() {
        let int = TypeKey::of::<i32>();
        let boxed_int = TypeKey::of::<Option<i32>>();

        assert!(int.accepts(int));
        assert!(int.accepts(boxed_int));
        assert!(boxed_int.accepts(int));
        assert!(!int.accepts(TypeKey::of::<i64>()));
        assert!(!TypeKey::of::<String>().accepts(TypeKey::of::<Option<String>>()));
    }

    #[test]
    fn test_coerce_wraps_and_unwraps() {
        let wrapped = coerce(Box::new(5_i32), TypeKey::of::<Option<i32>>())
            .expect("i32 should wrap into Option<i32>");
        assert_eq!(wrapped.downcast_ref::<Option<i32>>(), Some(&Some(5)));

        let unwrapped = coerce(Box::new(Some(7_i64)), TypeKey::of::<i64>())
            .expect("Some(i64) should unwrap into i64");
        assert_eq!(unwrapped.downcast_ref::<i64>(), Some(&7));

        assert!(coerce(Box::new(None::<i64>), TypeKey::of::<i64>()).is_err());
        assert!(coerce(Box::new("text"), TypeKey::of::<i32>()).is_err());
    }
}
