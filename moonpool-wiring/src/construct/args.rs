//! Caller-supplied positional arguments.

use std::any::Any;
use std::fmt;

use crate::types::TypeKey;

/// One positional argument passed to [`create`](crate::Wiring::create).
pub struct Arg {
    key: TypeKey,
    value: Box<dyn Any + Send>,
}

impl Arg {
    /// Wrap `value`; its static type is the argument type.
    pub fn new<V: Any + Send>(value: V) -> Self {
        Self {
            key: TypeKey::of::<V>(),
            value: Box::new(value),
        }
    }

    /// Argument type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub(crate) fn into_value(self) -> Box<dyn Any + Send> {
        self.value
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arg({})", self.key)
    }
}

/// Build a `Vec<Arg>` from values.
///
/// ```rust,ignore
/// let account: Account = wiring.create(args![5_i32, "alice".to_string()])?;
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::construct::Arg::new($value)),*]
    };
}
