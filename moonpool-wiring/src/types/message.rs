//! The message abstraction seen by the dispatcher.

use std::any::Any;
use std::fmt;

use super::TypeKey;

/// Any value that can be delivered to an actor.
///
/// Implemented for every `'static + Send + Debug` type, so plain values
/// such as `7_i32` or `String` are messages without further ceremony.
/// The runtime type reported by [`Message::message_type`] is the key used
/// for exact-match dispatch.
///
/// # Boxed messages
///
/// A `Box<dyn Message>` is itself a `Message` of type `Box<dyn Message>`.
/// Dereference it (`&*boxed`) before dispatching so the inner type is seen.
pub trait Message: Any + Send + fmt::Debug {
    /// Upcast for downcasting to the concrete message type.
    fn as_any(&self) -> &dyn Any;

    /// Exact runtime type of this message.
    fn message_type(&self) -> TypeKey;
}

impl<M: Any + Send + fmt::Debug> Message for M {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn message_type(&self) -> TypeKey {
        TypeKey::of::<M>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Deposit {
        amount: u64,
    }

    #[test]
    fn test_message_type_is_runtime_type() {
        let message: &dyn Message = &Deposit { amount: 10 };
        assert_eq!(message.message_type(), TypeKey::of::<Deposit>());
        assert_eq!(message.as_any().downcast_ref::<Deposit>().map(|d| d.amount), Some(10));
        assert!(message.as_any().downcast_ref::<i32>().is_none());
    }

    #[test]
    fn test_boxed_message_must_be_dereferenced() {
        let boxed: Box<dyn Message> = Box::new(7_i32);
        assert_eq!((*boxed).message_type(), TypeKey::of::<i32>());
    }
}
