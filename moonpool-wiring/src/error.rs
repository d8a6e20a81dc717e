//! Error types for wiring, construction, dispatch and routing.

use thiserror::Error;

use crate::construct::DependencyKey;
use crate::types::TypeKey;

/// Role of a routing key member on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Member marked `SHARD_KEY`.
    Shard,
    /// Member marked `ENTITY_KEY`.
    Entity,
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyRole::Shard => f.write_str("shard key"),
            KeyRole::Entity => f.write_str("entity key"),
        }
    }
}

/// Errors raised while inspecting a type's declared members.
///
/// These are raised at registration, before any instance exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// A handler has zero or several message parameters.
    #[error("handler {declaring}::{method} must have exactly one message parameter, found {found}")]
    AmbiguousOrMissingMessageParameter {
        /// Type declaring the handler.
        declaring: TypeKey,
        /// Handler name.
        method: String,
        /// Number of parameters marked as receiving the message.
        found: usize,
    },

    /// A non-injectable handler declares a parameter other than the message.
    #[error("handler {declaring}::{method} has parameter {index} that is neither the message nor injectable")]
    UnboundHandlerParameter {
        /// Type declaring the handler.
        declaring: TypeKey,
        /// Handler name.
        method: String,
        /// Offending parameter position.
        index: usize,
    },

    /// A lifecycle callback declares parameters.
    #[error("lifecycle callback {declaring}::{method} must take no parameters")]
    InvalidLifecycleCallback {
        /// Type declaring the callback.
        declaring: TypeKey,
        /// Callback name.
        method: String,
    },

    /// A message type has no member carrying the required routing key.
    #[error("message {message} has no {role} member")]
    MissingKeyMember {
        /// Message type.
        message: TypeKey,
        /// Missing role.
        role: KeyRole,
    },

    /// A key field has no matching accessor.
    #[error("message {message} has no accessor {accessor} for key field {field}")]
    MissingAccessor {
        /// Message type.
        message: TypeKey,
        /// Key field name.
        field: String,
        /// Expected accessor name.
        accessor: String,
    },

    /// A key member cannot be read without mutating the message.
    #[error("key member {message}::{method} must be a read-only accessor")]
    InvalidKeyAccessor {
        /// Message type.
        message: TypeKey,
        /// Member name.
        method: String,
    },
}

/// Errors raised by a member body while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// No argument at the given position (or already taken).
    #[error("missing argument at position {index}")]
    MissingArgument {
        /// Argument position.
        index: usize,
    },

    /// The argument at the given position has another type.
    #[error("argument at position {index} is not a {expected}")]
    ArgumentType {
        /// Argument position.
        index: usize,
        /// Expected type name.
        expected: &'static str,
    },

    /// More arguments were supplied than the member declares.
    #[error("{provided} argument(s) supplied, {expected} declared")]
    ExtraArguments {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        provided: usize,
    },

    /// The body itself failed.
    #[error("{0}")]
    Failed(String),
}

impl InvokeError {
    /// Failure with a free-form reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        InvokeError::Failed(reason.into())
    }
}

/// Errors raised by a [`DependencyProvider`](crate::construct::DependencyProvider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Nothing is bound for the key.
    #[error("no binding for {0}")]
    NotBound(DependencyKey),

    /// The binding exists but producing the value failed.
    #[error("resolving {key} failed: {reason}")]
    Failed {
        /// Requested key.
        key: DependencyKey,
        /// Provider-specific reason.
        reason: String,
    },
}

/// Errors raised while creating an instance.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// No constructor accepts the supplied arguments.
    #[error("no suitable constructor for {ty} with arguments ({}); candidates: [{}]", .args.join(", "), .candidates.join("; "))]
    NoSuitableConstructor {
        /// Type being created.
        ty: TypeKey,
        /// Rendered constructors considered.
        candidates: Vec<String>,
        /// Rendered argument types.
        args: Vec<String>,
    },

    /// A wired constructor's assisted parameters do not match the arguments.
    #[error("{constructor} takes {required} assisted argument(s), {provided} provided")]
    WrongArgumentCount {
        /// Rendered constructor.
        constructor: String,
        /// Assisted parameter count.
        required: usize,
        /// Supplied argument count.
        provided: usize,
    },

    /// A dependency could not be resolved.
    #[error("unresolved dependency for {member}: {source}")]
    UnresolvedDependency {
        /// Parameter or field that needed it.
        member: String,
        /// Provider error.
        #[source]
        source: ResolveError,
    },

    /// The type is abstract and cannot be created.
    #[error("{0} is abstract and cannot be instantiated")]
    AbstractType(TypeKey),

    /// The constructor body failed.
    #[error("instantiating {ty} failed: {source}")]
    InstantiationFailed {
        /// Type being created.
        ty: TypeKey,
        /// Body error.
        #[source]
        source: InvokeError,
    },

    /// A lifecycle callback failed.
    #[error("lifecycle callback {method} failed: {source}")]
    LifecycleFailed {
        /// Rendered callback.
        method: String,
        /// Callback error.
        #[source]
        source: InvokeError,
    },

    /// Discovery failed while registering the type.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Errors raised by the dispatcher.
///
/// Validation rejection and unhandled messages are outcomes, not errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Discovery failed while registering the actor type.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The handler failed.
    #[error("handler {method} failed: {source}")]
    HandlerFailed {
        /// Rendered handler.
        method: String,
        /// Handler error.
        #[source]
        source: InvokeError,
    },

    /// The declared fallback failed.
    #[error("fallback {method} failed: {source}")]
    FallbackFailed {
        /// Rendered fallback.
        method: String,
        /// Fallback error.
        #[source]
        source: InvokeError,
    },

    /// An injectable handler parameter could not be resolved.
    #[error("unresolved dependency for handler {method}: {source}")]
    UnresolvedDependency {
        /// Rendered handler.
        method: String,
        /// Provider error.
        #[source]
        source: ResolveError,
    },
}

/// Errors raised while extracting routing keys.
#[derive(Debug, Error)]
pub enum ShardKeyError {
    /// The key member produced no value.
    #[error("{role} of {message} is absent")]
    NullKey {
        /// Message type.
        message: TypeKey,
        /// Role whose value was absent.
        role: KeyRole,
    },

    /// The message type was never registered for routing.
    #[error("message type {0} is not registered for routing")]
    Unregistered(TypeKey),

    /// The key accessor failed.
    #[error("key accessor failed: {0}")]
    Invoke(#[from] InvokeError),

    /// Discovery failed while binding the message type.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Shard cardinality must be positive.
    #[error("invalid shard cardinality: {0} (must be at least 1)")]
    InvalidCardinality(u32),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors related to actor identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorIdError {
    /// Identifier string is not `namespace::actor_type/key`.
    #[error("invalid actor id format, expected namespace::actor_type/key")]
    InvalidFormat,

    /// A part of the identifier is empty.
    #[error("empty field: {0}")]
    EmptyField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_member() {
        let err = DiscoveryError::AmbiguousOrMissingMessageParameter {
            declaring: TypeKey::of::<String>(),
            method: "on_text".to_string(),
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "handler String::on_text must have exactly one message parameter, found 2"
        );

        let err = ConstructionError::NoSuitableConstructor {
            ty: TypeKey::of::<String>(),
            candidates: vec!["String(i32)".to_string(), "String(bool)".to_string()],
            args: vec!["f64".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no suitable constructor for String with arguments (f64); candidates: [String(i32); String(bool)]"
        );
    }

    #[test]
    fn test_discovery_error_converts() {
        let err: ConstructionError = DiscoveryError::InvalidLifecycleCallback {
            declaring: TypeKey::of::<u8>(),
            method: "init".to_string(),
        }
        .into();
        assert!(matches!(err, ConstructionError::Discovery(_)));
    }
}
