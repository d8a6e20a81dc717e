//! Identity handles supplied by the runtime when a message is delivered.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ActorIdError;

/// Identifier of a virtual actor.
///
/// # String Format
///
/// `namespace::actor_type/key`, e.g. `prod::BankAccount/alice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId {
    /// Logical namespace.
    pub namespace: String,
    /// Actor type name.
    pub actor_type: String,
    /// Key within namespace and type.
    pub key: String,
}

impl ActorId {
    /// Create an id from its parts.
    ///
    /// # Errors
    ///
    /// Returns `ActorIdError::EmptyField` if any part is empty.
    pub fn from_parts(
        namespace: impl Into<String>,
        actor_type: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, ActorIdError> {
        let id = Self {
            namespace: namespace.into(),
            actor_type: actor_type.into(),
            key: key.into(),
        };
        id.check()?;
        Ok(id)
    }

    /// Parse `namespace::actor_type/key`.
    ///
    /// # Errors
    ///
    /// Returns `ActorIdError::InvalidFormat` if the separators are missing,
    /// `ActorIdError::EmptyField` if a part is empty.
    pub fn from_string(s: &str) -> Result<Self, ActorIdError> {
        let (namespace, rest) = s.split_once("::").ok_or(ActorIdError::InvalidFormat)?;
        let (actor_type, key) = rest.split_once('/').ok_or(ActorIdError::InvalidFormat)?;
        if rest.contains("::") || key.contains('/') {
            return Err(ActorIdError::InvalidFormat);
        }
        Self::from_parts(namespace, actor_type, key)
    }

    /// The actor type.
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    fn check(&self) -> Result<(), ActorIdError> {
        for (name, value) in [
            ("namespace", &self.namespace),
            ("actor_type", &self.actor_type),
            ("key", &self.key),
        ] {
            if value.is_empty() {
                return Err(ActorIdError::EmptyField(name.to_string()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}/{}", self.namespace, self.actor_type, self.key)
    }
}

/// Self and sender handles for the message being dispatched.
///
/// Handlers read it through [`CallArgs::context`](crate::types::CallArgs::context).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveContext {
    self_id: Option<ActorId>,
    sender: Option<ActorId>,
}

impl ReceiveContext {
    /// Context for delivery to `self_id`.
    pub fn new(self_id: ActorId) -> Self {
        Self {
            self_id: Some(self_id),
            sender: None,
        }
    }

    /// Context without identities, e.g. for tests or local calls.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Set the sending actor.
    pub fn with_sender(mut self, sender: ActorId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// The receiving actor.
    pub fn self_id(&self) -> Option<&ActorId> {
        self.self_id.as_ref()
    }

    /// The sending actor, if the message came from one.
    pub fn sender(&self) -> Option<&ActorId> {
        self.sender.as_ref()
    }
}
