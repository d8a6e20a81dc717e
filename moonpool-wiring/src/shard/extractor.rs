//! Routing key extraction.
//!
//! # Member lookup
//!
//! ```text
//! for role in [SHARD_KEY, ENTITY_KEY]:
//!   1. first method carrying the marker   → must take no parameters, read-only
//!   2. first field carrying the marker    → accessor named by the convention
//!   3. nothing                            → shard falls back to entity,
//!                                           missing entity is an error
//! ```
//!
//! Bindings are computed once per message type and published in the
//! [`Registry`].

use std::sync::Arc;

use crate::error::{ConfigError, DiscoveryError, InvokeError, KeyRole, ShardKeyError};
use crate::registry::Registry;
use crate::shard::naming::{accessor_name, AccessorConvention};
use crate::shard::KeyValue;
use crate::types::{
    CallArgs, Describe, MemberMarkers, Message, MethodDef, RefFn, TypeDescriptor, TypeKey,
};

struct KeyMember<M> {
    name: String,
    read: RefFn<M>,
}

impl<M> Clone for KeyMember<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            read: Arc::clone(&self.read),
        }
    }
}

/// The shard-key and entity-key members of one message type.
pub struct ShardKeyBinding<M> {
    message: TypeKey,
    shard: KeyMember<M>,
    entity: KeyMember<M>,
}

impl<M: 'static> ShardKeyBinding<M> {
    /// Locate the key members of `M`.
    ///
    /// # Errors
    ///
    /// `MissingKeyMember` when nothing carries the entity key,
    /// `MissingAccessor` when a key field has no accessor,
    /// `InvalidKeyAccessor` when the member takes parameters or mutates.
    pub fn bind(
        descriptor: &TypeDescriptor<M>,
        convention: AccessorConvention,
    ) -> Result<Self, DiscoveryError> {
        let message = descriptor.key();
        let entity = find_member(descriptor, KeyRole::Entity, convention)?.ok_or(
            DiscoveryError::MissingKeyMember {
                message,
                role: KeyRole::Entity,
            },
        )?;
        let shard = match find_member(descriptor, KeyRole::Shard, convention)? {
            Some(member) => member,
            None => entity.clone(),
        };

        tracing::debug!(
            message = %message,
            shard = %shard.name,
            entity = %entity.name,
            "bound routing keys"
        );

        Ok(Self {
            message,
            shard,
            entity,
        })
    }

    /// Rendered shard-key member.
    pub fn shard_member(&self) -> &str {
        &self.shard.name
    }

    /// Rendered entity-key member.
    pub fn entity_member(&self) -> &str {
        &self.entity.name
    }

    /// Raw shard key of `message`.
    pub fn shard_key(&self, message: &M) -> Result<KeyValue, ShardKeyError> {
        self.read(&self.shard, KeyRole::Shard, message)
    }

    /// Raw entity key of `message`.
    pub fn entity_key(&self, message: &M) -> Result<KeyValue, ShardKeyError> {
        self.read(&self.entity, KeyRole::Entity, message)
    }

    fn read(
        &self,
        member: &KeyMember<M>,
        role: KeyRole,
        message: &M,
    ) -> Result<KeyValue, ShardKeyError> {
        let raw = (member.read)(message, &CallArgs::empty())?.ok_or(ShardKeyError::NullKey {
            message: self.message,
            role,
        })?;
        KeyValue::from_any(raw).map_err(|_| {
            ShardKeyError::Invoke(InvokeError::failed(format!(
                "{} did not return a key value",
                member.name
            )))
        })
    }
}

fn find_member<M: 'static>(
    descriptor: &TypeDescriptor<M>,
    role: KeyRole,
    convention: AccessorConvention,
) -> Result<Option<KeyMember<M>>, DiscoveryError> {
    let marker = match role {
        KeyRole::Shard => MemberMarkers::SHARD_KEY,
        KeyRole::Entity => MemberMarkers::ENTITY_KEY,
    };

    if let Some(method) = descriptor
        .methods()
        .iter()
        .find(|m| m.markers().contains(marker))
    {
        return key_member(descriptor.key(), method).map(Some);
    }

    let Some(field) = descriptor
        .fields()
        .iter()
        .find(|f| f.markers().contains(marker))
    else {
        return Ok(None);
    };

    let accessor = accessor_name(field.name(), field.ty().is_bool(), convention);
    let method = descriptor
        .find_accessor(&accessor)
        .ok_or_else(|| DiscoveryError::MissingAccessor {
            message: descriptor.key(),
            field: field.name().to_string(),
            accessor: accessor.clone(),
        })?;
    key_member(descriptor.key(), method).map(Some)
}

fn key_member<M: 'static>(
    message: TypeKey,
    method: &MethodDef<M>,
) -> Result<KeyMember<M>, DiscoveryError> {
    let invalid = || DiscoveryError::InvalidKeyAccessor {
        message,
        method: method.name().to_string(),
    };
    if !method.params().is_empty() {
        return Err(invalid());
    }
    let read = method.body.as_ref_fn().ok_or_else(invalid)?;
    Ok(KeyMember {
        name: method.to_string(),
        read: Arc::clone(read),
    })
}

/// Type-erased access to a binding, for callers holding `&dyn Message`.
pub(crate) trait RoutingKeys: Send + Sync {
    fn key(&self, message: &dyn Message, role: KeyRole) -> Result<KeyValue, ShardKeyError>;
}

impl<M: 'static> RoutingKeys for ShardKeyBinding<M> {
    fn key(&self, message: &dyn Message, role: KeyRole) -> Result<KeyValue, ShardKeyError> {
        let typed = message
            .as_any()
            .downcast_ref::<M>()
            .ok_or(ShardKeyError::Unregistered(message.message_type()))?;
        match role {
            KeyRole::Shard => self.shard_key(typed),
            KeyRole::Entity => self.entity_key(typed),
        }
    }
}

/// Shard group of a raw key: `|hash code| mod cardinality`.
///
/// The absolute value is taken as unsigned, so `i32::MIN` stays in range.
pub fn shard_of(key: &KeyValue, cardinality: u32) -> u32 {
    key.hash_code().unsigned_abs() % cardinality
}

/// Computes shard ids and entity ids.
pub struct ShardKeyExtractor {
    registry: Arc<Registry>,
    cardinality: u32,
}

impl ShardKeyExtractor {
    /// Extractor over `registry` with `cardinality` shard groups.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCardinality` for a zero cardinality.
    pub fn new(registry: Arc<Registry>, cardinality: u32) -> Result<Self, ConfigError> {
        if cardinality == 0 {
            return Err(ConfigError::InvalidCardinality(cardinality));
        }
        Ok(Self {
            registry,
            cardinality,
        })
    }

    /// Configured number of shard groups.
    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    /// Bind the key members of `M` so type-erased lookups find them.
    pub fn register<M: Describe + Message>(&self) -> Result<(), DiscoveryError> {
        self.registry.routing_keys::<M>().map(|_| ())
    }

    /// Shard id of a registered message type.
    pub fn shard_id(&self, message: &dyn Message) -> Result<String, ShardKeyError> {
        let key = self.erased_key(message, KeyRole::Shard)?;
        Ok(shard_of(&key, self.cardinality).to_string())
    }

    /// Entity id of a registered message type.
    pub fn entity_id(&self, message: &dyn Message) -> Result<String, ShardKeyError> {
        Ok(self.erased_key(message, KeyRole::Entity)?.to_string())
    }

    /// Shard id of `message`, binding `M` on first use.
    pub fn shard_id_of<M: Describe + Message>(&self, message: &M) -> Result<String, ShardKeyError> {
        let key = self.registry.routing_keys::<M>()?.key(message, KeyRole::Shard)?;
        Ok(shard_of(&key, self.cardinality).to_string())
    }

    /// Entity id of `message`, binding `M` on first use.
    pub fn entity_id_of<M: Describe + Message>(&self, message: &M) -> Result<String, ShardKeyError> {
        let key = self.registry.routing_keys::<M>()?.key(message, KeyRole::Entity)?;
        Ok(key.to_string())
    }

    fn erased_key(&self, message: &dyn Message, role: KeyRole) -> Result<KeyValue, ShardKeyError> {
        let binding = self
            .registry
            .routing_keys_for(message.message_type())
            .ok_or(ShardKeyError::Unregistered(message.message_type()))?;
        binding.key(message, role)
    }
}
