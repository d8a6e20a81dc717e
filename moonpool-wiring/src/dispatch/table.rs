//! Immutable per-type dispatch tables.
//!
//! # Layout
//!
//! ```text
//! DispatchTable<Account>
//! ├── entries (ascending message depth, then type name)
//! │     Deposit   → Account::on_deposit
//! │     Withdraw  → Account::on_withdraw   [validate]
//! │     Snapshot  → Entity::on_snapshot    [event]
//! ├── index: TypeKey → entry position      (exact match only)
//! └── fallback: declared method | configured sink
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::discovery::{FallbackBinding, HandlerBinding};
use crate::types::TypeKey;

/// What receives messages without a matching entry.
pub enum Fallback<T> {
    /// A method declared with the fallback marker.
    Declared(FallbackBinding<T>),
    /// The dispatcher's unhandled sink.
    Sink,
}

impl<T> Fallback<T> {
    /// Whether the type declares its own fallback.
    pub fn is_declared(&self) -> bool {
        matches!(self, Fallback::Declared(_))
    }
}

impl<T> fmt::Display for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Declared(binding) => write!(f, "{binding}"),
            Fallback::Sink => f.write_str("<sink>"),
        }
    }
}

/// Exact-type mapping from message type to handler for one actor type.
pub struct DispatchTable<T> {
    owner: TypeKey,
    entries: Vec<HandlerBinding<T>>,
    index: HashMap<TypeKey, usize>,
    fallback: Fallback<T>,
}

impl<T: 'static> DispatchTable<T> {
    /// Build a table from discovered bindings.
    ///
    /// Entries are ordered by the message depth each handler declared, so
    /// the order depends only on the actor type's own description.
    pub fn build(
        owner: TypeKey,
        mut entries: Vec<HandlerBinding<T>>,
        fallback: Option<FallbackBinding<T>>,
    ) -> Self {
        entries.sort_by(|a, b| {
            a.message_depth()
                .cmp(&b.message_depth())
                .then_with(|| a.message().cmp(&b.message()))
        });
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, binding)| (binding.message(), position))
            .collect();
        let fallback = match fallback {
            Some(binding) => Fallback::Declared(binding),
            None => Fallback::Sink,
        };
        Self {
            owner,
            entries,
            index,
            fallback,
        }
    }

    /// Actor type this table belongs to.
    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    /// Handler for exactly `message_type`. Supertypes are never consulted.
    pub fn lookup(&self, message_type: TypeKey) -> Option<&HandlerBinding<T>> {
        self.index
            .get(&message_type)
            .map(|&position| &self.entries[position])
    }

    /// Entries in deterministic order.
    pub fn entries(&self) -> &[HandlerBinding<T>] {
        &self.entries
    }

    /// Number of entries, not counting the fallback.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The fallback.
    pub fn fallback(&self) -> &Fallback<T> {
        &self.fallback
    }

    /// Message types whose handlers also observe published events.
    pub fn observed_messages(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.entries
            .iter()
            .filter(|b| b.is_event_observed())
            .map(HandlerBinding::message)
    }
}

impl<T> PartialEq for DispatchTable<T> {
    fn eq(&self, other: &Self) -> bool {
        let same_fallback = match (&self.fallback, &other.fallback) {
            (Fallback::Declared(a), Fallback::Declared(b)) => a.to_string() == b.to_string(),
            (Fallback::Sink, Fallback::Sink) => true,
            _ => false,
        };
        self.owner == other.owner && self.entries == other.entries && same_fallback
    }
}

impl<T> fmt::Debug for DispatchTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("owner", &self.owner)
            .field("entries", &self.entries)
            .field("fallback", &self.fallback.to_string())
            .finish()
    }
}
