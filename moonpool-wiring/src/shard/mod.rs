//! Shard id and entity id extraction from message payloads.

mod extractor;
mod key;
pub mod naming;

pub use extractor::{shard_of, ShardKeyBinding, ShardKeyExtractor};
pub use key::KeyValue;
pub use naming::{accessor_name, AccessorConvention};

pub(crate) use extractor::RoutingKeys;
