//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::shard::AccessorConvention;

/// Default number of shard groups.
pub const DEFAULT_SHARD_CARDINALITY: u32 = 100;

/// Settings of a [`Wiring`](crate::Wiring).
///
/// # Example
///
/// ```rust,ignore
/// let config = WiringConfig::from_json(r#"{ "shard_cardinality": 64 }"#)?;
/// assert_eq!(config.accessor_convention, AccessorConvention::JavaBean);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// Number of shard groups; shard ids lie in `[0, shard_cardinality)`.
    pub shard_cardinality: u32,
    /// Naming of key-field accessors.
    pub accessor_convention: AccessorConvention,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            shard_cardinality: DEFAULT_SHARD_CARDINALITY,
            accessor_convention: AccessorConvention::default(),
        }
    }
}

impl WiringConfig {
    /// Parse and validate a JSON document; missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_cardinality == 0 {
            return Err(ConfigError::InvalidCardinality(self.shard_cardinality));
        }
        Ok(())
    }
}
