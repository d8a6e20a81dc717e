//! Accessor names used when a key marker sits on a field.

use serde::{Deserialize, Serialize};

/// How a key field's accessor is named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorConvention {
    /// `get` + capitalised field name, `is` + capitalised name for `bool` fields.
    #[default]
    JavaBean,
    /// The field name itself, `is_` + field name for `bool` fields.
    SnakeCase,
}

/// Name of the accessor expected for `field`.
///
/// ```text
/// JavaBean   tenant → getTenant    active (bool) → isActive
/// SnakeCase  tenant → tenant       active (bool) → is_active
/// ```
pub fn accessor_name(field: &str, is_bool: bool, convention: AccessorConvention) -> String {
    match convention {
        AccessorConvention::JavaBean => {
            let prefix = if is_bool { "is" } else { "get" };
            format!("{prefix}{}", capitalize(field))
        }
        AccessorConvention::SnakeCase if is_bool => format!("is_{field}"),
        AccessorConvention::SnakeCase => field.to_string(),
    }
}

/// Upper-case the first character, leave the rest untouched.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
