//! The validator seam consulted before validated handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Message;

/// One constraint a message does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Path of the offending member, empty for the whole message.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Violation of `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// External message validator.
pub trait Validator: Send + Sync {
    /// Constraint violations of `message`; empty means valid.
    fn validate(&self, message: &dyn Message) -> Vec<Violation>;
}

impl<F> Validator for F
where
    F: Fn(&dyn Message) -> Vec<Violation> + Send + Sync,
{
    fn validate(&self, message: &dyn Message) -> Vec<Violation> {
        self(message)
    }
}

/// Validator that accepts every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _message: &dyn Message) -> Vec<Violation> {
        Vec::new()
    }
}
