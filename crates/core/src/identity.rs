//! Identity of an event source.
//!
//! Every event a response produces carries the `id` of the identity that
//! produced it, so a consumer reading several agents' output can tell them
//! apart.

use serde::{Deserialize, Serialize};

/// A stable `(id, name)` pair naming the agent that emits events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Machine-facing identifier, copied into every event's `source` field.
    pub id: String,

    /// Human-readable display name.
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
