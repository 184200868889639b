//! Stable emitter identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable emitter identifier handed out by the hosting particle system.
///
/// Ids are allocated by their owner rather than from a process-wide counter,
/// so two systems never share allocation state.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmitterId(pub u64);

impl EmitterId {
    /// Create an EmitterId from a raw value (for deserialization/testing)
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The id following this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmitterId({})", self.0)
    }
}

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
