//! Function descriptor metadata.
//!
//! A descriptor is the dispatcher's read-only view of an invocable unit:
//! its identity plus the flags that drive routing, authorization, and
//! buffering decisions.

use serde::{Deserialize, Serialize};

/// Authorization level attached to principals and required by descriptors.
///
/// Levels are totally ordered: `Anonymous < Function < Admin`. A principal
/// holding a level satisfies every requirement at or below it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AuthLevel {
    Anonymous,
    #[default]
    Function,
    Admin,
}

/// Metadata and identity for an invocable function unit.
///
/// Names are unique case-insensitively by convention; the directory tolerates
/// violations and resolves them first-registered-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Function name, matched case-insensitively on lookup.
    pub name: String,
    /// Proxy functions are routing overrides; they keep transport buffering
    /// enabled so bodies can be inspected and replayed.
    pub is_proxy: bool,
    /// Disabled functions answer as if they did not exist, unless the caller
    /// holds the admin level.
    pub is_disabled: bool,
    /// Authorization requirement evaluated against the caller's principal.
    pub auth_level: AuthLevel,
}

impl FunctionDescriptor {
    /// Create a descriptor with default flags (enabled, non-proxy,
    /// function-level authorization).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_proxy: false,
            is_disabled: false,
            auth_level: AuthLevel::Function,
        }
    }

    /// Mark this descriptor as a proxy function.
    pub fn proxy(mut self) -> Self {
        self.is_proxy = true;
        self
    }

    /// Mark this descriptor as disabled.
    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }

    /// Set the authorization requirement.
    pub fn auth_level(mut self, level: AuthLevel) -> Self {
        self.auth_level = level;
        self
    }
}
