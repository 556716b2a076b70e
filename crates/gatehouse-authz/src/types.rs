//! Strongly typed identifiers for actors and permission sources.
//!
//! # Purpose
//! Wraps string identifiers so actor, profile, and role ids cannot be mixed up
//! when they flow through bindings, stores, and audit entries.
//!
//! # Key invariants
//! - Each wrapper serializes as its bare string, keeping persisted shapes flat.
//! - Display and `as_str` return the original value.
//!
//! # Common pitfalls
//! - Constructing these with empty strings; validate at the API boundary.
use serde::{Deserialize, Serialize};

/// Actor identifier wrapper.
///
/// # Example
/// ```rust
/// use gatehouse_authz::ActorId;
///
/// let actor = ActorId::new("alice");
/// assert_eq!(actor.as_str(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Profile identifier wrapper.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Custom role identifier wrapper.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
