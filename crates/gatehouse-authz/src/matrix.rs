//! Role-label-keyed visibility matrices.
//!
//! # Purpose
//! Provides the coarse, secondary visibility gate for sidebar sections and
//! home widgets. Rows are keyed by the actor's role label (not by capability),
//! columns by section/widget key.
//!
//! # Key invariants
//! - Only an explicit `false` hides a key. A missing row or a missing key
//!   leaves the decision to the fine-grained capability gate.
//! - `version` increases with every stored write so dependent reads can tell a
//!   fresh matrix from a cached one.
use crate::{AuthzError, ProfileKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityScope {
    Sidebar,
    Portal,
}

impl VisibilityScope {
    pub const ALL: [VisibilityScope; 2] = [VisibilityScope::Sidebar, VisibilityScope::Portal];

    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityScope::Sidebar => "sidebar",
            VisibilityScope::Portal => "portal",
        }
    }

    /// Key under which the matrix is persisted in the setting store.
    pub fn setting_key(self) -> &'static str {
        match self {
            VisibilityScope::Sidebar => "permissions_config",
            VisibilityScope::Portal => "permissions_config_portal",
        }
    }

    /// Internal actors are gated by the sidebar matrix, external ones by the
    /// portal matrix.
    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Internal => VisibilityScope::Sidebar,
            ProfileKind::External => VisibilityScope::Portal,
        }
    }
}

impl std::fmt::Display for VisibilityScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VisibilityScope {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sidebar" => Ok(VisibilityScope::Sidebar),
            "portal" => Ok(VisibilityScope::Portal),
            other => Err(AuthzError::UnknownScope(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityMatrix {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub rows: BTreeMap<String, BTreeMap<String, bool>>,
}

impl VisibilityMatrix {
    pub fn with_entry(mut self, role_label: &str, key: &str, visible: bool) -> Self {
        self.rows
            .entry(role_label.to_string())
            .or_default()
            .insert(key.to_string(), visible);
        self
    }

    pub fn allows(&self, role_label: &str, key: &str) -> bool {
        self.rows
            .get(role_label)
            .and_then(|row| row.get(key))
            .copied()
            .unwrap_or(true)
    }
}
