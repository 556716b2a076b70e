//! Persisted permission sources: profiles and custom roles.
//!
//! # Purpose
//! Defines the records an administrator edits. Both carry the same capability
//! dimensions and a flat module-level map; custom roles can additionally pull
//! in predefined [`SystemRole`] bundles by name.
//!
//! # Key invariants
//! - `module_permissions` is a map, so a module key appears at most once.
//!   A missing key reads as [`AccessLevel::Blocked`].
//! - `version` is bumped by the store on every write and is used for
//!   optimistic concurrency; callers never set it by hand on updates.
use crate::{AccessLevel, AuthzResult, CapabilitySet, ProfileId, RoleId, SystemRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    Internal,
    External,
}

/// Default capability bundle for a class of actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub kind: ProfileKind,
    #[serde(default)]
    pub module_permissions: BTreeMap<String, AccessLevel>,
    #[serde(default)]
    pub custom_permissions: CapabilitySet,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub version: u64,
}

impl Profile {
    pub fn new(id: ProfileId, name: impl Into<String>, kind: ProfileKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            module_permissions: BTreeMap::new(),
            custom_permissions: CapabilitySet::default(),
            active: true,
            version: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: CapabilitySet) -> Self {
        self.custom_permissions = permissions;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>, level: AccessLevel) -> Self {
        self.module_permissions.insert(module.into(), level);
        self
    }

    pub fn module_level(&self, module: &str) -> AccessLevel {
        self.module_permissions
            .get(module)
            .copied()
            .unwrap_or_default()
    }

    pub fn validate(&self) -> AuthzResult<()> {
        self.custom_permissions.validate()
    }
}

/// Reusable, composable capability bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRole {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: CapabilitySet,
    #[serde(default)]
    pub module_permissions: BTreeMap<String, AccessLevel>,
    /// Names of predefined bundles this role aggregates.
    #[serde(default)]
    pub system_roles: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub version: u64,
}

impl CustomRole {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            permissions: CapabilitySet::default(),
            module_permissions: BTreeMap::new(),
            system_roles: Vec::new(),
            active: true,
            version: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: CapabilitySet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>, level: AccessLevel) -> Self {
        self.module_permissions.insert(module.into(), level);
        self
    }

    pub fn with_system_role(mut self, role: SystemRole) -> Self {
        self.system_roles.push(role.as_str().to_string());
        self
    }

    /// Check keys and that every system-role reference names a known bundle.
    pub fn validate(&self) -> AuthzResult<()> {
        self.permissions.validate()?;
        for name in &self.system_roles {
            name.parse::<SystemRole>()?;
        }
        Ok(())
    }
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthzError;

    #[test]
    fn missing_module_key_reads_as_blocked() {
        let profile = Profile::new(ProfileId::new("staff"), "Staff", ProfileKind::Internal)
            .with_module("tasks", AccessLevel::Write);
        assert_eq!(profile.module_level("tasks"), AccessLevel::Write);
        assert_eq!(profile.module_level("billing"), AccessLevel::Blocked);
    }

    #[test]
    fn role_validation_rejects_unknown_system_role() {
        let mut role = CustomRole::new(RoleId::new("ops"), "Ops").with_system_role(SystemRole::Viewer);
        role.validate().expect("valid");

        role.system_roles.push("superuser".to_string());
        let err = role.validate().expect_err("unknown bundle");
        assert_eq!(err, AuthzError::UnknownSystemRole("superuser".to_string()));
    }

    #[test]
    fn profile_deserializes_with_defaults() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": "portal",
            "name": "Portal",
            "kind": "external",
            "module_permissions": { "tasks": "read" }
        }))
        .expect("parse");
        assert!(profile.active);
        assert_eq!(profile.kind, ProfileKind::External);
        assert_eq!(profile.module_level("tasks"), AccessLevel::Read);
        assert!(profile.custom_permissions.is_empty());
    }
}
