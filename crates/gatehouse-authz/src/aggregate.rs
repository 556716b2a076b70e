//! Capability aggregation across every source bound to an actor.
//!
//! # Purpose and responsibility
//! Merges the bound profile, every bound custom role, and the system-role
//! bundles those roles reference into one [`AggregatedCapabilitySet`]. This is
//! the only place union and precedence rules live.
//!
//! # Key invariants and assumptions
//! - Pure: inputs are borrowed immutably and no I/O happens here.
//! - Monotonic union for the string dimensions; per-module maximum for levels
//!   using `blocked < read < write < admin`.
//! - An inactive profile, an inactive role, a profile whose id does not match
//!   the binding, or a role the binding does not reference contributes nothing.
//! - A `*` module key acts as a floor level for every module.
//!
//! # Security considerations
//! - Admin short-circuit happens first and only here (and in the resolver's
//!   `is_admin` check); nothing else may synthesize full access.
use crate::capability::{CapabilitySet, Dimension, Grant, WILDCARD};
use crate::{AccessLevel, ActorId, CustomRole, Profile, ProfileKind, SystemRole, UserAccessBinding};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Derived union of every capability source bound to one actor.
///
/// Never persisted; rebuilt from the stores and cached by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCapabilitySet {
    pub actor_id: ActorId,
    pub is_admin: bool,
    pub kind: ProfileKind,
    pub role_label: String,
    pub pages: Grant,
    pub sidebar_sections: Grant,
    pub home_widgets: Grant,
    pub modules: BTreeMap<String, AccessLevel>,
}

impl AggregatedCapabilitySet {
    /// Empty capability for `binding`'s actor: every check denies.
    pub fn empty(binding: &UserAccessBinding) -> Self {
        Self {
            actor_id: binding.actor_id.clone(),
            is_admin: false,
            kind: ProfileKind::default(),
            role_label: binding.role_label.clone(),
            pages: Grant::default(),
            sidebar_sections: Grant::default(),
            home_widgets: Grant::default(),
            modules: BTreeMap::new(),
        }
    }

    /// `*` in every dimension and admin on every module.
    pub fn universal(binding: &UserAccessBinding) -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(WILDCARD.to_string(), AccessLevel::Admin);
        Self {
            actor_id: binding.actor_id.clone(),
            is_admin: true,
            kind: ProfileKind::default(),
            role_label: binding.role_label.clone(),
            pages: Grant::All,
            sidebar_sections: Grant::All,
            home_widgets: Grant::All,
            modules,
        }
    }

    pub fn grant(&self, dimension: Dimension) -> &Grant {
        match dimension {
            Dimension::Pages => &self.pages,
            Dimension::SidebarSections => &self.sidebar_sections,
            Dimension::HomeWidgets => &self.home_widgets,
        }
    }

    fn grant_mut(&mut self, dimension: Dimension) -> &mut Grant {
        match dimension {
            Dimension::Pages => &mut self.pages,
            Dimension::SidebarSections => &mut self.sidebar_sections,
            Dimension::HomeWidgets => &mut self.home_widgets,
        }
    }

    /// Stored level for `module`, raised to the `*` floor if one exists.
    pub fn module_level(&self, module: &str) -> AccessLevel {
        let direct = self.modules.get(module).copied().unwrap_or_default();
        let floor = self.modules.get(WILDCARD).copied().unwrap_or_default();
        direct.max(floor)
    }

    fn absorb_set(&mut self, set: &CapabilitySet) {
        for dimension in Dimension::ALL {
            self.grant_mut(dimension).absorb(set.get(dimension));
        }
    }

    fn absorb_module<S: AsRef<str>>(&mut self, module: S, level: AccessLevel) {
        let entry = self
            .modules
            .entry(module.as_ref().to_string())
            .or_default();
        *entry = (*entry).max(level);
    }

    fn absorb_system_role(&mut self, role: SystemRole, visited: &mut BTreeSet<SystemRole>) {
        for bundle_role in role.expand() {
            if !visited.insert(bundle_role) {
                continue;
            }
            let bundle = bundle_role.bundle();
            self.pages.absorb(bundle.pages);
            self.sidebar_sections.absorb(bundle.sidebar_sections);
            self.home_widgets.absorb(bundle.home_widgets);
            for (module, level) in bundle.modules {
                self.absorb_module(module, *level);
            }
        }
    }
}

/// Merge `profile` and `roles` for `binding` into one capability set.
///
/// `roles` may contain more roles than the binding references (for example a
/// batch fetched for several actors); only referenced, active ones count.
/// Unknown system-role names are skipped; they are rejected on write.
pub fn aggregate(
    binding: &UserAccessBinding,
    profile: Option<&Profile>,
    roles: &[CustomRole],
) -> AggregatedCapabilitySet {
    if binding.is_admin {
        return AggregatedCapabilitySet::universal(binding);
    }

    let mut set = AggregatedCapabilitySet::empty(binding);

    if let Some(profile) = profile.filter(|p| p.active && binding.references_profile(&p.id)) {
        set.kind = profile.kind;
        set.absorb_set(&profile.custom_permissions);
        for (module, level) in &profile.module_permissions {
            set.absorb_module(module, *level);
        }
    }

    let mut visited = BTreeSet::new();
    for role in roles
        .iter()
        .filter(|role| role.active && binding.references_role(&role.id))
    {
        set.absorb_set(&role.permissions);
        for (module, level) in &role.module_permissions {
            set.absorb_module(module, *level);
        }
        for name in &role.system_roles {
            if let Ok(system_role) = name.parse::<SystemRole>() {
                set.absorb_system_role(system_role, &mut visited);
            }
        }
    }

    set
}
