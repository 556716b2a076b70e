//! Predefined, code-level capability bundles.
//!
//! # Purpose
//! Custom roles reference these by name to pull in a known baseline instead of
//! listing every page and module by hand. Bundles may include other bundles;
//! [`SystemRole::expand`] flattens the inclusion graph.
//!
//! # Key invariants
//! - Expansion visits each bundle at most once, so an accidental cycle in the
//!   table below terminates.
//! - Bundles only ever add capability.
use crate::{AccessLevel, AuthzError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Viewer,
    Contributor,
    Manager,
    Auditor,
    Administrator,
}

pub(crate) struct Bundle {
    pub includes: &'static [SystemRole],
    pub pages: &'static [&'static str],
    pub sidebar_sections: &'static [&'static str],
    pub home_widgets: &'static [&'static str],
    pub modules: &'static [(&'static str, AccessLevel)],
}

const VIEWER: Bundle = Bundle {
    includes: &[],
    pages: &["Dashboard"],
    sidebar_sections: &["overview"],
    home_widgets: &["summary"],
    modules: &[("dashboard", AccessLevel::Read)],
};

const CONTRIBUTOR: Bundle = Bundle {
    includes: &[SystemRole::Viewer],
    pages: &["Tasks", "Forms"],
    sidebar_sections: &["work"],
    home_widgets: &["my_tasks"],
    modules: &[("tasks", AccessLevel::Write), ("forms", AccessLevel::Write)],
};

const MANAGER: Bundle = Bundle {
    includes: &[SystemRole::Contributor],
    pages: &["Reports", "Team"],
    sidebar_sections: &["management"],
    home_widgets: &["team_overview"],
    modules: &[
        ("tasks", AccessLevel::Admin),
        ("reports", AccessLevel::Read),
        ("users", AccessLevel::Read),
    ],
};

const AUDITOR: Bundle = Bundle {
    includes: &[SystemRole::Viewer],
    pages: &["AuditLog", "AccessReport"],
    sidebar_sections: &["governance"],
    home_widgets: &["access_denials"],
    modules: &[
        ("permissions", AccessLevel::Read),
        ("reports", AccessLevel::Read),
    ],
};

const ADMINISTRATOR: Bundle = Bundle {
    includes: &[SystemRole::Manager, SystemRole::Auditor],
    pages: &["*"],
    sidebar_sections: &["*"],
    home_widgets: &["*"],
    modules: &[("*", AccessLevel::Admin)],
};

impl SystemRole {
    pub const ALL: [SystemRole; 5] = [
        SystemRole::Viewer,
        SystemRole::Contributor,
        SystemRole::Manager,
        SystemRole::Auditor,
        SystemRole::Administrator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemRole::Viewer => "viewer",
            SystemRole::Contributor => "contributor",
            SystemRole::Manager => "manager",
            SystemRole::Auditor => "auditor",
            SystemRole::Administrator => "administrator",
        }
    }

    pub(crate) fn bundle(self) -> &'static Bundle {
        match self {
            SystemRole::Viewer => &VIEWER,
            SystemRole::Contributor => &CONTRIBUTOR,
            SystemRole::Manager => &MANAGER,
            SystemRole::Auditor => &AUDITOR,
            SystemRole::Administrator => &ADMINISTRATOR,
        }
    }

    /// This role followed by every bundle it transitively includes.
    pub fn expand(self) -> Vec<SystemRole> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(role) = pending.pop() {
            if out.contains(&role) {
                continue;
            }
            out.push(role);
            pending.extend(role.bundle().includes.iter().rev().copied());
        }
        out
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SystemRole {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SystemRole::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::UnknownSystemRole(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::SystemRole;

    #[test]
    fn system_role_string_roundtrip() {
        for role in SystemRole::ALL {
            assert_eq!(role.as_str().parse::<SystemRole>(), Ok(role));
            assert_eq!(role.to_string(), role.as_str());
        }
        assert!("root".parse::<SystemRole>().is_err());
    }

    #[test]
    fn expand_follows_includes_transitively() {
        let expanded = SystemRole::Manager.expand();
        assert_eq!(
            expanded,
            vec![SystemRole::Manager, SystemRole::Contributor, SystemRole::Viewer]
        );
    }

    #[test]
    fn expand_visits_shared_bundles_once() {
        let expanded = SystemRole::Administrator.expand();
        let viewers = expanded
            .iter()
            .filter(|role| **role == SystemRole::Viewer)
            .count();
        assert_eq!(viewers, 1);
        assert!(expanded.contains(&SystemRole::Auditor));
        assert!(expanded.contains(&SystemRole::Contributor));
    }
}
