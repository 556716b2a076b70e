//! Pure access decisions over an aggregated capability set.
//!
//! # Purpose and responsibility
//! Answers the concrete questions callers ask ("may this actor open page X?",
//! "what level does it have on module Y?") without any I/O.
//!
//! # Key invariants and assumptions
//! - Every function checks `is_admin` first; that check is the only bypass.
//! - An empty (or whitespace-only) page name is public.
//! - Sidebar sections and widgets must pass both the capability gate and the
//!   visibility-matrix gate for the actor's role label.
//! - Denials carry a [`DenialReason`], which is what gets written to access
//!   attempt logs; it is not an error type.
use crate::{AccessLevel, AggregatedCapabilitySet, Dimension, VisibilityMatrix};
use serde::{Deserialize, Serialize};

/// Module whose `admin` level confers administrative capability over the
/// permission system itself.
pub const PERMISSIONS_MODULE: &str = "permissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NotGranted,
    ModuleBlocked,
    HiddenByVisibilityMatrix,
    UnknownActor,
    StoreUnavailable,
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::NotGranted => "not_granted",
            DenialReason::ModuleBlocked => "module_blocked",
            DenialReason::HiddenByVisibilityMatrix => "hidden_by_visibility_matrix",
            DenialReason::UnknownActor => "unknown_actor",
            DenialReason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied(DenialReason),
}

impl Decision {
    pub fn is_granted(self) -> bool {
        matches!(self, Decision::Granted)
    }

    pub fn denial_reason(self) -> Option<DenialReason> {
        match self {
            Decision::Granted => None,
            Decision::Denied(reason) => Some(reason),
        }
    }

    fn from_bool(granted: bool, reason: DenialReason) -> Self {
        if granted {
            Decision::Granted
        } else {
            Decision::Denied(reason)
        }
    }
}

pub fn page_decision(set: &AggregatedCapabilitySet, page: &str) -> Decision {
    if set.is_admin {
        return Decision::Granted;
    }
    if page.trim().is_empty() {
        return Decision::Granted;
    }
    Decision::from_bool(set.pages.contains(page), DenialReason::NotGranted)
}

pub fn can_access_page(set: &AggregatedCapabilitySet, page: &str) -> bool {
    page_decision(set, page).is_granted()
}

pub fn can_access_module(set: &AggregatedCapabilitySet, module: &str) -> AccessLevel {
    if set.is_admin {
        return AccessLevel::Admin;
    }
    set.module_level(module)
}

/// Whether the actor's level on `module` satisfies `required`.
pub fn module_decision(
    set: &AggregatedCapabilitySet,
    module: &str,
    required: AccessLevel,
) -> Decision {
    Decision::from_bool(
        can_access_module(set, module).satisfies(required),
        DenialReason::ModuleBlocked,
    )
}

fn gated_decision(
    set: &AggregatedCapabilitySet,
    matrix: &VisibilityMatrix,
    dimension: Dimension,
    key: &str,
) -> Decision {
    if set.is_admin {
        return Decision::Granted;
    }
    if !set.grant(dimension).contains(key) {
        return Decision::Denied(DenialReason::NotGranted);
    }
    Decision::from_bool(
        matrix.allows(&set.role_label, key),
        DenialReason::HiddenByVisibilityMatrix,
    )
}

pub fn sidebar_section_decision(
    set: &AggregatedCapabilitySet,
    matrix: &VisibilityMatrix,
    section: &str,
) -> Decision {
    gated_decision(set, matrix, Dimension::SidebarSections, section)
}

pub fn can_see_sidebar_section(
    set: &AggregatedCapabilitySet,
    matrix: &VisibilityMatrix,
    section: &str,
) -> bool {
    sidebar_section_decision(set, matrix, section).is_granted()
}

pub fn widget_decision(
    set: &AggregatedCapabilitySet,
    matrix: &VisibilityMatrix,
    widget: &str,
) -> Decision {
    gated_decision(set, matrix, Dimension::HomeWidgets, widget)
}

pub fn can_see_widget(set: &AggregatedCapabilitySet, matrix: &VisibilityMatrix, widget: &str) -> bool {
    widget_decision(set, matrix, widget).is_granted()
}

/// Required to review change requests, revoke actors, and edit sources.
pub fn has_admin_capability(set: &AggregatedCapabilitySet) -> bool {
    if set.is_admin {
        return true;
    }
    set.module_level(PERMISSIONS_MODULE) == AccessLevel::Admin
}
