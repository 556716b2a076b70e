//! Gatehouse capability model, aggregation, and access resolution.
//!
//! # Purpose
//! Centralizes the fixed capability model (pages, sidebar sections, home
//! widgets, per-module access levels), the merge of every permission source
//! bound to an actor, and the pure decision functions evaluated over the
//! merged result.
//!
//! # How it fits
//! The control plane loads profiles, custom roles, bindings, and visibility
//! matrices from its stores and hands them to [`aggregate`]. The resulting
//! [`AggregatedCapabilitySet`] is cached and queried through the resolver
//! functions re-exported here. Nothing in this crate performs I/O.
//!
//! # Key invariants
//! - Union is monotonic: a source can only add capability, never remove it.
//! - `is_admin` short-circuits every check to full access.
//! - A `*` in any source turns that dimension into [`Grant::All`].
//! - A missing profile or dangling role id contributes nothing.
//!
//! # Examples
//! ```rust
//! use gatehouse_authz::{
//!     ActorId, CapabilitySet, ProfileId, Profile, ProfileKind, UserAccessBinding, aggregate,
//!     can_access_page,
//! };
//!
//! let profile = Profile::new(ProfileId::new("staff"), "Staff", ProfileKind::Internal)
//!     .with_permissions(CapabilitySet::with_pages(["Dashboard"]));
//! let binding = UserAccessBinding::new(ActorId::new("alice")).with_profile(profile.id.clone());
//! let set = aggregate(&binding, Some(&profile), &[]);
//! assert!(can_access_page(&set, "Dashboard"));
//! assert!(!can_access_page(&set, "Billing"));
//! ```
//!
//! # Common pitfalls
//! - Re-implementing union or precedence outside [`aggregate`]; every caller
//!   must go through it so decisions cannot drift between call sites.
//! - Treating "no profile and no role" as a default page set; it is empty.

mod aggregate;
mod binding;
mod capability;
mod errors;
mod level;
mod matrix;
mod records;
mod resolver;
mod system_role;
mod types;

pub use aggregate::{AggregatedCapabilitySet, aggregate};
pub use binding::UserAccessBinding;
pub use capability::{CapabilitySet, Dimension, Grant, WILDCARD};
pub use errors::{AuthzError, AuthzResult};
pub use level::AccessLevel;
pub use matrix::{VisibilityMatrix, VisibilityScope};
pub use records::{CustomRole, Profile, ProfileKind};
pub use resolver::{
    Decision, DenialReason, PERMISSIONS_MODULE, can_access_module, can_access_page,
    can_see_sidebar_section, can_see_widget, has_admin_capability, module_decision,
    page_decision, sidebar_section_decision, widget_decision,
};
pub use system_role::SystemRole;
pub use types::{ActorId, ProfileId, RoleId};
