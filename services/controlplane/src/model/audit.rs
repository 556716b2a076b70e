//! Audit log records and query filters.
//!
//! # Purpose
//! Defines the append-only entries written for every permission mutation and
//! workflow transition. Entries are keyed by subject (`profile:<id>`,
//! `role:<id>`, `actor:<id>`, `matrix:<scope>`) rather than stored on the
//! mutated entity.
//!
//! # Key invariants
//! - `seq` is assigned by the store at append time and strictly increases.
//! - Entries are never updated or deleted.
use crate::model::RequestId;
use chrono::{DateTime, Utc};
use gatehouse_authz::ActorId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ProfileCreated,
    ProfileUpdated,
    ProfileDeleted,
    RoleCreated,
    RoleUpdated,
    RoleDeleted,
    BindingUpdated,
    MatrixUpdated,
    Approved,
    Rejected,
    Revoked,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::ProfileCreated => "profile_created",
            AuditAction::ProfileUpdated => "profile_updated",
            AuditAction::ProfileDeleted => "profile_deleted",
            AuditAction::RoleCreated => "role_created",
            AuditAction::RoleUpdated => "role_updated",
            AuditAction::RoleDeleted => "role_deleted",
            AuditAction::BindingUpdated => "binding_updated",
            AuditAction::MatrixUpdated => "matrix_updated",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
            AuditAction::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit content prepared by the engine before the store sequences it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub actor: ActorId,
    pub subject: String,
    pub action: AuditAction,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub request_id: Option<RequestId>,
    /// Raised by the store to the previous entry's timestamp if it would run backwards.
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn into_entry(self, seq: u64) -> AuditLogEntry {
        AuditLogEntry {
            seq,
            actor: self.actor,
            subject: self.subject,
            timestamp: self.timestamp,
            action: self.action,
            field: self.field,
            old_value: self.old_value,
            new_value: self.new_value,
            request_id: self.request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub seq: u64,
    pub actor: ActorId,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub request_id: Option<RequestId>,
}

/// Conjunctive filter; unset fields match everything. Date bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    #[serde(default)]
    pub actor: Option<ActorId>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.actor.as_ref().is_none_or(|actor| *actor == entry.actor)
            && self
                .subject
                .as_ref()
                .is_none_or(|subject| *subject == entry.subject)
            && self.action.is_none_or(|action| action == entry.action)
            && self.from.is_none_or(|from| entry.timestamp >= from)
            && self.to.is_none_or(|to| entry.timestamp <= to)
    }
}
